use crate::prelude::*;
use crate::mpp::response::Field;

use enum_dispatch::*;
use std::time::Duration;

pub mod char_device;
pub mod serial;
pub mod usb_raw;

pub use char_device::{CharDeviceExecutor, CharDeviceOpen, SystemCharDevice};
pub use serial::{EmptyReadPolicy, SerialExecutor, SerialLink, SerialOpen, SystemSerial};
pub use test::TestExecutor;
pub use usb_raw::{SystemUsb, UsbLink, UsbOpen, UsbRawExecutor, UsbSettings};

// {{{ Transport
/// How the session talks to the device. Fixed when the session is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Test,
    Serial,
    CharDevice,
    UsbRaw,
}

impl Transport {
    pub const TEST_DEVICE: &'static str = "TEST";

    pub fn classify(device: &str, usb_no_driver: bool) -> Self {
        if device == Self::TEST_DEVICE {
            Transport::Test
        } else if usb_no_driver {
            Transport::UsbRaw
        } else if is_hidraw(device) {
            Transport::CharDevice
        } else {
            Transport::Serial
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Transport::Test => "TEST",
            Transport::Serial => "SERIAL",
            Transport::CharDevice => "DIRECT USB",
            Transport::UsbRaw => "USB no driver",
        };
        write!(f, "{}", s)
    }
}

// /dev/hidraw0, /dev/hidraw12
fn is_hidraw(device: &str) -> bool {
    let stem = device.trim_end_matches(|c: char| c.is_ascii_digit());
    stem.len() < device.len() && stem.ends_with("hidraw")
}
// }}}

// {{{ Pacing
/// Blocking delays that give the inverter time to keep up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// multiplied by the attempt number before a serial read
    pub serial_settle: Duration,
    /// before each 8 byte chunk on hidraw
    pub chunk_delay: Duration,
    /// after the whole command is written
    pub write_settle: Duration,
    /// before each hidraw read
    pub read_poll: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            serial_settle: Duration::from_millis(500),
            chunk_delay: Duration::from_millis(350),
            write_settle: Duration::from_millis(250),
            read_poll: Duration::from_millis(150),
        }
    }
}

impl Pacing {
    pub fn immediate() -> Self {
        Self {
            serial_settle: Duration::ZERO,
            chunk_delay: Duration::ZERO,
            write_settle: Duration::ZERO,
            read_poll: Duration::ZERO,
        }
    }
}

pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
// }}}

// {{{ Execution
#[derive(Debug)]
pub enum Outcome {
    Response(Vec<u8>),
    NoResponse(TransportError),
}

/// Result of one call: the command that ran and what came back. Built fresh for every
/// execution.
#[derive(Debug)]
pub struct Execution {
    command: ResolvedCommand,
    outcome: Outcome,
}

impl Execution {
    pub fn new(command: ResolvedCommand, outcome: Outcome) -> Self {
        Self { command, outcome }
    }

    pub fn response_bytes(command: &ResolvedCommand, response: Vec<u8>) -> Self {
        Self::new(command.clone(), Outcome::Response(response))
    }

    pub fn failed(command: &ResolvedCommand, error: TransportError) -> Self {
        Self::new(command.clone(), Outcome::NoResponse(error))
    }

    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// `None` when the device was unreachable or said nothing.
    pub fn response(&self) -> Option<&[u8]> {
        match &self.outcome {
            Outcome::Response(r) if !r.is_empty() => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TransportError> {
        match &self.outcome {
            Outcome::NoResponse(e) => Some(e),
            Outcome::Response(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.response().map_or(false, |r| {
            r.first() == Some(&b'(') && r.ends_with(b"\r") && mpp::crc::verify(r)
        })
    }

    pub fn fields(&self) -> Result<Vec<Field>> {
        match &self.outcome {
            Outcome::Response(r) if !r.is_empty() => self.command.parse(r),
            Outcome::Response(_) => bail!("{}: empty response", self.command),
            Outcome::NoResponse(e) => bail!("{}: {}", self.command, e),
        }
    }

    /// `key -> [value, unit]`, the shape the status report is built from.
    pub fn response_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        Ok(self
            .fields()?
            .into_iter()
            .map(|f| (f.key, serde_json::json!([f.value, f.unit])))
            .collect())
    }
}
// }}}

#[enum_dispatch]
pub trait Execute {
    fn execute(&self, command: &ResolvedCommand) -> Result<Execution, Error>;
}

#[enum_dispatch(Execute)]
pub enum Executor {
    TestExecutor,
    SerialExecutor,
    CharDeviceExecutor,
    UsbRawExecutor,
}

/// Low level device access used by the executors. Defaults to the real devices.
pub struct Primitives {
    pub serial: Box<dyn SerialOpen>,
    pub char_device: Box<dyn CharDeviceOpen>,
    pub usb: Box<dyn UsbOpen>,
}

impl Default for Primitives {
    fn default() -> Self {
        Self {
            serial: Box::new(SystemSerial),
            char_device: Box::new(SystemCharDevice),
            usb: Box::new(SystemUsb),
        }
    }
}

impl Executor {
    pub fn new(transport: Transport, config: &SessionConfig, primitives: Primitives) -> Self {
        match transport {
            Transport::Test => TestExecutor.into(),
            Transport::Serial => SerialExecutor::new(config, primitives.serial).into(),
            Transport::CharDevice => {
                CharDeviceExecutor::new(config, primitives.char_device).into()
            }
            Transport::UsbRaw => UsbRawExecutor::new(config, primitives.usb).into(),
        }
    }
}
