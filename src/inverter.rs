use crate::prelude::*;
use crate::transport::{EmptyReadPolicy, Execute, Executor, Pacing, Primitives, UsbSettings};

use std::sync::OnceLock;

/// Command used to learn the serial number of the connected inverter.
pub const SERIAL_NUMBER_COMMAND: &str = "QID";
pub const DEFAULT_BAUD_RATE: u32 = 2400;

// {{{ SessionConfig
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub device: String,
    /// only used by the serial transport
    pub baud_rate: u32,
    pub usb_no_driver: bool,
    pub empty_read: EmptyReadPolicy,
    pub usb: UsbSettings,
    pub pacing: Pacing,
}

impl SessionConfig {
    pub fn new<S: Into<String>>(device: S) -> Self {
        Self {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            usb_no_driver: false,
            empty_read: EmptyReadPolicy::default(),
            usb: UsbSettings::default(),
            pacing: Pacing::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            device: config.device().to_string(),
            baud_rate: config.baud_rate(),
            usb_no_driver: config.usb_no_driver(),
            empty_read: config.serial().empty_read,
            usb: config.usb().clone(),
            pacing: Pacing::default(),
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_usb_no_driver(mut self, usb_no_driver: bool) -> Self {
        self.usb_no_driver = usb_no_driver;
        self
    }

    pub fn with_empty_read(mut self, empty_read: EmptyReadPolicy) -> Self {
        self.empty_read = empty_read;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
// }}}

/// An inverter reachable through one transport.
///
/// The transport is classified once, here, from the device identifier and never changes.
/// Every call to [`execute`](Self::execute) opens the device, talks to it and closes it
/// again; nothing is held open between calls.
pub struct InverterSession {
    config: SessionConfig,
    catalog: Catalog,
    transport: Transport,
    executor: Executor,
    serial_number: OnceLock<String>,
}

impl InverterSession {
    pub fn new(config: SessionConfig, catalog: Catalog) -> Result<Self, Error> {
        Self::with_primitives(config, catalog, Primitives::default())
    }

    pub fn with_primitives(
        config: SessionConfig,
        catalog: Catalog,
        primitives: Primitives,
    ) -> Result<Self, Error> {
        if config.device.is_empty() {
            return Err(Error::NoDevice);
        }

        let transport = Transport::classify(&config.device, config.usb_no_driver);
        let executor = Executor::new(transport, &config, primitives);
        info!(
            "Inverter on {} ({} connection), {} commands",
            config.device,
            transport,
            catalog.len()
        );

        Ok(Self {
            config,
            catalog,
            transport,
            executor,
            serial_number: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn resolve(&self, text: &str) -> Result<ResolvedCommand, Error> {
        self.catalog.resolve(text).ok_or_else(|| {
            error!("Command not found: {}", text);
            Error::CommandNotFound(text.to_string())
        })
    }

    /// Sends `text` to the inverter. Transport failures come back as an [`Execution`]
    /// without a response, not as an error.
    pub fn execute(&self, text: &str) -> Result<Execution, Error> {
        let command = self.resolve(text)?;
        debug!("{} connection: executing {}", self.transport, command);
        self.executor.execute(&command)
    }

    /// Asked once; the first answer is kept for the life of the session.
    pub fn serial_number(&self) -> Result<Option<String>, Error> {
        if let Some(serial) = self.serial_number.get() {
            return Ok(Some(serial.clone()));
        }

        let execution = self.execute(SERIAL_NUMBER_COMMAND)?;
        let serial = match execution.fields() {
            Ok(fields) => fields
                .into_iter()
                .find(|f| f.key == "serial_number")
                .map(|f| f.value.to_string()),
            Err(e) => {
                warn!("could not read serial number: {}", e);
                None
            }
        };

        Ok(serial.map(|s| self.serial_number.get_or_init(|| s).clone()))
    }
}

impl std::fmt::Display for InverterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.transport {
            Transport::Test => writeln!(f, "Inverter connected as a TEST")?,
            Transport::Serial => {
                writeln!(f, "Inverter connected via serial port on {}", self.config.device)?
            }
            Transport::CharDevice => {
                writeln!(f, "Inverter connected via USB on {}", self.config.device)?
            }
            Transport::UsbRaw => writeln!(
                f,
                "Inverter connected via USB (no driver) at {:04x}:{:04x}",
                self.config.usb.vendor_id, self.config.usb.product_id
            )?,
        }
        writeln!(f, "-------- List of supported commands --------")?;
        for command in self.catalog.commands() {
            writeln!(f, "{}", command)?;
        }
        Ok(())
    }
}
