use crate::prelude::*;
use crate::transport::{pause, Execute, Execution, Pacing};

use serde::Deserialize;
use std::io::{self, Read};
use std::time::Duration;

pub const ATTEMPTS: u32 = 4;

/// Read and write timeout for a 1-based attempt: 2s, 3s, 4s, 5s.
pub fn attempt_timeout(attempt: u32) -> Duration {
    Duration::from_secs(1 + attempt as u64)
}

/// What to do when a read completes without any bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyReadPolicy {
    /// the first completed read is the answer, even an empty one
    #[default]
    Accept,
    /// an empty read moves on to the next attempt
    Retry,
}

pub trait SerialLink: Send {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
    fn clear_buffers(&mut self) -> io::Result<()>;
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
    /// Bytes up to and including CR or LF, or whatever arrived before the timeout.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

pub trait SerialOpen: Send + Sync {
    fn open(&self, port: &str, baud_rate: u32) -> io::Result<Box<dyn SerialLink>>;
}

// {{{ SystemSerial
pub struct SystemSerial;

impl SerialOpen for SystemSerial {
    fn open(&self, port: &str, baud_rate: u32) -> io::Result<Box<dyn SerialLink>> {
        let port = serialport::new(port, baud_rate)
            .timeout(attempt_timeout(1))
            .open()?;
        Ok(Box::new(SystemSerialLink { port }))
    }
}

struct SystemSerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink for SystemSerialLink {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        // serialport uses a single timeout for reads and writes
        Ok(self.port.set_timeout(timeout)?)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        Ok(self.port.clear(serialport::ClearBuffer::All)?)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, data)?;
        io::Write::flush(&mut self.port)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\r' || byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(line)
    }
}
// }}}

pub struct SerialExecutor {
    device: String,
    baud_rate: u32,
    empty_read: EmptyReadPolicy,
    pacing: Pacing,
    opener: Box<dyn SerialOpen>,
}

impl SerialExecutor {
    pub fn new(config: &SessionConfig, opener: Box<dyn SerialOpen>) -> Self {
        Self {
            device: config.device.clone(),
            baud_rate: config.baud_rate,
            empty_read: config.empty_read,
            pacing: config.pacing,
            opener,
        }
    }

    fn converse(&self, link: &mut dyn SerialLink, command: &[u8]) -> io::Result<Vec<u8>> {
        let mut response = Vec::new();

        for attempt in 1..=ATTEMPTS {
            debug!("Command execution attempt {}...", attempt);
            link.set_timeout(attempt_timeout(attempt))?;
            link.clear_buffers()?;
            link.write_all(command)?;
            pause(self.pacing.serial_settle * attempt);

            response = link.read_line()?;
            debug!("serial response was: {:?}", String::from_utf8_lossy(&response));

            if !response.is_empty() || self.empty_read == EmptyReadPolicy::Accept {
                break;
            }
        }

        Ok(response)
    }
}

impl Execute for SerialExecutor {
    fn execute(&self, command: &ResolvedCommand) -> Result<Execution, Error> {
        debug!("port {}, baudrate {}", self.device, self.baud_rate);

        let mut link = match self.opener.open(&self.device, self.baud_rate) {
            Ok(link) => link,
            Err(e) => {
                warn!("serial open error on {}: {}", self.device, e);
                info!("Command execution failed");
                return Ok(Execution::failed(command, TransportError::open(&self.device, e)));
            }
        };

        // link is dropped, and the port closed, on every path out of here
        match self.converse(link.as_mut(), &command.full_command()) {
            Ok(response) => Ok(Execution::response_bytes(command, response)),
            Err(e) => {
                warn!("serial i/o error on {}: {}", self.device, e);
                info!("Command execution failed");
                Ok(Execution::failed(command, TransportError::io(&self.device, e)))
            }
        }
    }
}
