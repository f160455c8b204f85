use crate::prelude::*;
use crate::transport::{pause, Execute, Execution, Pacing};

use std::fs::OpenOptions;
use std::io::{self, Read};

/// The hidraw endpoint cannot take more than this in one write.
pub const CHUNK_SIZE: usize = 8;
pub const READ_ATTEMPTS: usize = 100;
pub const READ_SIZE: usize = 256;

pub trait DeviceIo: Read + Write + Send {}
impl<T: Read + Write + Send> DeviceIo for T {}

pub trait CharDeviceOpen: Send + Sync {
    fn open(&self, path: &str) -> io::Result<Box<dyn DeviceIo>>;
}

/// Opens the path read/write and non-blocking.
pub struct SystemCharDevice;

impl CharDeviceOpen for SystemCharDevice {
    fn open(&self, path: &str) -> io::Result<Box<dyn DeviceIo>> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NONBLOCK);
        }

        Ok(Box::new(options.open(path)?))
    }
}

pub struct CharDeviceExecutor {
    device: String,
    pacing: Pacing,
    opener: Box<dyn CharDeviceOpen>,
}

impl CharDeviceExecutor {
    pub fn new(config: &SessionConfig, opener: Box<dyn CharDeviceOpen>) -> Self {
        Self {
            device: config.device.clone(),
            pacing: config.pacing,
            opener,
        }
    }

    fn write_chunks(&self, device: &mut dyn DeviceIo, command: &[u8]) -> io::Result<()> {
        for chunk in command.chunks(CHUNK_SIZE) {
            pause(self.pacing.chunk_delay);
            device.write_all(chunk)?;
        }
        Ok(())
    }

    fn read_reply(&self, device: &mut dyn DeviceIo) -> Vec<u8> {
        let mut response = Vec::new();
        let mut buf = [0u8; READ_SIZE];

        for _ in 0..READ_ATTEMPTS {
            pause(self.pacing.read_poll);
            match device.read(&mut buf) {
                Ok(n) => response.extend_from_slice(&buf[..n]),
                // WouldBlock until the inverter has answered
                Err(e) => trace!("USB read error: {}", e),
            }

            if let Some(end) = response.iter().position(|&b| b == b'\r') {
                response.truncate(end + 1);
                break;
            }
        }

        response
    }
}

impl Execute for CharDeviceExecutor {
    fn execute(&self, command: &ResolvedCommand) -> Result<Execution, Error> {
        let mut device = match self.opener.open(&self.device) {
            Ok(device) => device,
            Err(e) => {
                warn!("USB open error on {}: {}", self.device, e);
                return Ok(Execution::failed(command, TransportError::open(&self.device, e)));
            }
        };

        if let Err(e) = self.write_chunks(device.as_mut(), &command.full_command()) {
            warn!("USB write error on {}: {}", self.device, e);
            return Ok(Execution::failed(command, TransportError::io(&self.device, e)));
        }
        pause(self.pacing.write_settle);

        let response = self.read_reply(device.as_mut());
        debug!("usb response was: {:?}", String::from_utf8_lossy(&response));

        Ok(Execution::response_bytes(command, response))
    }
}
