use crate::prelude::*;
use crate::transport::{pause, Execute, Execution, Pacing};

use serde::Deserialize;
use std::time::Duration;

pub const PACKET_SIZE: usize = 8;
pub const READ_ATTEMPTS: usize = 20;

/// Where to find the inverter on the bus when no kernel driver is used.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UsbSettings {
    #[serde(default = "UsbSettings::default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "UsbSettings::default_product_id")]
    pub product_id: u16,
    #[serde(default)]
    pub interface: u8,
    #[serde(default = "UsbSettings::default_in_endpoint")]
    pub in_endpoint: u8,
    #[serde(default = "UsbSettings::default_out_endpoint")]
    pub out_endpoint: u8,
    #[serde(default = "UsbSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            interface: 0,
            in_endpoint: Self::default_in_endpoint(),
            out_endpoint: Self::default_out_endpoint(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl UsbSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn default_vendor_id() -> u16 {
        0x0665
    }
    fn default_product_id() -> u16 {
        0x5161
    }
    fn default_in_endpoint() -> u8 {
        0x81
    }
    fn default_out_endpoint() -> u8 {
        0x01
    }
    fn default_timeout_ms() -> u64 {
        100
    }
}

pub trait UsbLink: Send {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize>;
    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
}

pub trait UsbOpen: Send + Sync {
    /// Finds the device, claims the interface away from any kernel driver until the link
    /// is dropped, and selects the default alternate setting.
    fn open(&self, settings: &UsbSettings) -> Result<Box<dyn UsbLink>, TransportError>;
}

// {{{ SystemUsb
pub struct SystemUsb;

impl UsbOpen for SystemUsb {
    fn open(&self, settings: &UsbSettings) -> Result<Box<dyn UsbLink>, TransportError> {
        let handle = rusb::open_device_with_vid_pid(settings.vendor_id, settings.product_id)
            .ok_or(TransportError::DeviceNotFound {
                vendor_id: settings.vendor_id,
                product_id: settings.product_id,
            })?;

        claim(&handle, settings.interface)?;

        Ok(Box::new(SystemUsbLink { handle }))
    }
}

/// The handle calls needed to take over an interface.
trait ClaimInterface {
    fn set_auto_detach_kernel_driver(&self, auto_detach: bool) -> rusb::Result<()>;
    fn claim_interface(&self, interface: u8) -> rusb::Result<()>;
    fn set_alternate_setting(&self, interface: u8, setting: u8) -> rusb::Result<()>;
}

impl<T: rusb::UsbContext> ClaimInterface for rusb::DeviceHandle<T> {
    fn set_auto_detach_kernel_driver(&self, auto_detach: bool) -> rusb::Result<()> {
        rusb::DeviceHandle::set_auto_detach_kernel_driver(self, auto_detach)
    }

    fn claim_interface(&self, interface: u8) -> rusb::Result<()> {
        rusb::DeviceHandle::claim_interface(self, interface)
    }

    fn set_alternate_setting(&self, interface: u8, setting: u8) -> rusb::Result<()> {
        rusb::DeviceHandle::set_alternate_setting(self, interface, setting)
    }
}

// With auto-detach on, libusb unbinds the kernel driver when the interface is claimed and
// binds it again when the handle drops and releases the interface.
fn claim<H: ClaimInterface>(handle: &H, interface: u8) -> Result<(), TransportError> {
    match handle.set_auto_detach_kernel_driver(true) {
        Ok(()) => {}
        Err(rusb::Error::NotSupported) => {
            debug!("kernel driver auto-detach not supported on this platform");
        }
        Err(e) => return Err(e.into()),
    }
    handle.claim_interface(interface)?;
    handle.set_alternate_setting(interface, 0)?;
    Ok(())
}

struct SystemUsbLink {
    handle: rusb::DeviceHandle<rusb::GlobalContext>,
}

impl UsbLink for SystemUsbLink {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_interrupt(endpoint, data, timeout)
    }

    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.read_interrupt(endpoint, buf, timeout)
    }
}
// }}}

/// Command text, plain big-endian CRC16/XMODEM, CR, then NUL padding up to one packet.
pub fn frame(text: &[u8]) -> Vec<u8> {
    let mut r = text.to_vec();
    r.extend_from_slice(&mpp::crc::crc16_xmodem(text).to_be_bytes());
    r.push(b'\r');
    if r.len() < PACKET_SIZE {
        r.resize(PACKET_SIZE, 0);
    }
    r
}

pub struct UsbRawExecutor {
    settings: UsbSettings,
    pacing: Pacing,
    opener: Box<dyn UsbOpen>,
}

impl UsbRawExecutor {
    pub fn new(config: &SessionConfig, opener: Box<dyn UsbOpen>) -> Self {
        Self {
            settings: config.usb.clone(),
            pacing: config.pacing,
            opener,
        }
    }

    fn read_reply(&self, link: &mut dyn UsbLink) -> Result<Vec<u8>, Error> {
        let mut response = Vec::new();
        let mut packet = [0u8; PACKET_SIZE];

        for _ in 0..READ_ATTEMPTS {
            match link.read(self.settings.in_endpoint, &mut packet, self.settings.timeout()) {
                Ok(n) => response.extend(packet[..n].iter().filter(|&&b| b != 0)),
                Err(rusb::Error::Timeout) | Err(rusb::Error::Busy) => {
                    debug!("usb busy, retrying read");
                }
                Err(e) => {
                    error!("USB read error: {}", e);
                    return Err(Error::Usb(e));
                }
            }

            if response.contains(&b'\r') {
                break;
            }
        }

        Ok(response)
    }
}

impl Execute for UsbRawExecutor {
    fn execute(&self, command: &ResolvedCommand) -> Result<Execution, Error> {
        let mut link = match self.opener.open(&self.settings) {
            Ok(link) => link,
            Err(e) => {
                warn!("USB open error: {}", e);
                return Ok(Execution::failed(command, e));
            }
        };

        let frame = frame(command.command_text().as_bytes());
        debug!("Command generated: {:?}", frame);

        if let Err(e) = link.write(self.settings.out_endpoint, &frame, self.settings.timeout()) {
            warn!("USB write error: {}", e);
            return Ok(Execution::failed(command, TransportError::Usb(e)));
        }
        pause(self.pacing.write_settle);

        let response = self.read_reply(link.as_mut())?;
        debug!("usb response was: {:?}", String::from_utf8_lossy(&response));

        Ok(Execution::response_bytes(command, response))
    }
}
