use thiserror::Error;

/// Errors raised to the caller of an [`InverterSession`](crate::inverter::InverterSession).
///
/// Transport trouble is normally not one of these: it travels inside
/// [`Outcome::NoResponse`](crate::transport::Outcome) instead. Only a USB fault that
/// cannot be retried escapes as [`Error::Usb`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("a device to communicate by must be supplied, e.g. /dev/ttyUSB0")]
    NoDevice,

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("no test response defined for {0}")]
    NoTestResponseDefined(String),

    #[error("usb transfer failed: {0}")]
    Usb(#[from] rusb::Error),
}

/// Why an execution came back without a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no usb device {vendor_id:04x}:{product_id:04x}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("usb setup failed: {0}")]
    Usb(#[from] rusb::Error),
}

impl TransportError {
    pub fn open(device: &str, source: std::io::Error) -> Self {
        Self::Open {
            device: device.to_string(),
            source,
        }
    }

    pub fn io(device: &str, source: std::io::Error) -> Self {
        Self::Io {
            device: device.to_string(),
            source,
        }
    }
}
