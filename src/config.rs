use crate::prelude::*;
use crate::transport::{EmptyReadPolicy, UsbSettings};

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// serial port, hidraw node, or TEST
    #[serde(default)]
    pub device: String,

    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default)]
    pub usb_no_driver: bool,

    #[serde(default)]
    pub serial: Serial,

    #[serde(default)]
    pub usb: UsbSettings,

    /// directory of command json files; the bundled set is used when unset
    pub commands_dir: Option<String>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// {{{ Serial
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Serial {
    #[serde(default)]
    pub empty_read: EmptyReadPolicy,
}

impl Serial {
    pub fn empty_read(&self) -> EmptyReadPolicy {
        self.empty_read
    }
}
// }}}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: Self::default_baud_rate(),
            usb_no_driver: false,
            serial: Serial::default(),
            usb: UsbSettings::default(),
            commands_dir: None,
            loglevel: Self::default_loglevel(),
        }
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the config file named in `options` (or `config.yaml` if present), then lays
    /// the command line overrides on top.
    pub fn from_options(options: &Options) -> Result<Self> {
        let mut config = match &options.config_file {
            Some(file) => Self::new(file.clone())?,
            None if std::path::Path::new(Self::DEFAULT_FILE).exists() => {
                Self::new(Self::DEFAULT_FILE.to_string())?
            }
            None => Self::default(),
        };

        if let Some(device) = &options.device {
            config.device = device.clone();
        }
        if let Some(baud_rate) = options.baud_rate {
            config.baud_rate = baud_rate;
        }
        if options.usb_no_driver {
            config.usb_no_driver = true;
        }
        if options.retry_empty_reads {
            config.serial.empty_read = EmptyReadPolicy::Retry;
        }
        if let Some(dir) = &options.commands_dir {
            config.commands_dir = Some(dir.clone());
        }
        if options.debug {
            config.loglevel = "debug".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub const DEFAULT_FILE: &'static str = "config.yaml";

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn usb_no_driver(&self) -> bool {
        self.usb_no_driver
    }

    pub fn serial(&self) -> &Serial {
        &self.serial
    }

    pub fn usb(&self) -> &UsbSettings {
        &self.usb
    }

    pub fn commands_dir(&self) -> Option<&str> {
        self.commands_dir.as_deref()
    }

    pub fn loglevel(&self) -> &str {
        &self.loglevel
    }

    /// Loads the command catalog this config points at.
    pub fn catalog(&self) -> Result<Catalog> {
        match self.commands_dir() {
            Some(dir) => Catalog::load(dir),
            None => Ok(Catalog::bundled()),
        }
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Device: {}", self.device);
        info!("  Baud Rate: {}", self.baud_rate);
        info!("  Serial Empty Reads: {:?}", self.serial.empty_read);
        info!("  USB No Driver: {}", self.usb_no_driver);
        if self.usb_no_driver {
            info!("    Vendor/Product: {:04x}:{:04x}", self.usb.vendor_id, self.usb.product_id);
            info!("    Interface: {}", self.usb.interface);
            info!(
                "    Endpoints: in 0x{:02x}, out 0x{:02x}",
                self.usb.in_endpoint, self.usb.out_endpoint
            );
            info!("    Timeout: {}ms", self.usb.timeout_ms);
        }
        info!(
            "  Commands: {}",
            self.commands_dir.as_deref().unwrap_or("(bundled)")
        );
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            bail!("baud_rate must be greater than zero");
        }

        if self.usb.in_endpoint & 0x80 == 0 {
            bail!("usb.in_endpoint 0x{:02x} is not an IN endpoint", self.usb.in_endpoint);
        }
        if self.usb.out_endpoint & 0x80 != 0 {
            bail!("usb.out_endpoint 0x{:02x} is not an OUT endpoint", self.usb.out_endpoint);
        }
        if self.usb.timeout_ms == 0 {
            return Err(anyhow!("config.rs:Invalid usb timeout: 0"));
        }

        if let Some(dir) = &self.commands_dir {
            if dir.is_empty() {
                return Err(anyhow!("config.rs:commands_dir cannot be empty"));
            }
        }

        Ok(())
    }

    fn default_baud_rate() -> u32 {
        crate::inverter::DEFAULT_BAUD_RATE
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
