use clap::Parser;

/// MPP Bridge - talk to MPP Solar / PIP inverters over serial, hidraw or raw USB
#[derive(Debug, Default, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read (config.yaml is used if present)
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Device to talk to, e.g. /dev/ttyUSB0, /dev/hidraw0 or TEST
    #[clap(short = 'd', long = "device")]
    pub device: Option<String>,

    /// Serial baud rate
    #[clap(short = 'b', long = "baud")]
    pub baud_rate: Option<u32>,

    /// Command to send, e.g. QPIGS or POP02
    #[clap(short = 'C', long = "command")]
    pub command: Option<String>,

    /// List the known commands
    #[clap(short = 'l', long = "list-commands")]
    pub list_commands: bool,

    /// Print the merged Q1 and QPIGS status as JSON
    #[clap(short = 's', long = "status")]
    pub status: bool,

    /// Print the inverter serial number
    #[clap(short = 'n', long = "serial-number")]
    pub serial_number: bool,

    /// Repeat the command or status every N seconds until interrupted
    #[clap(short = 'i', long = "interval")]
    pub interval: Option<u64>,

    /// Talk to the inverter with raw USB transfers instead of a kernel driver
    #[clap(long = "usb-no-driver")]
    pub usb_no_driver: bool,

    /// Treat an empty serial read as a failed attempt and try again
    #[clap(long = "retry-empty-reads")]
    pub retry_empty_reads: bool,

    /// Directory of command json files to use instead of the bundled set
    #[clap(long = "commands-dir")]
    pub commands_dir: Option<String>,

    /// Enable debug logging
    #[clap(short = 'D', long = "debug")]
    pub debug: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
