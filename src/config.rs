use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

pub const DEFAULT_PORT: &str = if cfg!(windows) { "COM1" } else { "/dev/ttyUSB0" };
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_DATA_BITS: u8 = 8;
pub const DEFAULT_STOP_BITS: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_SLAVE_ID: u8 = 2;
pub const DEFAULT_REGISTER_ADDRESS: u16 = 0;
pub const DEFAULT_REGISTER_COUNT: u16 = 1;
pub const DEFAULT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DATA_FILE: &str = "modbus_data.txt";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Base of the 1-based holding register reference numbers (4xxxx).
const HOLDING_REGISTER_BASE: u32 = 40001;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Modbus framing used on the link. Only RTU over serial is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMethod {
    Rtu,
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMethod::Rtu => f.write_str("RTU"),
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    /// Single-letter form used in "8N1" style summaries.
    pub fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        }
    }
}

/// Polling settings. Every field has a command-line flag; the defaults are the
/// values the field installation runs with.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rtu-register-logger",
    version,
    about = "Polls one Modbus RTU holding register and appends converted samples to a file"
)]
pub struct Settings {
    /// Modbus framing
    #[arg(long, value_enum, default_value_t = TransportMethod::Rtu)]
    pub method: TransportMethod,

    /// Serial device to open
    #[arg(long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    #[arg(long, value_enum, default_value_t = Parity::None)]
    pub parity: Parity,

    /// Byte size (5..=8)
    #[arg(long, default_value_t = DEFAULT_DATA_BITS)]
    pub data_bits: u8,

    /// Stop bits (1 or 2)
    #[arg(long, default_value_t = DEFAULT_STOP_BITS)]
    pub stop_bits: u8,

    /// Maximum wait for one Modbus request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Address of the device on the bus
    #[arg(long, default_value_t = DEFAULT_SLAVE_ID)]
    pub slave_id: u8,

    /// Holding register offset to read (0 = 40001)
    #[arg(long, default_value_t = DEFAULT_REGISTER_ADDRESS)]
    pub register_address: u16,

    /// Registers per request (must be 1)
    #[arg(long, default_value_t = DEFAULT_REGISTER_COUNT)]
    pub register_count: u16,

    /// Delay between requests, in milliseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// File the samples are appended to
    #[arg(long, value_name = "FILE", default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Directory for the rolling diagnostic log
    #[arg(long, value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            method: TransportMethod::Rtu,
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            data_bits: DEFAULT_DATA_BITS,
            stop_bits: DEFAULT_STOP_BITS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            slave_id: DEFAULT_SLAVE_ID,
            register_address: DEFAULT_REGISTER_ADDRESS,
            register_count: DEFAULT_REGISTER_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Line settings in the usual "9600 8N1" form.
    pub fn serial_summary(&self) -> String {
        format!(
            "{} {}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.letter(),
            self.stop_bits
        )
    }

    /// 1-based reference of the polled register, e.g. 40001 for offset 0.
    pub fn register_reference(&self) -> u32 {
        HOLDING_REGISTER_BASE + u32::from(self.register_address)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(invalid("port", "serial device name is empty"));
        }
        if self.baud_rate == 0 {
            return Err(invalid("baud_rate", "must be greater than zero"));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(invalid(
                "data_bits",
                format!("{} is not in 5..=8", self.data_bits),
            ));
        }
        if self.stop_bits != 1 && self.stop_bits != 2 {
            return Err(invalid(
                "stop_bits",
                format!("{} is not 1 or 2", self.stop_bits),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be greater than zero"));
        }
        // Slave 0 is the broadcast address and never answers a read.
        if self.slave_id == 0 {
            return Err(invalid("slave_id", "0 is the broadcast address"));
        }
        if self.register_count != 1 {
            return Err(invalid(
                "register_count",
                format!("exactly one register is polled, got {}", self.register_count),
            ));
        }
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_defaults_match_default_impl() {
        let parsed = Settings::parse_from(["rtu-register-logger"]);
        let default = Settings::default();
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.baud_rate, 9600);
        assert_eq!(parsed.parity, Parity::None);
        assert_eq!(parsed.slave_id, 2);
        assert_eq!(parsed.register_address, 0);
        assert_eq!(parsed.register_count, 1);
        assert_eq!(parsed.interval(), Duration::from_millis(500));
        assert_eq!(parsed.timeout(), Duration::from_secs(1));
        assert_eq!(parsed.data_file, PathBuf::from("modbus_data.txt"));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = Settings::parse_from([
            "rtu-register-logger",
            "--port",
            "/dev/ttyS3",
            "--baud-rate",
            "19200",
            "--parity",
            "even",
            "--stop-bits",
            "2",
            "--slave-id",
            "7",
            "--register-address",
            "12",
        ]);
        assert_eq!(parsed.port, "/dev/ttyS3");
        assert_eq!(parsed.serial_summary(), "19200 8E2");
        assert_eq!(parsed.slave_id, 7);
        assert_eq!(parsed.register_reference(), 40013);
    }

    #[test]
    fn default_summary_is_8n1() {
        assert_eq!(Settings::default().serial_summary(), "9600 8N1");
        assert_eq!(Settings::default().register_reference(), 40001);
    }

    #[test]
    fn rejects_multi_register_reads() {
        let settings = Settings {
            register_count: 2,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "register_count",
                ..
            })
        ));
    }

    #[test]
    fn rejects_broadcast_slave_and_bad_framing() {
        let broadcast = Settings {
            slave_id: 0,
            ..Settings::default()
        };
        assert!(broadcast.validate().is_err());

        let data_bits = Settings {
            data_bits: 9,
            ..Settings::default()
        };
        assert!(data_bits.validate().is_err());

        let stop_bits = Settings {
            stop_bits: 3,
            ..Settings::default()
        };
        assert!(stop_bits.validate().is_err());

        let interval = Settings {
            interval_ms: 0,
            ..Settings::default()
        };
        assert!(interval.validate().is_err());
    }
}
