pub mod rtu;

use std::fmt;
use thiserror::Error;

pub use rtu::RtuDevice;

/// How a single register read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModbusErrorKind {
    /// Exception response or malformed frame from the device
    Protocol,
    Timeout,
    /// The device answered with no register data
    EmptyResponse,
    /// Any other failure on the serial link
    Transport,
}

impl fmt::Display for ModbusErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusErrorKind::Protocol => "protocol error",
            ModbusErrorKind::Timeout => "timeout",
            ModbusErrorKind::EmptyResponse => "empty response",
            ModbusErrorKind::Transport => "transport error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Cannot open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device not connected")]
    NotConnected,

    #[error("{kind}: {detail}")]
    Modbus {
        kind: ModbusErrorKind,
        detail: String,
    },
}

impl DeviceError {
    pub fn modbus(kind: ModbusErrorKind, detail: impl Into<String>) -> Self {
        DeviceError::Modbus {
            kind,
            detail: detail.into(),
        }
    }

    pub fn empty_response() -> Self {
        Self::modbus(
            ModbusErrorKind::EmptyResponse,
            "no register data in response",
        )
    }

    /// Kind of a failed read, `None` for errors that are not read failures.
    pub fn modbus_kind(&self) -> Option<ModbusErrorKind> {
        match self {
            DeviceError::Modbus { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// A device that can be asked for holding registers.
///
/// `close` must be safe to call at any time, including before `connect` and
/// more than once.
pub trait RegisterReader {
    fn connect(&mut self) -> Result<()>;

    /// One read attempt for `count` registers starting at `address`. No retries.
    fn read_holding_registers(&mut self, slave_id: u8, address: u16, count: u16)
    -> Result<Vec<u16>>;

    fn close(&mut self);
}
