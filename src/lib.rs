//! Polls one Modbus RTU holding register over a serial link, converts the raw
//! value into loop current and mass, and appends each sample to a text file.

pub mod config;
pub mod devices;
pub mod logging;
pub mod polling;
pub mod shutdown;

pub use config::Settings;
pub use devices::{DeviceError, ModbusErrorKind, RegisterReader, RtuDevice};
pub use polling::{PollState, PollSummary, Poller, PollerError};
pub use shutdown::StopToken;
