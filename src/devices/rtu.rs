use std::io::ErrorKind;
use std::time::Duration;

use tokio_modbus::client::sync::{self, Reader as _};
use tokio_modbus::{Slave, prelude::SlaveContext as _};
use tokio_serial::{DataBits, SerialPortBuilder, StopBits};
use tracing::{debug, error, info};

use super::{DeviceError, ModbusErrorKind, RegisterReader, Result};
use crate::config::{Parity, Settings};

/// A Modbus RTU device on a serial port.
///
/// Framing, CRC and addressing are handled by `tokio-modbus`; this type only
/// owns the open port and maps failures into [`DeviceError`].
pub struct RtuDevice {
    context: Option<sync::Context>,
    port: String,
    baud_rate: u32,
    parity: Parity,
    data_bits: u8,
    stop_bits: u8,
    timeout: Duration,
    slave_id: u8,
}

impl RtuDevice {
    pub fn new(settings: &Settings) -> Self {
        info!(
            "Initializing RTU device on {} ({}, slave {})",
            settings.port,
            settings.serial_summary(),
            settings.slave_id
        );
        RtuDevice {
            context: None,
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
            parity: settings.parity,
            data_bits: settings.data_bits,
            stop_bits: settings.stop_bits,
            timeout: settings.timeout(),
            slave_id: settings.slave_id,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    fn builder(&self) -> SerialPortBuilder {
        tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(convert_data_bits(self.data_bits))
            .parity(convert_parity(self.parity))
            .stop_bits(convert_stop_bits(self.stop_bits))
            .timeout(self.timeout)
    }
}

impl RegisterReader for RtuDevice {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        info!("Attempting to open serial port {}", self.port);
        let context = sync::rtu::connect_slave_with_timeout(
            &self.builder(),
            Slave(self.slave_id),
            Some(self.timeout),
        )
        .map_err(|source| {
            error!("Failed to open serial port {}: {}", self.port, source);
            DeviceError::Connection {
                port: self.port.clone(),
                source,
            }
        })?;
        self.context = Some(context);
        info!("Serial port {} opened", self.port);
        Ok(())
    }

    fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let Some(context) = self.context.as_mut() else {
            error!("Attempted to read from {} but device is not connected", self.port);
            return Err(DeviceError::NotConnected);
        };

        context.set_slave(Slave(slave_id));
        debug!(
            "Reading {} holding register(s) at {} from slave {}",
            count, address, slave_id
        );
        let registers = match context.read_holding_registers(address, count) {
            Ok(Ok(registers)) => registers,
            Ok(Err(exception)) => {
                return Err(DeviceError::modbus(
                    ModbusErrorKind::Protocol,
                    format!("exception response {exception:?}"),
                ));
            }
            Err(err) => return Err(classify(err)),
        };

        if registers.is_empty() {
            return Err(DeviceError::empty_response());
        }
        debug!("Received registers: {:?}", registers);
        Ok(registers)
    }

    fn close(&mut self) {
        // Dropping the context releases the serial port.
        if self.context.take().is_some() {
            info!("Serial port {} closed", self.port);
        }
    }
}

fn classify(err: tokio_modbus::Error) -> DeviceError {
    match err {
        tokio_modbus::Error::Transport(io) if io.kind() == ErrorKind::TimedOut => {
            DeviceError::modbus(ModbusErrorKind::Timeout, io.to_string())
        }
        tokio_modbus::Error::Transport(io) => {
            DeviceError::modbus(ModbusErrorKind::Transport, io.to_string())
        }
        other => DeviceError::modbus(ModbusErrorKind::Protocol, other.to_string()),
    }
}

fn convert_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn convert_parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Even => tokio_serial::Parity::Even,
        Parity::Odd => tokio_serial::Parity::Odd,
    }
}

fn convert_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}
