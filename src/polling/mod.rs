pub mod data;
pub mod logger;

use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, Settings};
use crate::devices::{DeviceError, ModbusErrorKind, RegisterReader};
use crate::shutdown::StopToken;
use data::Sample;
use logger::{LoggerError, SampleLogger, TIMESTAMP_FORMAT};

/// Errors that end a run before polling starts.
#[derive(Error, Debug)]
pub enum PollerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    SignalHandler(String),

    #[error("Failed to connect to Modbus device: {0}")]
    Connect(#[source] DeviceError),
}

/// Why a single request produced no sample.
#[derive(Error, Debug)]
pub enum TickError {
    #[error("Modbus error: {0}")]
    Read(#[source] DeviceError),

    #[error("Log write error: {0}")]
    Append(#[source] LoggerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub requests: u64,
    pub samples: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub empty_responses: u64,
}

/// Polls one holding register at a fixed interval and logs converted samples.
pub struct Poller<R: RegisterReader> {
    reader: R,
    logger: SampleLogger,
    stop: StopToken,
    slave_id: u8,
    register_address: u16,
    register_count: u16,
    register_reference: u32,
    interval: Duration,
    state: PollState,
    request_counter: u64,
    summary: PollSummary,
}

impl<R: RegisterReader> Poller<R> {
    pub fn new(reader: R, settings: &Settings, stop: StopToken) -> Self {
        Poller {
            reader,
            logger: SampleLogger::new(settings.data_file.clone()),
            stop,
            slave_id: settings.slave_id,
            register_address: settings.register_address,
            register_count: settings.register_count,
            register_reference: settings.register_reference(),
            interval: settings.interval(),
            state: PollState::Starting,
            request_counter: 0,
            summary: PollSummary::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn summary(&self) -> PollSummary {
        self.summary
    }

    /// Poll until the stop token is triggered.
    pub fn run(&mut self) -> Result<PollSummary, PollerError> {
        self.run_until(None)
    }

    /// Poll at most `max_ticks` times, or until stopped.
    pub fn run_ticks(&mut self, max_ticks: u64) -> Result<PollSummary, PollerError> {
        self.run_until(Some(max_ticks))
    }

    fn run_until(&mut self, max_ticks: Option<u64>) -> Result<PollSummary, PollerError> {
        self.state = PollState::Starting;
        self.summary = PollSummary::default();

        if let Err(e) = self.reader.connect() {
            error!("Could not establish connection with the port/device: {}", e);
            self.shutdown();
            return Err(PollerError::Connect(e));
        }
        println!("Connected.");
        println!("{}", "-".repeat(40));
        info!(
            "Polling slave {} register {} every {:?}",
            self.slave_id, self.register_reference, self.interval
        );
        self.state = PollState::Running;

        while !self.stop.is_stopped() {
            if max_ticks.is_some_and(|max| self.summary.requests >= max) {
                break;
            }
            self.tick();
            if max_ticks.is_some_and(|max| self.summary.requests >= max) {
                break;
            }
            if self.stop.sleep(self.interval) {
                break;
            }
        }

        self.shutdown();
        info!("Polling stopped: {:?}", self.summary);
        Ok(self.summary)
    }

    fn shutdown(&mut self) {
        self.state = PollState::Stopping;
        self.reader.close();
        println!("\nConnection closed. Polling finished.");
        self.state = PollState::Stopped;
    }

    /// One request: read, convert, append. Failures are reported here and
    /// never leave the tick.
    fn tick(&mut self) {
        self.request_counter += 1;
        self.summary.requests += 1;
        let request = self.request_counter;
        println!(
            "[{}] Request #{}...",
            Local::now().format(TIMESTAMP_FORMAT),
            request
        );

        match self.poll_once() {
            Ok(sample) => {
                self.summary.samples += 1;
                info!(
                    "Request #{}: raw={} toc={:.3} P_kg={:.3}",
                    request, sample.raw, sample.toc, sample.p_kg
                );
            }
            Err(err) => {
                println!("{}", failure_line(request, &err));
                match &err {
                    TickError::Read(e)
                        if e.modbus_kind() == Some(ModbusErrorKind::EmptyResponse) =>
                    {
                        self.summary.empty_responses += 1;
                        warn!("Empty response to request #{}", request);
                    }
                    TickError::Read(e) => {
                        self.summary.read_errors += 1;
                        match e.modbus_kind() {
                            Some(ModbusErrorKind::Protocol | ModbusErrorKind::Timeout) => {
                                warn!("Error in request #{}: {}", request, e)
                            }
                            _ => error!("Unexpected error in request #{}: {:?}", request, e),
                        }
                    }
                    TickError::Append(e) => {
                        self.summary.write_errors += 1;
                        error!("Could not log sample of request #{}: {}", request, e);
                    }
                }
            }
        }
    }

    fn poll_once(&mut self) -> Result<Sample, TickError> {
        let registers = self
            .reader
            .read_holding_registers(self.slave_id, self.register_address, self.register_count)
            .map_err(TickError::Read)?;
        let Some(&raw) = registers.first() else {
            return Err(TickError::Read(DeviceError::empty_response()));
        };

        let sample = Sample::now(raw);
        println!(
            "  Register {}: {:.3} (0x{:04X})",
            self.register_reference, sample.toc, sample.raw
        );
        println!("  Register {}: {:.3} kg", self.register_reference, sample.p_kg);

        self.logger.append(&sample).map_err(TickError::Append)?;
        Ok(sample)
    }
}

/// Console line for a request that produced no sample.
fn failure_line(request: u64, err: &TickError) -> String {
    match err {
        TickError::Read(e) if e.modbus_kind() == Some(ModbusErrorKind::EmptyResponse) => {
            format!("  Request #{request}: warning: empty response (no register data)")
        }
        other => format!("  Request #{request}: {other}"),
    }
}
