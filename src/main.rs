use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use rtu_register_logger::logging::setup_logging;
use rtu_register_logger::{PollSummary, Poller, PollerError, RtuDevice, Settings, StopToken};

fn main() -> ExitCode {
    let settings = Settings::parse();

    // Held until exit so buffered log lines are flushed.
    let _guard = match setup_logging(&settings.log_dir, &settings.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            // No subscriber yet, so stderr is the only place to report this.
            eprintln!(
                "Failed to set up logging in {}: {}",
                settings.log_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };
    info!("Starting application");

    match run(&settings) {
        Ok(summary) => {
            info!(
                "Application shutting down after {} requests ({} samples, {} read errors, {} write errors, {} empty responses)",
                summary.requests,
                summary.samples,
                summary.read_errors,
                summary.write_errors,
                summary.empty_responses
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Mirrored to stderr by the WARN+ writer.
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> Result<PollSummary, PollerError> {
    settings.validate()?;
    info!("Settings: {:?}", settings);

    let stop = StopToken::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived termination signal (Ctrl+C). Closing connection...");
        handler_stop.request_stop();
    })
    .map_err(|e| PollerError::SignalHandler(e.to_string()))?;

    println!(
        "Connecting to {} ({}, {})...",
        settings.port,
        settings.method,
        settings.serial_summary()
    );
    println!("Press Ctrl+C to stop polling");

    let device = RtuDevice::new(settings);
    let mut poller = Poller::new(device, settings, stop);
    poller.run()
}
