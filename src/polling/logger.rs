use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::data::Sample;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
#[error("Cannot append to {path}: {source}")]
pub struct LoggerError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Appends one line per sample to a text file.
///
/// The file is opened in append mode for every sample and closed again before
/// `append` returns, so no handle is held between polls and existing lines are
/// never touched.
#[derive(Debug, Clone)]
pub struct SampleLogger {
    path: PathBuf,
}

impl SampleLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SampleLogger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, sample: &Sample) -> Result<(), LoggerError> {
        let line = format_line(sample);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.error(source))?;
        debug!("Appended sample to {}", self.path.display());
        Ok(())
    }

    fn error(&self, source: std::io::Error) -> LoggerError {
        LoggerError {
            path: self.path.clone(),
            source,
        }
    }
}

/// `[YYYY-MM-DD HH:MM:SS] toc = 12.000, P_kg = 79.001` plus newline.
pub fn format_line(sample: &Sample) -> String {
    format!(
        "[{}] toc = {:.3}, P_kg = {:.3}\n",
        sample.timestamp.format(TIMESTAMP_FORMAT),
        sample.toc,
        sample.p_kg
    )
}
