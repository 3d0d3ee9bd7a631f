use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::frame_processor::ProcessError;

/// Errors that end a batch or stream run.
///
/// Per-image load failures are not here: they are recorded in the report
/// and the run continues.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Can not open image list file {}: {source}", path.display())]
    OpenList {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read image list: {0}")]
    ReadList(std::io::Error),
    #[error("Can not open output file {}: {source}", path.display())]
    CreateReport {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("Failed to open camera {device}: {message}")]
    SourceOpen { device: String, message: String },
    #[error("{0} stopped producing frames")]
    EndOfStream(String),
    #[error("Display failed: {0}")]
    Display(String),
}
