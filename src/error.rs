use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// Startup errors, surfaced by the binary before any stage is running.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel '{0}' is closed, the receiving stage has gone away")]
    Closed(&'static str),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open source '{path}': {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("Source '{0}' is not a directory of frames")]
    NotADirectory(PathBuf),
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A frame could not be turned into the form the analyzer compares.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("frame {sequence} has no pixels")]
    EmptyFrame { sequence: u64 },
    #[error("frame {sequence} is {actual:?}, the previous frame was {expected:?}")]
    ShapeMismatch {
        sequence: u64,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

#[derive(Error, Debug)]
pub enum PresentationError {
    #[error("Failed to open presentation surface '{name}': {reason}")]
    Open { name: String, reason: String },
    #[error("Failed to render frame {sequence}: {reason}")]
    Render { sequence: u64, reason: String },
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error("source could not be opened: {0}")]
    SourceOpen(#[source] SourceError),
    #[error("source read failed: {0}")]
    SourceRead(#[source] SourceError),
    #[error("frame conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("presentation failed: {0}")]
    Presentation(#[from] PresentationError),
    #[error("stage did not stop within the {grace:?} grace period and was aborted")]
    StragglerTimeout { grace: Duration },
    #[error("stage panicked: {0}")]
    Panicked(String),
}

impl StageError {
    /// A closed channel or a reaped straggler is the expected aftermath of an
    /// early cancellation; everything else means the run did not complete.
    pub fn is_abnormal(&self) -> bool {
        !matches!(
            self,
            StageError::Channel(_) | StageError::StragglerTimeout { .. }
        )
    }
}
