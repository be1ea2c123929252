use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("device command failed: {command}: {output}")]
    DeviceCommand { command: String, output: String },

    #[error("failed to start capture: {0}")]
    CaptureStart(Box<Error>),

    #[error("failed to retrieve `{remote}`: {source}")]
    ArtifactRetrieval { remote: String, source: Box<Error> },

    #[error("trace summary missing expected field: {0}")]
    TraceParse(String),

    #[error("analysis cancelled")]
    AnalysisCancelled,

    #[error("corrupt result set `{path}`: {reason}")]
    CorruptResultSet { path: PathBuf, reason: String },

    #[error("no connected device available")]
    NoDeviceAvailable,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
