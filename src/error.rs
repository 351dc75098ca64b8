// Every variant states *where* things went wrong.
// Variants carry strings so the error can be cloned into the camera state
// and sent across the acquisition worker's channel.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String),

    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// No capture device at all. Fatal.
    #[error("No video source available: {0}")]
    SourceUnavailable(String),

    /// The device exists but the requested mode/resolution/facing is not satisfiable.
    #[error("Video source request failed: {0}")]
    SourceRequestFailed(String),

    #[error("Camera frame error: {0}")]
    CameraFrame(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config {path}: {reason}")]
    ConfigRead { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
