use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Clipboard API is not available")]
    ClipboardUnavailable,

    #[error("Clipboard write was rejected: {0}")]
    ClipboardRejected(String),

    #[error("Capture library '{0}' is not available")]
    LibraryUnavailable(String),

    #[error("Timed out loading capture library '{0}'")]
    LibraryLoadTimeout(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Capture timed out after {0} ms")]
    CaptureTimeout(u64),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Element '{0}' not found")]
    TargetNotFound(String),

    #[error("{feature} is not enabled for '{instance}'")]
    FeatureDisabled { instance: String, feature: String },

    #[error("All screenshot strategies failed: {0}")]
    AllStrategiesFailed(String),
}

impl From<image::ImageError> for RuntimeError {
    fn from(err: image::ImageError) -> Self {
        RuntimeError::Encode(err.to_string())
    }
}
