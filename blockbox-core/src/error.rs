use thiserror::Error;

pub type BlockResult<T> = Result<T, BlockError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required field '{field}' for preset")]
    MissingField { field: String },

    #[error("Invalid slug '{slug}': must be lowercase letters, digits and single dashes")]
    InvalidSlug { slug: String },

    #[error("Duplicate slug '{slug}': preset slugs must be unique")]
    DuplicateSlug { slug: String },

    #[error("Preset '{slug}' not found")]
    PresetNotFound { slug: String },

    #[error("Invalid color value '{value}' for '{property}'")]
    InvalidColor { property: String, value: String },

    #[error("Invalid enum value '{value}' for property '{property}'. Expected one of: {expected}")]
    InvalidEnum {
        property: String,
        value: String,
        expected: String,
    },

    #[error("Value out of range for '{property}': {value}. Expected range: {range}")]
    ValueOutOfRange {
        property: String,
        value: String,
        range: String,
    },

    #[error("Invalid position '{position}' for placement '{placement}'")]
    InvalidPosition { placement: String, position: String },

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for BlockError {
    fn from(err: serde_json::Error) -> Self {
        BlockError::DeserializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for BlockError {
    fn from(err: serde_yaml::Error) -> Self {
        BlockError::DeserializationError(err.to_string())
    }
}

impl From<std::io::Error> for BlockError {
    fn from(err: std::io::Error) -> Self {
        BlockError::Io(err.to_string())
    }
}
