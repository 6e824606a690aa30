//! Error types for xwrite

use thiserror::Error;

use crate::credentials::Slot;

pub type Result<T> = std::result::Result<T, XWriteError>;

#[derive(Error, Debug)]
pub enum XWriteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl XWriteError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            XWriteError::InvalidInput(_) => 3,
            XWriteError::Import(_) => 3,
            XWriteError::Platform(PlatformError::Authentication { .. }) => 2,
            XWriteError::Platform(_) => 1,
            XWriteError::Config(_) => 1,
            XWriteError::State(_) => 1,
            XWriteError::Credential(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to access state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("State value for '{key}' has the wrong type (expected {expected})")]
    WrongType { key: String, expected: &'static str },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("OS keyring unavailable: {0}")]
    KeyringUnavailable(String),

    #[error("Keyring operation failed: {0}")]
    Keyring(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed (wrong master password?)")]
    DecryptionFailed,

    #[error("Master password not set")]
    MasterPasswordNotSet,

    #[error("Master password must be at least 8 characters")]
    WeakPassword,

    #[error("No credential storage backend available")]
    NoStoreAvailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Missing the following variables: {}", join_field_names(.0))]
    MissingFields(Vec<Slot>),

    #[error("Failed to read credentials file: {0}")]
    Read(#[from] std::io::Error),
}

impl ImportError {
    /// Canonical field names that were absent, in slot order
    pub fn missing_field_names(&self) -> Vec<&'static str> {
        match self {
            ImportError::MissingFields(slots) => slots.iter().map(|s| s.field_name()).collect(),
            ImportError::Read(_) => Vec::new(),
        }
    }
}

fn join_field_names(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|s| s.field_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Rate limit exceeded upstream: {message}")]
    RateLimit { message: String },

    #[error("Posting failed: {message}")]
    Posting { status: Option<u16>, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

impl PlatformError {
    /// Classify an upstream HTTP failure by status code
    ///
    /// 429 is an upstream rate limit, 401 and 403 are authentication or
    /// permission failures, anything else is a generic posting failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => PlatformError::RateLimit { message },
            401 | 403 => PlatformError::Authentication { status, message },
            _ => PlatformError::Posting {
                status: Some(status),
                message,
            },
        }
    }

    /// Upstream status code, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::Authentication { status, .. } => Some(*status),
            PlatformError::RateLimit { .. } => Some(429),
            PlatformError::Posting { status, .. } => *status,
            PlatformError::Network(_) => None,
        }
    }
}
