use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

impl DropError {
    /// Short message suitable for printing to the terminal.
    pub fn user_friendly_message(&self) -> String {
        match self {
            DropError::IoError(e) => format!("File system problem: {}", e),
            DropError::TomlError(_) => "The configuration file is not valid TOML".to_string(),
            DropError::SerializationError(_) => "Could not serialize output".to_string(),
            DropError::ConfigError { message } => format!("Configuration problem: {}", message),
            DropError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            DropError::ServerError { message } => format!("Could not start the file server: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DropError::IoError(_) => "Check that the serve directory exists and is writable",
            DropError::TomlError(_) => "Fix the syntax error reported above in the config file",
            DropError::SerializationError(_) => "Re-run with --verbose and report the output",
            DropError::ConfigError { .. } | DropError::InvalidConfigValueError { .. } => {
                "Check the command line flags and the config file values"
            }
            DropError::ServerError { .. } => "Try another --port-start or --bind address",
        }
    }
}

pub type Result<T> = std::result::Result<T, DropError>;
