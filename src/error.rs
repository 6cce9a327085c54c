use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Calendar fetch error: {0}")]
    #[diagnostic(code(kalenteristatus::fetch))]
    Fetch(String),

    #[error("Initialization error: {0}")]
    #[diagnostic(
        code(kalenteristatus::initialization),
        help("check the Google credentials and network access, then restart")
    )]
    Initialization(String),

    #[error("Status publish error: {0}")]
    #[diagnostic(code(kalenteristatus::publish))]
    Publish(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(kalenteristatus::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(kalenteristatus::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(kalenteristatus::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(kalenteristatus::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(kalenteristatus::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(kalenteristatus::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create calendar fetch errors
pub fn fetch_error(message: &str) -> Error {
    Error::Fetch(message.to_string())
}

/// Helper to create initialization errors
pub fn initialization_error(message: &str) -> Error {
    Error::Initialization(message.to_string())
}

/// Helper to create status publish errors
pub fn publish_error(message: &str) -> Error {
    Error::Publish(message.to_string())
}
