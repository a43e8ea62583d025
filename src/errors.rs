//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// User input failed local validation (missing field, rejected file).
    Validation(String),
    /// Caller lacks the rights for the requested action (401/403).
    Unauthorized(String),
    /// Server answered with `success: false` and a message.
    Server(String),
    /// Transport-level HTTP failure.
    Http(String),
    /// A request exceeded its deadline.
    Timeout(String),
    /// A response body could not be decoded.
    Decode(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Operation was cancelled before it settled.
    Cancelled(String),
}

/// Coarse error taxonomy used to decide how a failure is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Inline, user-resolvable problem.
    Validation,
    /// Missing rights; degrades feature visibility.
    Authorization,
    /// Network failure or timeout; state stays last-known-good.
    Transport,
    /// Server-side logical error surfaced verbatim.
    ServerReported,
    /// Local configuration or file-system problem.
    Local,
}

impl AppError {
    /// Classify the error for presentation.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::Unauthorized(_) => ErrorClass::Authorization,
            Self::Http(_) | Self::Timeout(_) | Self::Decode(_) | Self::Cancelled(_) => {
                ErrorClass::Transport
            }
            Self::Server(_) | Self::NotFound(_) => ErrorClass::ServerReported,
            Self::Config(_) | Self::Io(_) => ErrorClass::Local,
        }
    }

    /// Text suitable for showing to the user.
    ///
    /// Server messages are passed through verbatim; transport failures
    /// collapse into a generic connection message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server(msg)
            | Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg) => msg.clone(),
            Self::Timeout(_) => "request timed out".into(),
            Self::Http(_) | Self::Decode(_) => "connection error".into(),
            Self::Cancelled(_) => "cancelled".into(),
            Self::Config(msg) | Self::Io(msg) => msg.clone(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::Server(msg) => write!(f, "server: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
