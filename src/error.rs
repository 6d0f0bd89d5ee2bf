//! Error types for lspc

use thiserror::Error;

use crate::infra::lsp::protocol::{Method, ResponseError, error_codes};

pub type LspcResult<T> = std::result::Result<T, LspcError>;

#[derive(Debug, Error)]
pub enum LspcError {
    #[error("{0}")]
    Lsp(#[from] LspError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How loudly an error should be reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Error)]
pub enum LspError {
    #[error("Failed to start server: {0}")]
    ServerStart(String),

    #[error("Server not connected")]
    NotConnected,

    #[error("{identity} is already running")]
    DuplicateStart { identity: String },

    #[error("No server named '{0}' is running")]
    UnknownServer(String),

    #[error("No language server configured for '{0}'. Run 'lspc doctor' to see configured servers.")]
    NoServerForLanguage(String),

    #[error("No active language server for {path}")]
    NoActiveServer { path: String },

    #[error("No active server supports '{feature}'")]
    FeatureNotSupported { feature: String },

    #[error("{identity} terminated{}", exit_suffix(.code))]
    ServerTerminated { identity: String, code: Option<i32> },

    #[error("{method} failed [{code}]: {message}")]
    ServerError {
        method: String,
        code: i32,
        message: String,
    },

    #[error("{0}")]
    NoBuffer(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => String::new(),
    }
}

impl LspError {
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            Self::DuplicateStart { .. } | Self::FeatureNotSupported { .. } => NoticeLevel::Warning,
            Self::ServerError { code, .. } if *code == error_codes::REQUEST_CANCELLED => {
                NoticeLevel::Info
            }
            _ => NoticeLevel::Error,
        }
    }

    /// Build a user-facing error for a failed request, keyed by the method it was sent for
    pub fn server_error(method: Method, err: ResponseError) -> Self {
        let message = match err.code {
            error_codes::METHOD_NOT_FOUND => {
                format!("Server does not implement {}", method.as_str())
            }
            error_codes::SERVER_NOT_INITIALIZED => {
                "Server initializing. Try again in a moment.".to_string()
            }
            error_codes::CONTENT_MODIFIED => "Document changed during the request".to_string(),
            error_codes::REQUEST_CANCELLED => "Request cancelled".to_string(),
            _ if err.message.trim().is_empty() => "Operation failed".to_string(),
            _ => err.message.trim().to_string(),
        };

        Self::ServerError {
            method: method.as_str().to_string(),
            code: err.code,
            message,
        }
    }
}

/// Framing failures; the stream resynchronizes after each one
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Missing Content-Length header")]
    MissingLength,

    #[error("Invalid Content-Length: {0}")]
    InvalidLength(String),

    #[error("Frame of {0} bytes exceeds the limit")]
    TooLarge(usize),

    #[error("Discarded {0} bytes of output with no frame header")]
    NoHeader(usize),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// A response result whose shape does not match what the method promises
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("Unrecognized result format: {0}")]
    InvalidShape(String),

    #[error("Location links are not supported")]
    UnsupportedLink,

    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
