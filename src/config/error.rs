use crate::errors::domain::{classify_io_error, DomainError, ErrorCode, IoErrorHint};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    NotFound,
    PermissionDenied,
    ReadFailed,
    ParseFailed,
    InvalidValue,
}

impl ErrorCode for ConfigErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::NotFound => "config_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::ReadFailed => "config_read_failed",
            Self::ParseFailed => "config_parse_failed",
            Self::InvalidValue => "invalid_config_value",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_value(key: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::InvalidValue,
            format!("Invalid value for {key}: {detail}"),
        )
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn from_io_error(context: impl Into<String>, error: std::io::Error) -> Self {
        let code = match classify_io_error(&error) {
            IoErrorHint::NotFound => ConfigErrorCode::NotFound,
            IoErrorHint::PermissionDenied => ConfigErrorCode::PermissionDenied,
            _ => ConfigErrorCode::ReadFailed,
        };
        Self::new(code, format!("{}: {error}", context.into()))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl DomainError for ConfigError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
