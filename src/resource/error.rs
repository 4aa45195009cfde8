use crate::{
    db::DbError,
    errors::domain::{classify_io_error, DomainError, ErrorCode, IoErrorHint},
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceErrorCode {
    InvalidPath,
    InvalidInput,
    NotFound,
    AlreadyExists,
    NotAFile,
    NotAFolder,
    SymlinkUnsupported,
    PermissionDenied,
    ReadOnlyFilesystem,
    PropertyStoreFailed,
    LockFailed,
    IoError,
}

impl ErrorCode for ResourceErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "invalid_path",
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::NotAFile => "not_a_file",
            Self::NotAFolder => "not_a_folder",
            Self::SymlinkUnsupported => "symlink_unsupported",
            Self::PermissionDenied => "permission_denied",
            Self::ReadOnlyFilesystem => "read_only_filesystem",
            Self::PropertyStoreFailed => "property_store_failed",
            Self::LockFailed => "lock_failed",
            Self::IoError => "io_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceError {
    code: ResourceErrorCode,
    message: String,
}

impl ResourceError {
    pub fn new(code: ResourceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ResourceErrorCode {
        self.code
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(
            ResourceErrorCode::NotFound,
            format!("Resource not found: {what}"),
        )
    }

    pub fn already_exists(what: impl fmt::Display) -> Self {
        Self::new(
            ResourceErrorCode::AlreadyExists,
            format!("Resource already exists: {what}"),
        )
    }

    pub fn lock_failed() -> Self {
        Self::new(ResourceErrorCode::LockFailed, "Failed to lock resource tree")
    }

    pub fn from_io_error(
        fallback: ResourceErrorCode,
        context: impl Into<String>,
        error: std::io::Error,
    ) -> Self {
        let code = match classify_io_error(&error) {
            IoErrorHint::NotFound => ResourceErrorCode::NotFound,
            IoErrorHint::AlreadyExists => ResourceErrorCode::AlreadyExists,
            IoErrorHint::PermissionDenied => ResourceErrorCode::PermissionDenied,
            IoErrorHint::ReadOnlyFilesystem => ResourceErrorCode::ReadOnlyFilesystem,
            IoErrorHint::InvalidInput => ResourceErrorCode::InvalidInput,
            IoErrorHint::Other => fallback,
        };
        Self::new(code, format!("{}: {error}", context.into()))
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ResourceError {}

impl DomainError for ResourceError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

impl From<DbError> for ResourceError {
    fn from(error: DbError) -> Self {
        Self::new(ResourceErrorCode::PropertyStoreFailed, error.to_string())
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;
