use crate::{
    errors::domain::{DomainError, ErrorCode},
    fs_utils::{FsUtilsError, FsUtilsErrorCode},
    resource::{ResourceError, ResourceErrorCode},
    tasks::{TaskError, TaskErrorCode},
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardErrorCode {
    InvalidInput,
    ClipboardEmpty,
    NotFound,
    NotDirectory,
    SymlinkUnsupported,
    TargetExists,
    PermissionDenied,
    Cancelled,
    TaskNotFound,
    TaskFailed,
    IoError,
}

impl ErrorCode for ClipboardErrorCode {
    fn as_code_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ClipboardEmpty => "clipboard_empty",
            Self::NotFound => "not_found",
            Self::NotDirectory => "not_directory",
            Self::SymlinkUnsupported => "symlink_unsupported",
            Self::TargetExists => "target_exists",
            Self::PermissionDenied => "permission_denied",
            Self::Cancelled => "cancelled",
            Self::TaskNotFound => "task_not_found",
            Self::TaskFailed => "task_failed",
            Self::IoError => "io_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClipboardError {
    code: ClipboardErrorCode,
    message: String,
}

impl ClipboardError {
    pub fn new(code: ClipboardErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ClipboardErrorCode::InvalidInput, message)
    }

    pub fn target_exists(message: impl Into<String>) -> Self {
        Self::new(ClipboardErrorCode::TargetExists, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ClipboardErrorCode::Cancelled, "Paste cancelled")
    }

    pub fn io(context: impl fmt::Display, error: std::io::Error) -> Self {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ClipboardErrorCode::NotFound,
            std::io::ErrorKind::AlreadyExists => ClipboardErrorCode::TargetExists,
            _ => ClipboardErrorCode::IoError,
        };
        Self::new(code, format!("{context}: {error}"))
    }

    pub fn code(&self) -> ClipboardErrorCode {
        self.code
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ClipboardErrorCode::Cancelled
    }
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClipboardError {}

impl DomainError for ClipboardError {
    fn code_str(&self) -> &'static str {
        self.code.as_code_str()
    }

    fn message(&self) -> &str {
        &self.message
    }
}

impl From<ResourceError> for ClipboardError {
    fn from(error: ResourceError) -> Self {
        let code = match error.code() {
            ResourceErrorCode::AlreadyExists => ClipboardErrorCode::TargetExists,
            ResourceErrorCode::NotFound => ClipboardErrorCode::NotFound,
            ResourceErrorCode::SymlinkUnsupported => ClipboardErrorCode::SymlinkUnsupported,
            ResourceErrorCode::InvalidPath
            | ResourceErrorCode::InvalidInput
            | ResourceErrorCode::NotAFile
            | ResourceErrorCode::NotAFolder => ClipboardErrorCode::InvalidInput,
            ResourceErrorCode::PermissionDenied
            | ResourceErrorCode::ReadOnlyFilesystem
            | ResourceErrorCode::PropertyStoreFailed
            | ResourceErrorCode::LockFailed
            | ResourceErrorCode::IoError => ClipboardErrorCode::IoError,
        };
        Self::new(code, error.to_string())
    }
}

impl From<FsUtilsError> for ClipboardError {
    fn from(error: FsUtilsError) -> Self {
        let code = match error.code() {
            FsUtilsErrorCode::NotFound => ClipboardErrorCode::NotFound,
            FsUtilsErrorCode::PermissionDenied => ClipboardErrorCode::PermissionDenied,
            FsUtilsErrorCode::InvalidPath
            | FsUtilsErrorCode::RootForbidden
            | FsUtilsErrorCode::CanonicalizeFailed
            | FsUtilsErrorCode::MetadataReadFailed => ClipboardErrorCode::InvalidInput,
        };
        Self::new(code, error.to_string())
    }
}

impl From<TaskError> for ClipboardError {
    fn from(error: TaskError) -> Self {
        let code = match error.code() {
            TaskErrorCode::TaskNotFound => ClipboardErrorCode::TaskNotFound,
            _ => ClipboardErrorCode::TaskFailed,
        };
        Self::new(code, error.to_string())
    }
}

pub type ClipboardResult<T> = Result<T, ClipboardError>;
