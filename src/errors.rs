use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use thiserror::Error;

/// Stable failure codes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    InvalidPath,
    NotFound,
    NotFile,
    NotDirectory,
    AlreadyExists,
    DirectoryNotEmpty,
    FileTooLarge,
    PatternNotFound,
    EditConflict,
    CommandNotAllowed,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPath => "InvalidPath",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::NotFile => "NotFile",
            ErrorCode::NotDirectory => "NotDirectory",
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::DirectoryNotEmpty => "DirectoryNotEmpty",
            ErrorCode::FileTooLarge => "FileTooLarge",
            ErrorCode::PatternNotFound => "PatternNotFound",
            ErrorCode::EditConflict => "EditConflict",
            ErrorCode::CommandNotAllowed => "CommandNotAllowed",
            ErrorCode::ValidationError => "ValidationError",
            ErrorCode::InternalError => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidPath | ErrorCode::CommandNotAllowed => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists | ErrorCode::DirectoryNotEmpty | ErrorCode::EditConflict => {
                StatusCode::CONFLICT
            }
            ErrorCode::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::NotFile
            | ErrorCode::NotDirectory
            | ErrorCode::PatternNotFound
            | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of a single tool operation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPath, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn file_too_large(path: &str, size: u64, limit: u64) -> Self {
        Self::new(
            ErrorCode::FileTooLarge,
            format!("{path} is {size} bytes, limit is {limit}"),
        )
        .with_details(json!({ "size": size, "limit": limit }))
    }

    /// Maps a filesystem failure on `path` (workspace-relative) onto the taxonomy.
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::new(ErrorCode::NotFound, format!("not found: {path}")),
            io::ErrorKind::AlreadyExists => {
                Self::new(ErrorCode::AlreadyExists, format!("already exists: {path}"))
            }
            io::ErrorKind::NotADirectory => {
                Self::new(ErrorCode::NotDirectory, format!("not a directory: {path}"))
            }
            io::ErrorKind::IsADirectory => {
                Self::new(ErrorCode::NotFile, format!("is a directory, not a file: {path}"))
            }
            io::ErrorKind::DirectoryNotEmpty => {
                Self::new(ErrorCode::DirectoryNotEmpty, format!("directory not empty: {path}"))
            }
            _ => Self::internal(format!("filesystem operation failed on {path}"))
                .with_details(json!({ "cause": err.to_string() })),
        }
    }
}

/// Attaches the workspace-relative path to an io failure.
pub trait IoContext<T> {
    fn for_path(self, path: &str) -> Result<T, ToolError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn for_path(self, path: &str) -> Result<T, ToolError> {
        self.map_err(|e| ToolError::from_io(e, path))
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Transport-level failures; tool failures are carried through unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("origin denied")]
    OriginDenied,
    #[error("request too large")]
    RequestTooLarge,
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "Unauthorized",
            AppError::OriginDenied => "OriginDenied",
            AppError::RequestTooLarge => "RequestTooLarge",
            AppError::UnknownTool(_) => "UnknownTool",
            AppError::Tool(e) => e.code.as_str(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::OriginDenied => StatusCode::FORBIDDEN,
            AppError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnknownTool(_) => StatusCode::NOT_FOUND,
            AppError::Tool(e) => e.code.status(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            AppError::Tool(e) => e.details.clone(),
            _ => None,
        };
        ErrorBody { code: self.code(), message: self.to_string(), details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.body() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_onto_codes() {
        let cases = [
            (io::ErrorKind::NotFound, ErrorCode::NotFound),
            (io::ErrorKind::AlreadyExists, ErrorCode::AlreadyExists),
            (io::ErrorKind::NotADirectory, ErrorCode::NotDirectory),
            (io::ErrorKind::IsADirectory, ErrorCode::NotFile),
            (io::ErrorKind::DirectoryNotEmpty, ErrorCode::DirectoryNotEmpty),
            (io::ErrorKind::PermissionDenied, ErrorCode::InternalError),
        ];
        for (kind, code) in cases {
            let err = ToolError::from_io(io::Error::from(kind), "a/b");
            assert_eq!(err.code, code, "{kind:?}");
        }
    }

    #[test]
    fn unmapped_errors_keep_cause() {
        let err = ToolError::from_io(io::Error::new(io::ErrorKind::Other, "disk on fire"), "x");
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.details.unwrap()["cause"], "disk on fire");
    }

    #[test]
    fn tool_errors_keep_their_code_through_transport() {
        let err: AppError = ToolError::file_too_large("big.bin", 10, 5).into();
        assert_eq!(err.code(), "FileTooLarge");
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = err.body();
        assert_eq!(body.details.unwrap()["limit"], 5);
    }
}
