use http::StatusCode;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
pub enum ErrorKind {
    #[error("invalid input")]
    InvalidInput,
    #[error("url or absolute reference rejected")]
    UrlOrAbsoluteRejected,
    #[error("parent directory escapes base")]
    ParentDirectoryEscapesBase,
    #[error("resolved path escapes base")]
    ResolvedPathEscapesBase,
    #[error("extension not allowed")]
    ExtensionNotAllowed,
    #[error("file missing or not regular")]
    FileMissingOrNotRegular,
    #[error("content not recognized as image")]
    ContentNotRecognizedAsImage,
    #[error("filesystem error")]
    FilesystemError,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UrlOrAbsoluteRejected => "UrlOrAbsoluteRejected",
            ErrorKind::ParentDirectoryEscapesBase => "ParentDirectoryEscapesBase",
            ErrorKind::ResolvedPathEscapesBase => "ResolvedPathEscapesBase",
            ErrorKind::ExtensionNotAllowed => "ExtensionNotAllowed",
            ErrorKind::FileMissingOrNotRegular => "FileMissingOrNotRegular",
            ErrorKind::ContentNotRecognizedAsImage => "ContentNotRecognizedAsImage",
            ErrorKind::FilesystemError => "FilesystemError",
        }
    }

    /// Status a service wrapper should answer with. Everything except
    /// infrastructure trouble is the client's fault.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ParentDirectoryEscapesBase | ErrorKind::ResolvedPathEscapesBase => {
                StatusCode::FORBIDDEN
            }
            ErrorKind::InvalidInput
            | ErrorKind::UrlOrAbsoluteRejected
            | ErrorKind::ExtensionNotAllowed
            | ErrorKind::FileMissingOrNotRegular
            | ErrorKind::ContentNotRecognizedAsImage => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::FilesystemError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct Rejection {
    pub kind: ErrorKind,
    pub detail: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub(crate) fn io(context: &str, err: std::io::Error) -> Self {
        Self::new(ErrorKind::FilesystemError, format!("{context}: {err}"))
    }
}

/// Call-level failures. Raised before any candidate is looked at.
#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("base directory not configured")]
    MissingBaseDirectory,
    #[error("base directory {path} cannot be resolved: {source}")]
    BaseDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("base directory is not a directory: {0}")]
    BaseNotADirectory(PathBuf),
    #[error("invalid selection key pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("location {0} not present in sanitized clone")]
    LocationMismatch(String),
}

pub type SanitizeResult<T> = Result<T, SanitizeError>;
