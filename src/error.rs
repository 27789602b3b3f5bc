//! Error types shared by every public operation of the viewer core.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Every failure the viewer core can report
///
/// Parsing never surfaces a partially built asset: the first error aborts the
/// load and is returned as one of these variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("unsupported glTF version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing resource: {0}")]
    MissingResource(String),

    #[error("accessor {accessor} out of range: {reason}")]
    AccessorOutOfRange { accessor: usize, reason: String },

    #[error("unsupported required extension: {0}")]
    UnsupportedRequiredExtension(String),

    #[error("GPU upload failed: {0}")]
    GpuUploadFailed(String),

    #[error("shader compilation failed: {0}")]
    ShaderCompileFailed(String),

    #[error("HDR decode failed: {0}")]
    HdrDecodeFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("engine is not initialized")]
    NotInitialized,
}

/// Fieldless mirror of [`ViewerError`], cheap to copy and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedContainer,
    UnsupportedVersion,
    MalformedJson,
    MissingResource,
    AccessorOutOfRange,
    UnsupportedRequiredExtension,
    GpuUploadFailed,
    ShaderCompileFailed,
    HdrDecodeFailed,
    InvalidArgument,
    NotInitialized,
}

impl ViewerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ViewerError::MalformedContainer(_) => ErrorKind::MalformedContainer,
            ViewerError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            ViewerError::MalformedJson(_) => ErrorKind::MalformedJson,
            ViewerError::MissingResource(_) => ErrorKind::MissingResource,
            ViewerError::AccessorOutOfRange { .. } => ErrorKind::AccessorOutOfRange,
            ViewerError::UnsupportedRequiredExtension(_) => ErrorKind::UnsupportedRequiredExtension,
            ViewerError::GpuUploadFailed(_) => ErrorKind::GpuUploadFailed,
            ViewerError::ShaderCompileFailed(_) => ErrorKind::ShaderCompileFailed,
            ViewerError::HdrDecodeFailed(_) => ErrorKind::HdrDecodeFailed,
            ViewerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ViewerError::NotInitialized => ErrorKind::NotInitialized,
        }
    }

    pub(crate) fn accessor(accessor: usize, reason: impl Into<String>) -> Self {
        ViewerError::AccessorOutOfRange {
            accessor,
            reason: reason.into(),
        }
    }
}
