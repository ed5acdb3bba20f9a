//! Error types for resolution and bootstrap.

use std::fmt;

use unsfs_codec::DecodeError;

use crate::client::ClientError;

/// What the bootstrap was doing when the storage client failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    CreateWorkingDirectory,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Open => write!(f, "opening the storage client"),
            Stage::CreateWorkingDirectory => write!(f, "creating the working directory"),
            Stage::Close => write!(f, "closing the storage client"),
        }
    }
}

/// Errors raised while resolving connection parameters or bootstrapping.
///
/// None of these are retried internally. Codec errors pass through
/// unchanged as [`Error::MalformedEncoding`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed attribute encoding: {0}")]
    MalformedEncoding(#[from] DecodeError),

    #[error("malformed attribute record: `{field}` {message}")]
    MalformedRecord { field: String, message: String },

    #[error("attribute `{name}` on `{path}` is {len} bytes, more than the {max} byte limit")]
    AttributeTooLarge {
        path: String,
        name: String,
        len: usize,
        max: usize,
    },

    #[error("failed to access attribute `{name}` on `{path}`: {source}")]
    AttributeIo {
        path: String,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid authority `{authority}`: authority should be in format {expected}")]
    InvalidAuthority { authority: String, expected: String },

    #[error("unsupported scheme `{scheme}`, expected `{expected}`")]
    UnsupportedScheme { scheme: String, expected: String },

    #[error("missing required parameter `{0}`: set it in the configuration or the namespace attribute")]
    MissingParameter(String),

    #[error("invalid value `{value}` for `{key}`: {message}")]
    InvalidParameter {
        key: String,
        value: String,
        message: String,
    },

    #[error("no namespace binding at `{path}`: attribute `{name}` is not set")]
    NamespaceBindingNotFound { path: String, name: String },

    #[error("bootstrap failed while {stage}: {source}")]
    BootstrapFailed {
        stage: Stage,
        #[source]
        source: ClientError,
    },
}

impl Error {
    pub(crate) fn malformed_record(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedRecord {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameter(
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
