//! The storage client this crate bootstraps.
//!
//! The native engine is out of reach here; it is seen only through these
//! traits. See [`testing`](crate::testing) for an in-process double and
//! `unsfs-sys` for a local-directory implementation.

use std::io;

/// Errors reported by a storage client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The directory to create already exists.
    #[error("`{0}` already exists")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Engine-specific failure with its native error code.
    #[error("storage engine error {code}: {message}")]
    Engine { code: i32, message: String },
}

/// Identity and options for opening a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest<'a> {
    pub pool_id: &'a str,
    pub container_id: &'a str,
    pub ranks: &'a str,
    pub server_group: Option<&'a str>,
    pub flags: u32,
}

/// An open connection to one container.
pub trait StorageClient: Send {
    /// Create a directory. With `recursive`, missing parents are created.
    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), ClientError>;

    /// Release the connection. Called at most once per client.
    fn close(&mut self) -> Result<(), ClientError>;
}

/// Opens [`StorageClient`]s.
pub trait StorageConnector: Send + Sync {
    type Client: StorageClient;

    fn open(&self, request: &OpenRequest<'_>) -> Result<Self::Client, ClientError>;
}

impl<T: StorageConnector + ?Sized> StorageConnector for &T {
    type Client = T::Client;

    fn open(&self, request: &OpenRequest<'_>) -> Result<Self::Client, ClientError> {
        (**self).open(request)
    }
}

impl<T: StorageClient + ?Sized> StorageClient for Box<T> {
    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), ClientError> {
        self.as_mut().mkdir(path, recursive)
    }

    fn close(&mut self) -> Result<(), ClientError> {
        self.as_mut().close()
    }
}
