//! In-process storage double for tests and embedders.
//!
//! [`MockConnector`] records every call in a shared [`MockLog`] so tests
//! can assert on what the bootstrap did after the handle is gone.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{ClientError, OpenRequest, StorageClient, StorageConnector};

/// An `open` call as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedWith {
    pub pool_id: String,
    pub container_id: String,
    pub ranks: String,
    pub server_group: Option<String>,
    pub flags: u32,
}

/// Everything the mock saw, plus its directory tree.
#[derive(Debug, Default)]
pub struct MockLog {
    pub opens: Vec<OpenedWith>,
    pub mkdirs: Vec<(String, bool)>,
    pub closes: usize,
    pub directories: BTreeSet<String>,
}

/// Failures to inject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockFailures {
    pub open: bool,
    pub mkdir: bool,
    pub close: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    log: Arc<Mutex<MockLog>>,
    failures: MockFailures,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: MockFailures) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Pre-create `path` so the next `mkdir` of it reports `AlreadyExists`.
    pub fn with_directory(self, path: impl Into<String>) -> Self {
        lock(&self.log).directories.insert(path.into());
        self
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        lock(&self.log)
    }
}

fn lock(log: &Mutex<MockLog>) -> MutexGuard<'_, MockLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn injected(operation: &str) -> ClientError {
    ClientError::Engine {
        code: -1,
        message: format!("injected {} failure", operation),
    }
}

impl StorageConnector for MockConnector {
    type Client = MockClient;

    fn open(&self, request: &OpenRequest<'_>) -> Result<MockClient, ClientError> {
        lock(&self.log).opens.push(OpenedWith {
            pool_id: request.pool_id.to_string(),
            container_id: request.container_id.to_string(),
            ranks: request.ranks.to_string(),
            server_group: request.server_group.map(str::to_string),
            flags: request.flags,
        });
        if self.failures.open {
            return Err(injected("open"));
        }
        Ok(MockClient {
            log: Arc::clone(&self.log),
            failures: self.failures,
        })
    }
}

#[derive(Debug)]
pub struct MockClient {
    log: Arc<Mutex<MockLog>>,
    failures: MockFailures,
}

impl StorageClient for MockClient {
    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let mut log = lock(&self.log);
        log.mkdirs.push((path.to_string(), recursive));
        if self.failures.mkdir {
            return Err(injected("mkdir"));
        }
        if !log.directories.insert(path.to_string()) {
            return Err(ClientError::AlreadyExists(path.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ClientError> {
        lock(&self.log).closes += 1;
        if self.failures.close {
            return Err(injected("close"));
        }
        Ok(())
    }
}
