//! Opening a storage client from resolved parameters.

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OpenRequest, StorageClient, StorageConnector};
use crate::error::Stage;
use crate::params::ConnectionParameters;
use crate::{Error, Result};

pub const DEFAULT_HOME_ROOT: &str = "/user";

/// Where the working directory of a new handle lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapOptions {
    /// Name used for the default `<home_root>/<user>` directory.
    pub user: String,
    pub home_root: String,
    /// Overrides the per-user default when set.
    pub working_dir: Option<String>,
}

impl BootstrapOptions {
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            home_root: DEFAULT_HOME_ROOT.to_string(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// The absolute working directory these options describe.
    pub fn working_directory(&self) -> Result<String> {
        if let Some(dir) = &self.working_dir {
            if !dir.starts_with('/') {
                return Err(Error::invalid_parameter(
                    "working_dir",
                    dir,
                    "must be an absolute path",
                ));
            }
            return Ok(dir.clone());
        }

        if self.user.is_empty() || self.user.contains('/') {
            return Err(Error::invalid_parameter(
                "user",
                &self.user,
                "must be a non-empty name without `/`",
            ));
        }
        if !self.home_root.starts_with('/') {
            return Err(Error::invalid_parameter(
                "home_root",
                &self.home_root,
                "must be an absolute path",
            ));
        }
        Ok(format!(
            "{}/{}",
            self.home_root.trim_end_matches('/'),
            self.user
        ))
    }
}

/// Turns [`ConnectionParameters`] into a ready [`FsHandle`].
#[derive(Debug, Clone)]
pub struct FilesystemBootstrap<C> {
    connector: C,
    options: BootstrapOptions,
}

impl<C: StorageConnector> FilesystemBootstrap<C> {
    pub fn new(connector: C, options: BootstrapOptions) -> Self {
        Self { connector, options }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    /// Open the client and make sure the working directory exists.
    ///
    /// Once the client is open, every failure closes it before returning.
    pub fn initialize(&self, params: ConnectionParameters) -> Result<FsHandle<C::Client>> {
        let working_dir = self.options.working_directory()?;

        let request = OpenRequest {
            pool_id: params.pool_id(),
            container_id: params.container_id(),
            ranks: params.ranks(),
            server_group: params.server_group(),
            flags: params.flags(),
        };
        let mut client = self
            .connector
            .open(&request)
            .map_err(|source| Error::BootstrapFailed {
                stage: Stage::Open,
                source,
            })?;

        match client.mkdir(&working_dir, true) {
            Ok(()) | Err(ClientError::AlreadyExists(_)) => {}
            Err(source) => {
                if let Err(e) = client.close() {
                    log::warn!("Failed to close client after bootstrap error: {}", e);
                }
                return Err(Error::BootstrapFailed {
                    stage: Stage::CreateWorkingDirectory,
                    source,
                });
            }
        }

        log::info!(
            "Initialized {} (pool {}, container {}) at {}",
            params.origin(),
            params.pool_id(),
            params.container_id(),
            working_dir
        );

        Ok(FsHandle {
            client: Some(client),
            params,
            working_dir,
        })
    }
}

/// An initialized filesystem: an open client plus its working directory.
///
/// The client is released by [`FsHandle::close`] or, failing that, on drop.
#[derive(Debug)]
pub struct FsHandle<S: StorageClient> {
    client: Option<S>,
    params: ConnectionParameters,
    working_dir: String,
}

impl<S: StorageClient> FsHandle<S> {
    pub fn params(&self) -> &ConnectionParameters {
        &self.params
    }

    pub fn working_directory(&self) -> &str {
        &self.working_dir
    }

    /// The working directory prefixed with `scheme://authority`.
    pub fn qualified_working_directory(&self) -> String {
        format!("{}{}", self.params.origin(), self.working_dir)
    }

    /// Whether reads go through the preload buffer.
    pub fn is_preload_enabled(&self) -> bool {
        self.params.preload_size() > 0
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// The open client, or `None` after [`FsHandle::close`].
    pub fn client_mut(&mut self) -> Option<&mut S> {
        self.client.as_mut()
    }

    /// Release the client. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.client.take() {
            Some(mut client) => client.close().map_err(|source| Error::BootstrapFailed {
                stage: Stage::Close,
                source,
            }),
            None => Ok(()),
        }
    }
}

impl<S: StorageClient> Drop for FsHandle<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Failed to close client for {}: {}", self.working_dir, e);
        }
    }
}
