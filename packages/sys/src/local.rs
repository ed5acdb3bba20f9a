//! A storage connector that keeps containers as directories on local disk.
//!
//! Container `<cont>` of pool `<pool>` lives at `<root>/<pool>/<cont>`, and
//! client paths are resolved inside it. Useful for demos and tests where no
//! storage cluster is available.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use unsfs_core::{ClientError, OpenRequest, StorageClient, StorageConnector};

#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
    create_missing: bool,
}

impl LocalConnector {
    /// Connector over `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !fs::metadata(&root)?.is_dir() {
            return Err(io::Error::other(format!(
                "storage root {} must be a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: root.canonicalize()?,
            create_missing: false,
        })
    }

    /// Create pool and container directories on open instead of failing.
    pub fn create_missing(mut self, create: bool) -> Self {
        self.create_missing = create;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A single path component: no separators, no `.` or `..`.
fn component(kind: &str, id: &str) -> Result<(), ClientError> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ClientError::Engine {
            code: -libc::EINVAL,
            message: format!("invalid {} id `{}`", kind, id),
        }),
    }
}

impl StorageConnector for LocalConnector {
    type Client = LocalClient;

    fn open(&self, request: &OpenRequest<'_>) -> Result<LocalClient, ClientError> {
        component("pool", request.pool_id)?;
        component("container", request.container_id)?;

        let container = self.root.join(request.pool_id).join(request.container_id);
        log::debug!(
            "Opening {} (ranks {}, flags {})...",
            container.display(),
            request.ranks,
            request.flags
        );

        if self.create_missing {
            fs::create_dir_all(&container)?;
        } else if !container.is_dir() {
            return Err(ClientError::Engine {
                code: -libc::ENOENT,
                message: format!(
                    "container {} not found in pool {}",
                    request.container_id, request.pool_id
                ),
            });
        }

        Ok(LocalClient {
            container,
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct LocalClient {
    container: PathBuf,
    open: bool,
}

impl LocalClient {
    /// Host directory of the open container.
    pub fn container_dir(&self) -> &Path {
        &self.container
    }

    fn host_path(&self, path: &str) -> Result<PathBuf, ClientError> {
        if !self.open {
            return Err(ClientError::Engine {
                code: -libc::EBADF,
                message: "client is closed".to_string(),
            });
        }

        let mut host = self.container.clone();
        for part in Path::new(path).components() {
            match part {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(name) => host.push(name),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ClientError::Engine {
                        code: -libc::EINVAL,
                        message: format!("path `{}` escapes the container", path),
                    });
                }
            }
        }
        Ok(host)
    }
}

impl StorageClient for LocalClient {
    fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let host = self.host_path(path)?;
        log::debug!("mkdir {} (recursive: {})", host.display(), recursive);

        let result = if recursive {
            fs::create_dir_all(&host)
        } else {
            fs::create_dir(&host)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(ClientError::AlreadyExists(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), ClientError> {
        self.open = false;
        Ok(())
    }
}
