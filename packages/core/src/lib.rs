//! Unified Namespace resolution for a distributed filesystem client.
//!
//! This crate decides which pool and container a filesystem URI refers to
//! and opens a client for it:
//! - `AttributeRecord`: typed identity/layout of a bound container
//! - `AttributeResolver`: reads and decodes namespace attributes on paths
//! - `ConnectionResolver`: URI + explicit configuration → `ConnectionParameters`
//! - `FilesystemBootstrap`: `ConnectionParameters` → `FsHandle`
//!
//! The storage engine and the host's extended attributes are reached only
//! through the [`StorageConnector`] and [`AttributeService`] traits.
//!
//! # Example
//!
//! ```rust
//! use unsfs_core::testing::MockConnector;
//! use unsfs_core::{
//!     BootstrapOptions, ConfigMap, ConnectionResolver, FilesystemBootstrap,
//!     InMemoryAttributes, ResolverConfig,
//! };
//!
//! let attributes = InMemoryAttributes::new();
//! attributes.insert("/mnt/data", "user.daos.hadoop", "pool=456:cont=789");
//!
//! let resolver = ConnectionResolver::new(attributes, ResolverConfig::default());
//! let params = resolver.resolve("daos://uns/mnt/data", &ConfigMap::new()).unwrap();
//! assert_eq!(params.pool_id(), "456");
//!
//! let options = BootstrapOptions::for_user("alice");
//! let bootstrap = FilesystemBootstrap::new(MockConnector::new(), options);
//! let mut handle = bootstrap.initialize(params).unwrap();
//! assert_eq!(handle.working_directory(), "/user/alice");
//! handle.close().unwrap();
//! ```

mod attribute;
mod authority;
mod bootstrap;
mod client;
pub mod config;
mod error;
mod params;
mod record;
mod resolver;
pub mod testing;

pub use attribute::{AttributeResolver, AttributeService, AttributeValue, InMemoryAttributes};
pub use authority::{Authority, FsUri};
pub use bootstrap::{BootstrapOptions, FilesystemBootstrap, FsHandle, DEFAULT_HOME_ROOT};
pub use client::{ClientError, OpenRequest, StorageClient, StorageConnector};
pub use config::{keys, ConfigMap, Precedence, ResolverConfig, SizeUnit};
pub use error::{Error, Result, Stage};
pub use params::{parse_size, ConnectionParameters};
pub use record::{AttributeRecord, Layout};
pub use resolver::{merge, ConnectionResolver};

// Re-export the codec so callers need only one dependency.
pub use unsfs_codec::{self as codec, DecodeError, KeyValues};
