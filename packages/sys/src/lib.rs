//! # unsfs-sys
//!
//! Host implementations of the collaborators `unsfs-core` needs:
//!
//! - [`HostAttributes`]: extended attributes through `getxattr`/`setxattr`
//! - [`LocalConnector`]: containers kept as directories under a local root
//! - [`current_user_name`]: the login name used for the default working directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use unsfs_core::{ConfigMap, ConnectionResolver, FilesystemBootstrap, ResolverConfig};
//! use unsfs_sys::{options_for_current_user, HostAttributes, LocalConnector};
//!
//! let resolver = ConnectionResolver::new(HostAttributes::new(), ResolverConfig::default());
//! let params = resolver.resolve("daos://uns/mnt/bound", &ConfigMap::new()).unwrap();
//!
//! let connector = LocalConnector::new("/var/tmp/unsfs").unwrap().create_missing(true);
//! let bootstrap = FilesystemBootstrap::new(connector, options_for_current_user("root"));
//! let mut handle = bootstrap.initialize(params).unwrap();
//! println!("working directory: {}", handle.qualified_working_directory());
//! handle.close().unwrap();
//! ```

pub mod local;
pub mod user;
pub mod xattr;

pub use local::{LocalClient, LocalConnector};
pub use user::{current_user_name, options_for_current_user};
pub use xattr::HostAttributes;

#[cfg(test)]
mod tests {
    use super::*;
    use unsfs_core::{
        BootstrapOptions, ConfigMap, ConnectionResolver, FilesystemBootstrap, ResolverConfig,
    };

    #[test]
    fn bootstrap_on_local_disk() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ConnectionResolver::new(HostAttributes::new(), ResolverConfig::default());
        let explicit: ConfigMap = [("pool", "tank"), ("cont", "set1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let params = resolver.resolve("daos://127.0.0.1:10001/", &explicit).unwrap();

        let connector = LocalConnector::new(dir.path()).unwrap().create_missing(true);
        let bootstrap = FilesystemBootstrap::new(connector, BootstrapOptions::for_user("test"));

        let mut handle = bootstrap.initialize(params.clone()).unwrap();
        assert!(dir.path().join("tank/set1/user/test").is_dir());
        handle.close().unwrap();

        // Second initialization finds the directory already there.
        let mut handle = bootstrap.initialize(params).unwrap();
        handle.close().unwrap();
        handle.close().unwrap();
    }
}
