//! Configuration keys and resolver defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A flat, string-keyed configuration mapping.
pub type ConfigMap = BTreeMap<String, String>;

pub const KIB: u64 = 1 << 10;
pub const MIB: u64 = 1 << 20;
pub const GIB: u64 = 1 << 30;

/// Names of the keys understood by the resolver and the attribute record.
pub mod keys {
    pub const POOL_ID: &str = "pool";
    pub const CONTAINER_ID: &str = "cont";
    pub const SERVICE_RANKS: &str = "svc";
    pub const SERVER_GROUP: &str = "group";
    pub const POOL_FLAGS: &str = "flags";
    pub const READ_BUFFER_SIZE: &str = "read_buffer_size";
    pub const PRELOAD_SIZE: &str = "preload_size";
    pub const WRITE_BUFFER_SIZE: &str = "write_buffer_size";

    pub const LAYOUT: &str = "layout";
    pub const OBJECT_TYPE: &str = "oclass";
    pub const CHUNK_SIZE: &str = "chunk_size";
    pub const SPECIALIZED_FS: &str = "specialized_fs";
    pub const PROPERTY_PREFIX: &str = "prop.";

    /// Keys consumed when building connection parameters.
    pub const CONNECTION: [&str; 8] = [
        POOL_ID,
        CONTAINER_ID,
        SERVICE_RANKS,
        SERVER_GROUP,
        POOL_FLAGS,
        READ_BUFFER_SIZE,
        PRELOAD_SIZE,
        WRITE_BUFFER_SIZE,
    ];

    /// Buffer size keys, scaled from the configured unit to bytes.
    pub const SIZES: [&str; 3] = [READ_BUFFER_SIZE, PRELOAD_SIZE, WRITE_BUFFER_SIZE];

    pub fn is_connection_key(key: &str) -> bool {
        CONNECTION.contains(&key)
    }
}

/// Which side wins when the namespace attribute and the explicit
/// configuration both set a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// The namespace binding is authoritative for a path-addressed container.
    #[default]
    AttributeWins,
    /// Explicit configuration overrides the attribute. Opt-in only.
    ExplicitWins,
}

/// Unit of a buffer size written as a plain decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    Bytes,
    Kilobytes,
    #[default]
    Megabytes,
}

impl SizeUnit {
    pub fn multiplier(self) -> u64 {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::Kilobytes => KIB,
            SizeUnit::Megabytes => MIB,
        }
    }
}

/// Defaults and policy for [`ConnectionResolver`](crate::ConnectionResolver).
///
/// Everything the resolver would otherwise read from process-wide state
/// lives here, so resolution depends only on its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Accepted URI scheme. Empty accepts any scheme.
    pub scheme: String,
    /// Authority that requests a namespace lookup of the URI path.
    pub namespace_authority: String,
    /// Extended attribute holding the namespace binding.
    pub attribute_name: String,
    pub max_attribute_len: usize,
    pub follow_symlink: bool,
    pub precedence: Precedence,
    pub size_unit: SizeUnit,
    /// Defaults, in bytes.
    pub default_read_buffer_size: u64,
    pub default_preload_size: u64,
    pub default_write_buffer_size: u64,
    pub default_ranks: String,
    pub default_pool_flags: u32,
}

pub const DEFAULT_SCHEME: &str = "daos";
pub const DEFAULT_NAMESPACE_AUTHORITY: &str = "uns";
pub const DEFAULT_ATTRIBUTE_NAME: &str = "user.daos.hadoop";
pub const DEFAULT_MAX_ATTRIBUTE_LEN: usize = 1024;
pub const DEFAULT_RANKS: &str = "0";
/// Read-write pool connect.
pub const DEFAULT_POOL_FLAGS: u32 = 2;

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            namespace_authority: DEFAULT_NAMESPACE_AUTHORITY.to_string(),
            attribute_name: DEFAULT_ATTRIBUTE_NAME.to_string(),
            max_attribute_len: DEFAULT_MAX_ATTRIBUTE_LEN,
            follow_symlink: false,
            precedence: Precedence::default(),
            size_unit: SizeUnit::default(),
            default_read_buffer_size: 8 * MIB,
            default_preload_size: 4 * MIB,
            default_write_buffer_size: 8 * MIB,
            default_ranks: DEFAULT_RANKS.to_string(),
            default_pool_flags: DEFAULT_POOL_FLAGS,
        }
    }
}

impl ResolverConfig {
    /// Human-readable list of accepted authority shapes, used in errors.
    pub fn expected_authority(&self) -> String {
        format!(
            "ip:port, or `{}` for a namespace lookup",
            self.namespace_authority
        )
    }
}
