//! The typed attribute record and its conversion to and from the flat form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unsfs_codec::KeyValues;

use crate::config::keys;
use crate::{Error, Result};

/// Logical data organization stored in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Layout {
    #[default]
    Unknown,
    Posix,
    Hdf5,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Unknown => "UNKNOWN",
            Layout::Posix => "POSIX",
            Layout::Hdf5 => "HDF5",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = Error;

    /// Accepts a layout name in any case or its numeric wire value.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" | "0" => Ok(Layout::Unknown),
            "POSIX" | "1" => Ok(Layout::Posix),
            "HDF5" | "2" => Ok(Layout::Hdf5),
            _ => Err(Error::malformed_record(
                keys::LAYOUT,
                format!("has unrecognized value `{}`", s),
            )),
        }
    }
}

/// Identity and layout of a container bound to a path.
///
/// Pool and container ids are always non-empty. Whether a nonzero chunk
/// size is acceptable is left to the storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct AttributeRecord {
    pool_id: String,
    container_id: String,
    layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_type: Option<String>,
    chunk_size: u64,
    on_specialized_fs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<BTreeMap<String, String>>,
}

impl AttributeRecord {
    pub fn new(
        pool_id: impl Into<String>,
        container_id: impl Into<String>,
        layout: Layout,
    ) -> Result<Self> {
        let pool_id = pool_id.into();
        let container_id = container_id.into();
        if pool_id.trim().is_empty() {
            return Err(Error::malformed_record(keys::POOL_ID, "must not be empty"));
        }
        if container_id.trim().is_empty() {
            return Err(Error::malformed_record(
                keys::CONTAINER_ID,
                "must not be empty",
            ));
        }
        Ok(Self {
            pool_id,
            container_id,
            layout,
            object_type: None,
            chunk_size: 0,
            on_specialized_fs: false,
            properties: None,
        })
    }

    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_specialized_fs(mut self, on_specialized_fs: bool) -> Self {
        self.on_specialized_fs = on_specialized_fs;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    /// Chunk size in bytes; 0 means the engine default.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn on_specialized_fs(&self) -> bool {
        self.on_specialized_fs
    }

    pub fn properties(&self) -> Option<&BTreeMap<String, String>> {
        self.properties.as_ref()
    }

    /// Build a record from decoded attribute entries.
    ///
    /// Keys the record does not know about are ignored here; callers that
    /// need them keep the [`KeyValues`] around.
    pub fn from_key_values(entries: &KeyValues) -> Result<Self> {
        let pool_id = entries.get(keys::POOL_ID).unwrap_or_default();
        let container_id = entries.get(keys::CONTAINER_ID).unwrap_or_default();
        let layout = entries
            .get(keys::LAYOUT)
            .ok_or_else(|| Error::malformed_record(keys::LAYOUT, "is required"))?
            .parse()?;

        let mut record = Self::new(pool_id, container_id, layout)?;

        if let Some(object_type) = entries.get(keys::OBJECT_TYPE) {
            if !object_type.is_empty() {
                record.object_type = Some(object_type.to_string());
            }
        }
        if let Some(chunk_size) = entries.get(keys::CHUNK_SIZE) {
            record.chunk_size = parse_chunk_size(chunk_size)?;
        }
        if let Some(flag) = entries.get(keys::SPECIALIZED_FS) {
            record.on_specialized_fs = parse_flag(keys::SPECIALIZED_FS, flag)?;
        }

        for (key, value) in entries.iter() {
            if let Some(name) = key.strip_prefix(keys::PROPERTY_PREFIX) {
                record = record.with_property(name, value);
            }
        }

        Ok(record)
    }

    /// The flat form of this record, in a stable key order.
    pub fn to_key_values(&self) -> KeyValues {
        let mut entries = KeyValues::new();
        entries.push(keys::POOL_ID, self.pool_id.as_str());
        entries.push(keys::CONTAINER_ID, self.container_id.as_str());
        entries.push(keys::LAYOUT, self.layout.as_str());
        if let Some(object_type) = &self.object_type {
            entries.push(keys::OBJECT_TYPE, object_type.as_str());
        }
        if self.chunk_size != 0 {
            entries.push(keys::CHUNK_SIZE, self.chunk_size.to_string());
        }
        if self.on_specialized_fs {
            entries.push(keys::SPECIALIZED_FS, "true");
        }
        if let Some(properties) = &self.properties {
            for (name, value) in properties {
                entries.push(format!("{}{}", keys::PROPERTY_PREFIX, name), value.as_str());
            }
        }
        entries
    }
}

/// Unvalidated wire form of [`AttributeRecord`].
#[derive(Deserialize)]
struct RecordFields {
    pool_id: String,
    container_id: String,
    layout: Layout,
    #[serde(default)]
    object_type: Option<String>,
    #[serde(default)]
    chunk_size: u64,
    #[serde(default)]
    on_specialized_fs: bool,
    #[serde(default)]
    properties: Option<BTreeMap<String, String>>,
}

impl TryFrom<RecordFields> for AttributeRecord {
    type Error = Error;

    fn try_from(fields: RecordFields) -> Result<Self> {
        let mut record = Self::new(fields.pool_id, fields.container_id, fields.layout)?;
        record.object_type = fields.object_type;
        record.chunk_size = fields.chunk_size;
        record.on_specialized_fs = fields.on_specialized_fs;
        record.properties = fields.properties;
        Ok(record)
    }
}

fn parse_chunk_size(raw: &str) -> Result<u64> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(0);
    }
    if value.starts_with('-') {
        return Err(Error::malformed_record(
            keys::CHUNK_SIZE,
            format!("must not be negative, got `{}`", raw),
        ));
    }
    value.parse().map_err(|_| {
        Error::malformed_record(keys::CHUNK_SIZE, format!("is not a number: `{}`", raw))
    })
}

fn parse_flag(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(Error::malformed_record(
            field,
            format!("expected true or false, got `{}`", raw),
        )),
    }
}
