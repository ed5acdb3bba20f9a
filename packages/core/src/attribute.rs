//! Reading and writing namespace bindings stored as extended attributes.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use unsfs_codec::KeyValues;

use crate::record::AttributeRecord;
use crate::{Error, Result};

/// Outcome of an attribute read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// The attribute is not set on the path (not an error condition).
    Absent,
    /// The stored value, at most `max_len` bytes.
    Present(Bytes),
    /// The stored value has `len` bytes, more than the caller allowed.
    TooLarge(usize),
}

/// Get/set access to extended attributes on the host filesystem.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn AttributeService>`.
pub trait AttributeService: Send + Sync {
    /// Read attribute `name` on `path`, reading at most `max_len` bytes.
    ///
    /// With `follow_symlink` unset, a symlink's own attributes are read.
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue>;

    /// Create or replace attribute `name` on `path`.
    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()>;
}

impl<T: AttributeService + ?Sized> AttributeService for &T {
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        (**self).get_attribute(path, name, max_len, follow_symlink)
    }

    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        (**self).set_attribute(path, name, value)
    }
}

impl<T: AttributeService + ?Sized> AttributeService for Box<T> {
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        self.as_ref().get_attribute(path, name, max_len, follow_symlink)
    }

    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        self.as_ref().set_attribute(path, name, value)
    }
}

impl<T: AttributeService + ?Sized> AttributeService for Arc<T> {
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        self.as_ref().get_attribute(path, name, max_len, follow_symlink)
    }

    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        self.as_ref().set_attribute(path, name, value)
    }
}

/// Attribute service backed by a map, keyed by path and attribute name.
///
/// Clones share the same map. Symlinks are not modelled, so
/// `follow_symlink` has no effect.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttributes {
    attributes: Arc<Mutex<HashMap<(PathBuf, String), Bytes>>>,
}

impl InMemoryAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name` on `path`.
    pub fn insert(
        &self,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        value: impl Into<Bytes>,
    ) {
        self.lock().insert((path.into(), name.into()), value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(PathBuf, String), Bytes>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.attributes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AttributeService for InMemoryAttributes {
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        _follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        let key = (path.to_path_buf(), name.to_string());
        Ok(match self.lock().get(&key) {
            None => AttributeValue::Absent,
            Some(value) if value.len() > max_len => AttributeValue::TooLarge(value.len()),
            Some(value) => AttributeValue::Present(value.clone()),
        })
    }

    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        self.insert(path, name, Bytes::copy_from_slice(value));
        Ok(())
    }
}

/// Decodes namespace bindings read through an [`AttributeService`].
#[derive(Debug, Clone)]
pub struct AttributeResolver<A> {
    service: A,
}

impl<A: AttributeService> AttributeResolver<A> {
    pub fn new(service: A) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &A {
        &self.service
    }

    /// Read and decode the flat entries stored on `path`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The attribute is not set, so the path carries no binding.
    /// * `Ok(Some(entries))` - The decoded entries, in stored order.
    /// * `Err(..)` - The value is too large, not UTF-8, or badly escaped,
    ///   or the read itself failed.
    pub fn resolve_entries(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> Result<Option<KeyValues>> {
        log::debug!("Reading attribute {} on {}...", name, path.display());

        let value = self
            .service
            .get_attribute(path, name, max_len, follow_symlink)
            .map_err(|source| Error::AttributeIo {
                path: path.display().to_string(),
                name: name.to_string(),
                source,
            })?;

        let bytes = match value {
            AttributeValue::Absent => return Ok(None),
            AttributeValue::TooLarge(len) => {
                return Err(too_large(path, name, len, max_len));
            }
            AttributeValue::Present(bytes) if bytes.len() > max_len => {
                return Err(too_large(path, name, bytes.len(), max_len));
            }
            AttributeValue::Present(bytes) => bytes,
        };

        let text = std::str::from_utf8(&bytes).map_err(|e| {
            Error::MalformedRecord {
                field: name.to_string(),
                message: format!("is not valid UTF-8: {}", e),
            }
        })?;

        Ok(Some(unsfs_codec::decode(text)?))
    }

    /// Read, decode and validate the typed record stored on `path`.
    pub fn resolve(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> Result<Option<AttributeRecord>> {
        self.resolve_entries(path, name, max_len, follow_symlink)?
            .map(|entries| AttributeRecord::from_key_values(&entries))
            .transpose()
    }

    /// Encode `entries` and store them as attribute `name` on `path`.
    pub fn bind(&self, path: &Path, name: &str, entries: &KeyValues, max_len: usize) -> Result<()> {
        let text = entries.encode();
        if text.len() > max_len {
            return Err(too_large(path, name, text.len(), max_len));
        }

        log::debug!("Writing attribute {} on {}...", name, path.display());
        self.service
            .set_attribute(path, name, text.as_bytes())
            .map_err(|source| Error::AttributeIo {
                path: path.display().to_string(),
                name: name.to_string(),
                source,
            })
    }

    /// Store `record`, followed by `extra` entries, on `path`.
    pub fn bind_record(
        &self,
        path: &Path,
        name: &str,
        record: &AttributeRecord,
        extra: &KeyValues,
        max_len: usize,
    ) -> Result<()> {
        let mut entries = record.to_key_values();
        entries.extend(extra.iter());
        self.bind(path, name, &entries, max_len)
    }
}

fn too_large(path: &Path, name: &str, len: usize, max: usize) -> Error {
    Error::AttributeTooLarge {
        path: path.display().to_string(),
        name: name.to_string(),
        len,
        max,
    }
}
