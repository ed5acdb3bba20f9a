//! Text codec for Unified Namespace attributes.
//!
//! A namespace binding is stored as a single extended-attribute value of
//! the form `key1=value1:key2=value2:...`. This crate turns ordered
//! key/value pairs into that text and back.
//!
//! # Key Properties
//!
//! - `:`, `=` and the escape character `\` are escaped inside keys and values
//! - Strict roundtrip: `decode(encode(pairs)) == pairs`, order preserved
//! - No unit conversion: values come back exactly as they were written
//!
//! # Examples
//!
//! ```
//! use unsfs_codec::{decode, encode};
//!
//! let text = encode([("group", "daos_=:group"), ("pool", "456")]);
//! assert_eq!(text, r"group=daos_\=\:group:pool=456");
//!
//! let entries = decode(&text).unwrap();
//! assert_eq!(entries.get("group"), Some("daos_=:group"));
//! ```

mod decode;
mod encode;
mod key_values;

pub use decode::{decode, unescape, Decoder};
pub use encode::{encode, escape, is_special, ASSIGNMENT, ESCAPE, SEPARATOR};
pub use key_values::KeyValues;

/// Errors that can occur while decoding attribute text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A non-empty entry has no unescaped `=`.
    #[error("entry `{entry}` at offset {offset} has no unescaped `=`")]
    MissingAssignment { entry: String, offset: usize },

    /// Input ended right after an escape character.
    #[error("dangling escape character at offset {offset}")]
    TrailingEscape { offset: usize },

    /// A key the caller requires to be unique was repeated with a different value.
    #[error("key `{key}` appears more than once with conflicting values")]
    DuplicateKey { key: String },
}
