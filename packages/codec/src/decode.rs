//! Attribute text decoding.
//!
//! The decoder is a two-state scanner. In the normal state it splits on
//! unescaped separators and on the first unescaped assignment of each
//! entry; after an escape character it takes the next character literally.

use std::collections::BTreeSet;

use crate::encode::{ASSIGNMENT, ESCAPE, SEPARATOR};
use crate::{DecodeError, KeyValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Escaped,
}

/// Accumulates one entry while scanning.
struct Entry {
    start: usize,
    key: Option<String>,
    current: String,
}

impl Entry {
    fn new(start: usize) -> Self {
        Self {
            start,
            key: None,
            current: String::new(),
        }
    }
}

/// Decode attribute text into an ordered sequence of pairs.
///
/// Duplicate keys are kept in order; [`KeyValues::get`] returns the last one.
///
/// ```
/// use unsfs_codec::decode;
///
/// let entries = decode(r"group=a\:b\=1:pool=123").unwrap();
/// assert_eq!(entries.get("group"), Some("a:b=1"));
/// assert_eq!(entries.get("pool"), Some("123"));
/// ```
pub fn decode(input: &str) -> Result<KeyValues, DecodeError> {
    let mut entries = KeyValues::new();
    let mut state = State::Normal;
    let mut entry = Entry::new(0);

    for (offset, c) in input.char_indices() {
        match state {
            State::Escaped => {
                entry.current.push(c);
                state = State::Normal;
            }
            State::Normal => match c {
                ESCAPE => state = State::Escaped,
                SEPARATOR => {
                    finish(input, entry, offset, &mut entries)?;
                    entry = Entry::new(offset + c.len_utf8());
                }
                ASSIGNMENT if entry.key.is_none() => {
                    entry.key = Some(std::mem::take(&mut entry.current));
                }
                _ => entry.current.push(c),
            },
        }
    }

    if state == State::Escaped {
        return Err(DecodeError::TrailingEscape {
            offset: input.len() - ESCAPE.len_utf8(),
        });
    }
    finish(input, entry, input.len(), &mut entries)?;

    Ok(entries)
}

fn finish(
    input: &str,
    entry: Entry,
    end: usize,
    entries: &mut KeyValues,
) -> Result<(), DecodeError> {
    // Empty entries come from a trailing or doubled separator.
    if entry.start == end {
        return Ok(());
    }
    match entry.key {
        Some(key) => {
            entries.push(key, entry.current);
            Ok(())
        }
        None => Err(DecodeError::MissingAssignment {
            entry: input[entry.start..end].to_string(),
            offset: entry.start,
        }),
    }
}

/// Reverse [`escape`](crate::escape) for a single key or value.
///
/// ```
/// use unsfs_codec::unescape;
///
/// assert_eq!(unescape(r"a\:b\=1").unwrap(), "a:b=1");
/// assert!(unescape(r"dangling\").is_err());
/// ```
pub fn unescape(input: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(input.len());
    let mut state = State::Normal;

    for c in input.chars() {
        match state {
            State::Escaped => {
                out.push(c);
                state = State::Normal;
            }
            State::Normal if c == ESCAPE => state = State::Escaped,
            State::Normal => out.push(c),
        }
    }

    if state == State::Escaped {
        return Err(DecodeError::TrailingEscape {
            offset: input.len() - ESCAPE.len_utf8(),
        });
    }
    Ok(out)
}

/// Decoder with caller-defined duplicate rules.
///
/// By default a repeated key overrides the earlier one. Keys registered
/// with [`Decoder::unique_keys`] may repeat only with the same value.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    unique: BTreeSet<String>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject conflicting repeats of any of `keys`.
    pub fn unique_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.unique.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn decode(&self, input: &str) -> Result<KeyValues, DecodeError> {
        let entries = decode(input)?;
        if self.unique.is_empty() {
            return Ok(entries);
        }

        let mut seen: Vec<(&str, &str)> = Vec::new();
        for (key, value) in entries.iter() {
            if !self.unique.contains(key) {
                continue;
            }
            match seen.iter().find(|(k, _)| *k == key) {
                Some((_, previous)) if *previous != value => {
                    return Err(DecodeError::DuplicateKey {
                        key: key.to_string(),
                    });
                }
                Some(_) => {}
                None => seen.push((key, value)),
            }
        }
        Ok(entries)
    }
}
