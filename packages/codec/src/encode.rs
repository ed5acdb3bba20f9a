//! Attribute text encoding.

use crate::KeyValues;

/// Separates entries: `key1=value1:key2=value2`.
pub const SEPARATOR: char = ':';

/// Separates a key from its value within an entry.
pub const ASSIGNMENT: char = '=';

/// Prefixes a literal separator, assignment or escape character.
pub const ESCAPE: char = '\\';

/// Whether `c` has to be escaped inside a key or value.
pub fn is_special(c: char) -> bool {
    c == SEPARATOR || c == ASSIGNMENT || c == ESCAPE
}

/// Escape a single key or value.
///
/// The escape character itself is escaped too, so a value that already
/// looks escaped still decodes back to exactly what was passed in.
///
/// ```
/// use unsfs_codec::escape;
///
/// assert_eq!(escape("plain"), "plain");
/// assert_eq!(escape("a:b=1"), r"a\:b\=1");
/// assert_eq!(escape(r"a\:b"), r"a\\\:b");
/// ```
pub fn escape(input: &str) -> String {
    let extra = input.chars().filter(|c| is_special(*c)).count();
    if extra == 0 {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len() + extra);
    for c in input.chars() {
        if is_special(c) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Encode an ordered sequence of pairs into attribute text.
///
/// ```
/// use unsfs_codec::encode;
///
/// let text = encode([("group", "a:b=1"), ("pool", "123")]);
/// assert_eq!(text, r"group=a\:b\=1:pool=123");
/// ```
pub fn encode<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (i, (key, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(&escape(key.as_ref()));
        out.push(ASSIGNMENT);
        out.push_str(&escape(value.as_ref()));
    }
    out
}

impl KeyValues {
    /// Encode these entries, in order, into attribute text.
    pub fn encode(&self) -> String {
        encode(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape(""), "");
        assert_eq!(escape("0,1,2"), "0,1,2");
        assert_eq!(escape("daos_server"), "daos_server");
    }

    #[test]
    fn escape_each_special_character() {
        assert_eq!(escape(":"), r"\:");
        assert_eq!(escape("="), r"\=");
        assert_eq!(escape(r"\"), r"\\");
        assert_eq!(escape("daos_=:group"), r"daos_\=\:group");
    }

    #[test]
    fn encode_empty_sequence() {
        let pairs: Vec<(&str, &str)> = Vec::new();
        assert_eq!(encode(pairs), "");
    }

    #[test]
    fn encode_joins_with_separator() {
        assert_eq!(
            encode([("pool", "123"), ("cont", "789"), ("svc", "0")]),
            "pool=123:cont=789:svc=0"
        );
    }

    #[test]
    fn encode_escapes_keys_as_well_as_values() {
        assert_eq!(encode([("a=b", "c")]), r"a\=b=c");
    }

    #[test]
    fn encode_empty_value() {
        assert_eq!(encode([("group", "")]), "group=");
    }
}
