//! Resolved connection parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::authority::Authority;
use crate::config::{keys, ConfigMap, ResolverConfig, SizeUnit, GIB, KIB, MIB};
use crate::{Error, Result};

/// Everything needed to open a storage client, resolved and validated.
///
/// Built once per filesystem initialization and never changed afterwards.
/// Buffer sizes are in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParameterFields")]
pub struct ConnectionParameters {
    scheme: String,
    authority: Authority,
    pool_id: String,
    container_id: String,
    ranks: String,
    server_group: Option<String>,
    flags: u32,
    read_buffer_size: u64,
    preload_size: u64,
    write_buffer_size: u64,
    /// Keys not recognized by name, kept verbatim.
    extra: BTreeMap<String, String>,
}

impl ConnectionParameters {
    /// Validate a merged configuration map into parameters.
    ///
    /// Size keys are scaled here and nowhere else, so each value is
    /// converted exactly once.
    pub fn from_config(
        scheme: impl Into<String>,
        authority: Authority,
        merged: &ConfigMap,
        config: &ResolverConfig,
    ) -> Result<Self> {
        let pool_id = required(merged, keys::POOL_ID)?;
        let container_id = required(merged, keys::CONTAINER_ID)?;
        let ranks = optional(merged, keys::SERVICE_RANKS)
            .unwrap_or_else(|| config.default_ranks.clone());
        let server_group = optional(merged, keys::SERVER_GROUP);

        let flags = match optional(merged, keys::POOL_FLAGS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::invalid_parameter(keys::POOL_FLAGS, &raw, "expected an unsigned integer")
            })?,
            None => config.default_pool_flags,
        };

        let size = |key: &str, default: u64| -> Result<u64> {
            match optional(merged, key) {
                Some(raw) => parse_size(key, &raw, config.size_unit),
                None => Ok(default),
            }
        };
        let read_buffer_size = size(keys::READ_BUFFER_SIZE, config.default_read_buffer_size)?;
        let preload_size = size(keys::PRELOAD_SIZE, config.default_preload_size)?;
        let write_buffer_size = size(keys::WRITE_BUFFER_SIZE, config.default_write_buffer_size)?;

        let extra = merged
            .iter()
            .filter(|(key, _)| !keys::is_connection_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            scheme: scheme.into(),
            authority,
            pool_id,
            container_id,
            ranks,
            server_group,
            flags,
            read_buffer_size,
            preload_size,
            write_buffer_size,
            extra,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `scheme://authority`, the prefix used to qualify paths.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Comma- or colon-delimited service ranks.
    pub fn ranks(&self) -> &str {
        &self.ranks
    }

    pub fn server_group(&self) -> Option<&str> {
        self.server_group.as_deref()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn read_buffer_size(&self) -> u64 {
        self.read_buffer_size
    }

    pub fn preload_size(&self) -> u64 {
        self.preload_size
    }

    pub fn write_buffer_size(&self) -> u64 {
        self.write_buffer_size
    }

    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }
}

/// Unvalidated wire form of [`ConnectionParameters`].
#[derive(Deserialize)]
struct ParameterFields {
    scheme: String,
    authority: Authority,
    pool_id: String,
    container_id: String,
    ranks: String,
    server_group: Option<String>,
    flags: u32,
    read_buffer_size: u64,
    preload_size: u64,
    write_buffer_size: u64,
    #[serde(default)]
    extra: BTreeMap<String, String>,
}

impl TryFrom<ParameterFields> for ConnectionParameters {
    type Error = Error;

    fn try_from(fields: ParameterFields) -> Result<Self> {
        for (key, value) in [
            (keys::POOL_ID, &fields.pool_id),
            (keys::CONTAINER_ID, &fields.container_id),
            (keys::SERVICE_RANKS, &fields.ranks),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MissingParameter(key.to_string()));
            }
        }
        Ok(Self {
            scheme: fields.scheme,
            authority: fields.authority,
            pool_id: fields.pool_id,
            container_id: fields.container_id,
            ranks: fields.ranks,
            server_group: fields.server_group,
            flags: fields.flags,
            read_buffer_size: fields.read_buffer_size,
            preload_size: fields.preload_size,
            write_buffer_size: fields.write_buffer_size,
            extra: fields.extra,
        })
    }
}

/// A blank value counts as absent. Anything else is kept verbatim.
fn optional(map: &ConfigMap, key: &str) -> Option<String> {
    map.get(key)
        .filter(|value| !value.trim().is_empty())
        .cloned()
}

fn required(map: &ConfigMap, key: &str) -> Result<String> {
    optional(map, key).ok_or_else(|| Error::MissingParameter(key.to_string()))
}

const SUFFIXES: [(&str, u64); 7] = [
    ("gb", GIB),
    ("mb", MIB),
    ("kb", KIB),
    ("g", GIB),
    ("m", MIB),
    ("k", KIB),
    ("b", 1),
];

/// Parse a buffer size into bytes.
///
/// A plain decimal is in `unit`; an explicit `b`/`k`/`m`/`g` suffix
/// (optionally followed by `b`) overrides it.
pub fn parse_size(key: &str, raw: &str, unit: SizeUnit) -> Result<u64> {
    let value = raw.trim().to_ascii_lowercase();
    let (digits, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            value
                .strip_suffix(suffix)
                .map(|digits| (digits.trim_end(), *multiplier))
        })
        .unwrap_or((value.as_str(), unit.multiplier()));

    let number: u64 = digits.parse().map_err(|_| {
        Error::invalid_parameter(
            key,
            raw,
            "expected a non-negative integer with an optional b, k, m or g suffix",
        )
    })?;

    number
        .checked_mul(multiplier)
        .ok_or_else(|| Error::invalid_parameter(key, raw, "size overflows 64 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Authority {
        Authority::Endpoint {
            host: "1234".to_string(),
            port: 56,
        }
    }

    fn map(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(pairs: &[(&str, &str)]) -> Result<ConnectionParameters> {
        let config = ResolverConfig::default();
        ConnectionParameters::from_config("daos", endpoint(), &map(pairs), &config)
    }

    #[test]
    fn defaults_apply() {
        let params = build(&[("pool", "123"), ("cont", "56")]).unwrap();
        assert_eq!(params.ranks(), "0");
        assert_eq!(params.server_group(), None);
        assert_eq!(params.flags(), 2);
        assert_eq!(params.read_buffer_size(), 8 * MIB);
        assert_eq!(params.preload_size(), 4 * MIB);
        assert_eq!(params.write_buffer_size(), 8 * MIB);
        assert!(params.extra().is_empty());
        assert_eq!(params.origin(), "daos://1234:56");
    }

    #[test]
    fn blank_pool_is_missing() {
        let err = build(&[("pool", ""), ("cont", "56")]).unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref key) if key == "pool"));
        assert!(err.to_string().contains("pool"));
    }

    #[test]
    fn absent_pool_is_missing() {
        let err = build(&[("cont", "56")]).unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref key) if key == "pool"));
    }

    #[test]
    fn blank_container_is_missing() {
        let err = build(&[("pool", "123"), ("cont", "  ")]).unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref key) if key == "cont"));
    }

    #[test]
    fn blank_ranks_default() {
        let params = build(&[("pool", "123"), ("cont", "56"), ("svc", "")]).unwrap();
        assert_eq!(params.ranks(), "0");
    }

    #[test]
    fn plain_sizes_are_megabytes() {
        let params = build(&[
            ("pool", "123"),
            ("cont", "56"),
            ("read_buffer_size", "8"),
            ("preload_size", "0"),
            ("write_buffer_size", "2"),
        ])
        .unwrap();
        assert_eq!(params.read_buffer_size(), 8_388_608);
        assert_eq!(params.preload_size(), 0);
        assert_eq!(params.write_buffer_size(), 2_097_152);
    }

    #[test]
    fn suffixed_sizes_override_unit() {
        assert_eq!(parse_size("k", "4194304b", SizeUnit::Megabytes).unwrap(), 4_194_304);
        assert_eq!(parse_size("k", "512K", SizeUnit::Megabytes).unwrap(), 524_288);
        assert_eq!(parse_size("k", "4 MB", SizeUnit::Bytes).unwrap(), 4 * MIB);
        assert_eq!(parse_size("k", "1g", SizeUnit::Bytes).unwrap(), GIB);
    }

    #[test]
    fn byte_unit_leaves_plain_values() {
        assert_eq!(parse_size("k", "4194304", SizeUnit::Bytes).unwrap(), 4_194_304);
    }

    #[test]
    fn bad_sizes() {
        let err = parse_size("read_buffer_size", "-1", SizeUnit::Megabytes).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter { ref key, .. } if key == "read_buffer_size"
        ));
        assert!(parse_size("k", "lots", SizeUnit::Megabytes).is_err());
        assert!(parse_size("k", "mb", SizeUnit::Megabytes).is_err());
        assert!(parse_size("k", "18446744073709551615", SizeUnit::Megabytes).is_err());
    }

    #[test]
    fn flags_must_be_numeric() {
        let err = build(&[("pool", "1"), ("cont", "2"), ("flags", "rw")]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref key, .. } if key == "flags"));
    }

    #[test]
    fn unrecognized_keys_pass_through() {
        let params = build(&[
            ("pool", "1"),
            ("cont", "2"),
            ("group", "daos_server"),
            ("layout", "POSIX"),
            ("x.custom", "a:b"),
        ])
        .unwrap();
        assert_eq!(params.server_group(), Some("daos_server"));
        assert_eq!(params.extra().len(), 2);
        assert_eq!(params.extra()["x.custom"], "a:b");
    }

    #[test]
    fn serializes_to_json() {
        let params = build(&[("pool", "1"), ("cont", "2")]).unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["pool_id"], "1");
        assert_eq!(json["authority"]["kind"], "endpoint");

        let back: ConnectionParameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn deserializing_blank_ids_fails() {
        let params = build(&[("pool", "1"), ("cont", "2")]).unwrap();
        let mut json = serde_json::to_value(&params).unwrap();
        json["pool_id"] = serde_json::Value::from("");

        let err = serde_json::from_value::<ConnectionParameters>(json).unwrap_err();
        assert!(err.to_string().contains("`pool`"));
    }

    #[test]
    fn surrounding_spaces_are_kept() {
        let params = build(&[("pool", "1"), ("cont", "2"), ("group", " daos server ")]).unwrap();
        assert_eq!(params.server_group(), Some(" daos server "));
    }
}
