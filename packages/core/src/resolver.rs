//! Turning a filesystem URI plus explicit configuration into
//! [`ConnectionParameters`].

use std::borrow::Cow;
use std::path::Path;

use unsfs_codec::KeyValues;

use crate::attribute::{AttributeResolver, AttributeService};
use crate::authority::{Authority, FsUri};
use crate::config::{ConfigMap, Precedence, ResolverConfig};
use crate::params::ConnectionParameters;
use crate::{Error, Result};

/// Resolves connection parameters for one filesystem initialization.
///
/// Resolution only reads: the caller's configuration is never mutated and
/// no state is kept between calls, so one resolver can serve many
/// independent initializations.
#[derive(Debug, Clone)]
pub struct ConnectionResolver<A> {
    attributes: AttributeResolver<A>,
    config: ResolverConfig,
}

impl<A: AttributeService> ConnectionResolver<A> {
    pub fn new(service: A, config: ResolverConfig) -> Self {
        Self {
            attributes: AttributeResolver::new(service),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn attributes(&self) -> &AttributeResolver<A> {
        &self.attributes
    }

    /// Resolve `uri` against `explicit` configuration.
    ///
    /// For a `host:port` authority the ids must come from `explicit`. For
    /// the namespace sentinel the URI path is probed for a binding, whose
    /// entries are merged with `explicit` according to
    /// [`ResolverConfig::precedence`].
    pub fn resolve(&self, uri: &str, explicit: &ConfigMap) -> Result<ConnectionParameters> {
        let FsUri {
            scheme, authority, ..
        } = FsUri::parse(uri, &self.config)?;

        let merged = match &authority {
            Authority::Endpoint { host, port } => {
                log::debug!("Resolving {} as direct endpoint {}:{}", uri, host, port);
                Cow::Borrowed(explicit)
            }
            Authority::Namespace { path, .. } => {
                log::debug!("Resolving {} through namespace {}", uri, path.display());
                Cow::Owned(self.merge_namespace(path, explicit)?)
            }
        };

        ConnectionParameters::from_config(scheme, authority, &merged, &self.config)
    }

    fn merge_namespace(&self, path: &Path, explicit: &ConfigMap) -> Result<ConfigMap> {
        let entries = self
            .attributes
            .resolve_entries(
                path,
                &self.config.attribute_name,
                self.config.max_attribute_len,
                self.config.follow_symlink,
            )?
            .ok_or_else(|| Error::NamespaceBindingNotFound {
                path: path.display().to_string(),
                name: self.config.attribute_name.clone(),
            })?;

        Ok(merge(explicit, entries, self.config.precedence))
    }
}

/// Overlay attribute `entries` onto a copy of `explicit`.
///
/// With [`Precedence::AttributeWins`] every key in `entries` replaces the
/// explicit value; with [`Precedence::ExplicitWins`] entries only fill
/// keys that are absent or blank in `explicit`. Repeated entries resolve
/// to their last value before merging.
pub fn merge(explicit: &ConfigMap, entries: KeyValues, precedence: Precedence) -> ConfigMap {
    let mut merged = explicit.clone();
    for (key, value) in entries.into_map() {
        match merged.get(&key) {
            Some(current) if *current == value => {}
            Some(current)
                if precedence == Precedence::ExplicitWins && !current.trim().is_empty() =>
            {
                log::debug!("Keeping explicit {}={} over namespace value", key, current);
            }
            Some(current) => {
                log::debug!("Namespace overrides {}={} with {}", key, current, value);
                merged.insert(key, value);
            }
            None => {
                merged.insert(key, value);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::InMemoryAttributes;
    use crate::config::MIB;

    const NAME: &str = "user.daos.hadoop";

    fn map(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolver() -> (InMemoryAttributes, ConnectionResolver<InMemoryAttributes>) {
        let attributes = InMemoryAttributes::new();
        let resolver = ConnectionResolver::new(attributes.clone(), ResolverConfig::default());
        (attributes, resolver)
    }

    #[test]
    fn direct_endpoint_uses_explicit_config() {
        let (_, resolver) = resolver();
        let params = resolver
            .resolve(
                "daos://1234:56/",
                &map(&[("pool", "123"), ("cont", "56"), ("svc", "0")]),
            )
            .unwrap();
        assert_eq!(params.pool_id(), "123");
        assert_eq!(params.container_id(), "56");
        assert_eq!(params.ranks(), "0");
    }

    #[test]
    fn direct_endpoint_blank_pool() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve("daos://1234:56/root", &map(&[("pool", ""), ("cont", "123")]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref key) if key == "pool"));
    }

    #[test]
    fn direct_endpoint_blank_container() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve("daos://1234:56/root", &map(&[("pool", "123"), ("cont", "")]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref key) if key == "cont"));
    }

    #[test]
    fn other_authorities_are_invalid() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve("daos://file/abc", &map(&[("pool", "1"), ("cont", "2")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAuthority { .. }));
        assert!(err.to_string().contains("ip:port"));
    }

    #[test]
    fn namespace_without_binding() {
        let (_, resolver) = resolver();
        let err = resolver
            .resolve("daos://uns/file/abc", &ConfigMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NamespaceBindingNotFound { ref path, .. } if path == "/file/abc"
        ));
    }

    #[test]
    fn namespace_binding_overrides_explicit() {
        let (attributes, resolver) = resolver();
        attributes.insert("/file/abc", NAME, "pool=456:cont=789");

        let explicit = map(&[("pool", "123"), ("cont", "56")]);
        let params = resolver.resolve("daos://uns/file/abc", &explicit).unwrap();

        assert_eq!(params.pool_id(), "456");
        assert_eq!(params.container_id(), "789");
        // The caller's map is untouched.
        assert_eq!(explicit["pool"], "123");
    }

    #[test]
    fn namespace_binding_with_escaped_group() {
        let (attributes, resolver) = resolver();
        attributes.insert(
            "/file/abc",
            NAME,
            r"group=a\:b\=1:pool=123:cont=789:svc=0",
        );

        let params = resolver
            .resolve("daos://uns/file/abc", &ConfigMap::new())
            .unwrap();
        assert_eq!(params.server_group(), Some("a:b=1"));
        assert_eq!(params.pool_id(), "123");
        assert_eq!(params.container_id(), "789");
        assert_eq!(params.ranks(), "0");
    }

    #[test]
    fn namespace_fills_missing_explicit_keys() {
        let (attributes, resolver) = resolver();
        attributes.insert("/data", NAME, "pool=456");

        let params = resolver
            .resolve("daos://uns/data", &map(&[("cont", "56")]))
            .unwrap();
        assert_eq!(params.pool_id(), "456");
        assert_eq!(params.container_id(), "56");
    }

    #[test]
    fn explicit_wins_when_configured() {
        let attributes = InMemoryAttributes::new();
        attributes.insert("/data", NAME, "pool=456:cont=789:svc=1");
        let config = ResolverConfig {
            precedence: Precedence::ExplicitWins,
            ..ResolverConfig::default()
        };
        let resolver = ConnectionResolver::new(attributes, config);

        let params = resolver
            .resolve("daos://uns/data", &map(&[("pool", "123"), ("cont", "")]))
            .unwrap();
        assert_eq!(params.pool_id(), "123");
        assert_eq!(params.container_id(), "789");
        assert_eq!(params.ranks(), "1");
    }

    #[test]
    fn buffer_sizes_scale_once_per_resolve() {
        let (attributes, resolver) = resolver();
        attributes.insert("/data", NAME, "pool=1:cont=2:read_buffer_size=8");

        let explicit = map(&[("write_buffer_size", "4")]);
        let first = resolver.resolve("daos://uns/data", &explicit).unwrap();
        let second = resolver.resolve("daos://uns/data", &explicit).unwrap();

        assert_eq!(first.read_buffer_size(), 8 * MIB);
        assert_eq!(first.write_buffer_size(), 4 * MIB);
        assert_eq!(first, second);
    }

    #[test]
    fn attribute_keys_pass_through() {
        let (attributes, resolver) = resolver();
        attributes.insert("/data", NAME, "pool=1:cont=2:layout=POSIX:tier=hot");

        let params = resolver
            .resolve("daos://uns/data", &map(&[("app", "spark")]))
            .unwrap();
        assert_eq!(params.extra()["layout"], "POSIX");
        assert_eq!(params.extra()["tier"], "hot");
        assert_eq!(params.extra()["app"], "spark");
    }

    #[test]
    fn malformed_attribute_propagates() {
        let (attributes, resolver) = resolver();
        attributes.insert("/data", NAME, r"pool=1\");

        let err = resolver
            .resolve("daos://uns/data", &ConfigMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding(_)));
    }

    #[test]
    fn merge_prefers_attribute_by_default() {
        let explicit = map(&[("pool", "123"), ("svc", "0")]);
        let entries: KeyValues = [("pool", "456"), ("group", "g")].into_iter().collect();
        let merged = merge(&explicit, entries, Precedence::AttributeWins);
        assert_eq!(merged["pool"], "456");
        assert_eq!(merged["svc"], "0");
        assert_eq!(merged["group"], "g");
    }

    #[test]
    fn merge_duplicate_entries_last_wins() {
        let entries: KeyValues = [("pool", "1"), ("pool", "2")].into_iter().collect();
        let merged = merge(&ConfigMap::new(), entries, Precedence::AttributeWins);
        assert_eq!(merged["pool"], "2");

        let entries: KeyValues = [("pool", "1"), ("pool", "2")].into_iter().collect();
        let merged = merge(&ConfigMap::new(), entries, Precedence::ExplicitWins);
        assert_eq!(merged["pool"], "2");
    }
}
