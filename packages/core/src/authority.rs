//! Filesystem URI parsing.
//!
//! Two authority shapes are accepted:
//!
//! ```text
//! daos://10.0.0.1:10001/some/dir   direct endpoint, ids come from configuration
//! daos://uns/mnt/bound/dir         namespace lookup of /mnt/bound/dir
//! ```

use std::fmt;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ResolverConfig;
use crate::{Error, Result};

/// How a filesystem URI addresses its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Authority {
    /// A `host:port` cluster endpoint.
    Endpoint { host: String, port: u16 },
    /// The namespace sentinel; `path` is probed for a binding.
    Namespace { sentinel: String, path: PathBuf },
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Endpoint { host, port } => write!(f, "{}:{}", host, port),
            Authority::Namespace { sentinel, .. } => write!(f, "{}", sentinel),
        }
    }
}

/// A filesystem URI split into the parts the resolver cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsUri {
    pub scheme: String,
    pub authority: Authority,
    /// Percent-decoded path component. Empty when the URI has no path.
    pub path: String,
}

impl FsUri {
    pub fn parse(uri: &str, config: &ResolverConfig) -> Result<Self> {
        let invalid = || Error::InvalidAuthority {
            authority: raw_authority(uri).to_string(),
            expected: config.expected_authority(),
        };

        let url = Url::parse(uri).map_err(|_| invalid())?;

        if !config.scheme.is_empty() && !url.scheme().eq_ignore_ascii_case(&config.scheme) {
            return Err(Error::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                expected: config.scheme.clone(),
            });
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid());
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host,
            _ => return Err(invalid()),
        };
        let path = percent_decode_str(url.path())
            .decode_utf8_lossy()
            .into_owned();

        let authority = match url.port() {
            Some(port) => Authority::Endpoint {
                host: host.to_string(),
                port,
            },
            // `uns:` has an empty port, which the parser reports as no port.
            None if host.eq_ignore_ascii_case(&config.namespace_authority)
                && !raw_authority(uri).contains(':') =>
            {
                let probe = if path.is_empty() { "/" } else { path.as_str() };
                Authority::Namespace {
                    sentinel: host.to_string(),
                    path: PathBuf::from(probe),
                }
            }
            None => return Err(invalid()),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
            path,
        })
    }

    /// `scheme://authority`, the prefix used to qualify paths.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

/// The text between `://` and the next `/`. Without `://` there is no
/// authority to isolate, so the whole URI is returned.
fn raw_authority(uri: &str) -> &str {
    match uri.split_once("://") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or(rest),
        None => uri,
    }
}
