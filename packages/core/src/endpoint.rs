//! Endpoint identity and per-filesystem key layout.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A `(host, port)` pair naming one backend instance.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Parse `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| Error::InvalidUri {
            uri: s.to_string(),
            message: message.to_string(),
        };
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port.parse().map_err(|_| invalid("invalid port"))?;
        Ok(Endpoint::new(host, port))
    }
}

/// Where a filesystem lives: its scheme, its endpoint, and the constant key
/// prefix every content key under it starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    scheme: String,
    endpoint: Endpoint,
    prefix: Vec<String>,
}

impl Mount {
    /// Create a mount. Empty segments in `prefix` are dropped, so `""`,
    /// `"/"` and `"archive/"` all normalize.
    pub fn new(scheme: impl Into<String>, endpoint: Endpoint, prefix: &str) -> Self {
        Self {
            scheme: scheme.into(),
            endpoint,
            prefix: split_segments(prefix),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn prefix(&self) -> &[String] {
        &self.prefix
    }

    /// The backend key for a relative component sequence.
    pub fn content_key(&self, components: &[String]) -> String {
        self.prefix
            .iter()
            .chain(components)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `scheme://host:port`, with no trailing separator.
    pub fn uri_base(&self) -> String {
        format!("{}://{}", self.scheme, self.endpoint)
    }
}

pub(crate) fn split_segments(s: &str) -> Vec<String> {
    s.split('/')
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display_and_parse() {
        let e = Endpoint::new("localhost", 6379);
        assert_eq!(e.to_string(), "localhost:6379");
        assert_eq!("localhost:6379".parse::<Endpoint>().unwrap(), e);
    }

    #[test]
    fn endpoint_parse_rejects_garbage() {
        assert!("localhost".parse::<Endpoint>().is_err());
        assert!(":6379".parse::<Endpoint>().is_err());
        assert!("localhost:notaport".parse::<Endpoint>().is_err());
        assert!("localhost:70000".parse::<Endpoint>().is_err());
    }

    #[test]
    fn content_key_without_prefix() {
        let mount = Mount::new("redis", Endpoint::new("localhost", 6379), "");
        let key = mount.content_key(&["music".to_string(), "song1".to_string()]);
        assert_eq!(key, "music/song1");
        assert_eq!(mount.content_key(&[]), "");
    }

    #[test]
    fn content_key_with_prefix() {
        let mount = Mount::new("redis", Endpoint::new("localhost", 6379), "/archive//lts/");
        assert_eq!(mount.prefix(), ["archive", "lts"]);
        assert_eq!(
            mount.content_key(&["song1".to_string()]),
            "archive/lts/song1"
        );
        assert_eq!(mount.content_key(&[]), "archive/lts");
    }

    #[test]
    fn uri_base() {
        let mount = Mount::new("redis", Endpoint::new("10.0.0.5", 7000), "archive");
        assert_eq!(mount.uri_base(), "redis://10.0.0.5:7000");
    }
}
