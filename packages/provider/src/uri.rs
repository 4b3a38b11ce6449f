//! Parsing `scheme://host:port/prefix/segments` URIs.

use std::borrow::Cow;

use kvfs_core::{Endpoint, Error};
use percent_encoding::percent_decode_str;
use url::Url;

/// The parts of a kvfs URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub scheme: String,
    pub endpoint: Endpoint,
    /// Decoded, non-empty path segments.
    pub segments: Vec<String>,
}

/// Parse a kvfs URI, filling in `default_port` when the URI has none.
///
/// ```rust
/// use kvfs_provider::parse_uri;
///
/// let parsed = parse_uri("redis://localhost/music/my%20song", 6379).unwrap();
/// assert_eq!(parsed.endpoint.to_string(), "localhost:6379");
/// assert_eq!(parsed.segments, ["music", "my song"]);
/// ```
pub fn parse_uri(uri: &str, default_port: u16) -> Result<ParsedUri, Error> {
    let invalid = |message: &str| Error::InvalidUri {
        uri: uri.to_string(),
        message: message.to_string(),
    };
    let url = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host"))?;
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not supported"));
    }

    let mut segments = Vec::new();
    for raw in url.path_segments().into_iter().flatten() {
        if raw.is_empty() {
            continue;
        }
        let decoded: Cow<'_, str> = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| invalid("path is not valid UTF-8"))?;
        segments.push(decoded.into_owned());
    }

    Ok(ParsedUri {
        scheme: url.scheme().to_string(),
        endpoint: Endpoint::new(host, url.port().unwrap_or(default_port)),
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_uri() {
        let parsed = parse_uri("redis://localhost:6379/archive/music/song1", 6379).unwrap();
        assert_eq!(parsed.scheme, "redis");
        assert_eq!(parsed.endpoint, Endpoint::new("localhost", 6379));
        assert_eq!(parsed.segments, ["archive", "music", "song1"]);
    }

    #[test]
    fn default_port_and_empty_path() {
        let parsed = parse_uri("redis://10.0.0.5", 6379).unwrap();
        assert_eq!(parsed.endpoint, Endpoint::new("10.0.0.5", 6379));
        assert!(parsed.segments.is_empty());

        let parsed = parse_uri("redis://10.0.0.5:7000/", 6379).unwrap();
        assert_eq!(parsed.endpoint.port(), 7000);
        assert!(parsed.segments.is_empty());
    }

    #[test]
    fn scheme_is_lowercased() {
        assert_eq!(parse_uri("REDIS://h:1/a", 6379).unwrap().scheme, "redis");
    }

    #[test]
    fn segments_are_decoded_and_normalized() {
        let parsed = parse_uri("redis://h:1//music//fileName:1234.pb/", 6379).unwrap();
        assert_eq!(parsed.segments, ["music", "fileName:1234.pb"]);

        let parsed = parse_uri("redis://h:1/track%231", 6379).unwrap();
        assert_eq!(parsed.segments, ["track#1"]);
    }

    #[test]
    fn rejects_bad_uris() {
        assert!(matches!(
            parse_uri("not a uri", 6379),
            Err(Error::InvalidUri { .. })
        ));
        assert!(parse_uri("redis:///nohost", 6379).is_err());
        assert!(parse_uri("redis://h:1/a?b=c", 6379).is_err());
        assert!(parse_uri("redis://h:1/a#frag", 6379).is_err());
    }
}
