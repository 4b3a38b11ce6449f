//! Hierarchical names over flat backend keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::endpoint::split_segments;
use crate::{Endpoint, Error, Mount, ATTRIBUTE_TAG};

/// Characters escaped when a segment is written into a URI.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// A path inside one kvfs filesystem.
///
/// A path stores its components relative to the filesystem's key prefix;
/// the prefix lives on the [`Mount`] shared by every path of that
/// filesystem. Paths are pure values: building or navigating one never
/// touches the backend.
///
/// Components are separated by `/`. Empty components are dropped, so
/// `"/music//song1/"` and `"/music/song1"` are the same path.
///
/// Equality, hashing and ordering look at the endpoint and the content key
/// only. Whether a path was written with a leading `/` does not matter.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use kvfs_core::{Endpoint, Mount, Path};
///
/// let mount = Arc::new(Mount::new("redis", Endpoint::new("localhost", 6379), ""));
/// let path = Path::new(mount, "/folder1/folder2/fileName:1234.pb");
///
/// assert_eq!(path.file_name(), Some("fileName:1234.pb"));
/// assert_eq!(path.content_key(), "folder1/folder2/fileName:1234.pb");
/// assert_eq!(
///     path.to_absolute_string(),
///     "redis://localhost:6379/folder1/folder2/fileName:1234.pb"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Path {
    mount: Arc<Mount>,
    components: Vec<String>,
    absolute: bool,
}

impl Path {
    /// Create a path from a `/`-separated key. A leading `/` marks the path
    /// absolute.
    pub fn new(mount: Arc<Mount>, key: &str) -> Self {
        Self {
            absolute: key.starts_with('/'),
            components: split_segments(key),
            mount,
        }
    }

    fn with_components(&self, components: Vec<String>, absolute: bool) -> Path {
        Path {
            mount: Arc::clone(&self.mount),
            components,
            absolute,
        }
    }

    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.mount.endpoint()
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Iterate over the name segments.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// The key relative to the filesystem prefix.
    pub fn key(&self) -> String {
        self.components.join("/")
    }

    /// The backend key holding this file's bytes.
    pub fn content_key(&self) -> String {
        self.mount.content_key(&self.components)
    }

    /// The backend key holding this file's attribute fields.
    pub fn attribute_key(&self) -> String {
        format!("{}{}", ATTRIBUTE_TAG, self.content_key())
    }

    fn key_segments(&self) -> impl Iterator<Item = &String> {
        self.mount.prefix().iter().chain(&self.components)
    }

    /// The root of an absolute path; `None` for relative paths.
    pub fn root(&self) -> Option<Path> {
        self.absolute.then(|| self.with_components(Vec::new(), true))
    }

    /// The last name segment.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The path without its last segment.
    ///
    /// A relative single-segment path has no parent. An absolute
    /// single-segment path has the root as its parent.
    pub fn parent(&self) -> Option<Path> {
        match self.components.split_last() {
            Some((_, rest)) if !rest.is_empty() || self.absolute => {
                Some(self.with_components(rest.to_vec(), self.absolute))
            }
            _ => None,
        }
    }

    pub fn name_count(&self) -> usize {
        self.components.len()
    }

    /// The segment at `index` as a relative single-segment path.
    pub fn name(&self, index: usize) -> Option<Path> {
        self.components
            .get(index)
            .map(|c| self.with_components(vec![c.clone()], false))
    }

    /// The relative path made of segments `begin..end`.
    pub fn subpath(&self, begin: usize, end: usize) -> Result<Path, Error> {
        if begin >= end || end > self.components.len() {
            return Err(Error::invalid_argument(format!(
                "subpath {}..{} out of range for {} segments",
                begin,
                end,
                self.components.len()
            )));
        }
        Ok(self.with_components(self.components[begin..end].to_vec(), false))
    }

    /// Segment-wise prefix test. An absolute prefix only matches absolute paths.
    pub fn starts_with(&self, other: &Path) -> bool {
        self.endpoint() == other.endpoint()
            && (self.absolute || !other.absolute)
            && self.components.starts_with(&other.components)
    }

    /// Segment-wise suffix test. An absolute suffix must match the whole path.
    pub fn ends_with(&self, other: &Path) -> bool {
        if self.endpoint() != other.endpoint() {
            return false;
        }
        if other.absolute {
            self.absolute && self.components == other.components
        } else {
            self.components.ends_with(&other.components)
        }
    }

    /// Remove `.` segments and fold `..` into the segment before it.
    ///
    /// `..` at the start of a relative path is kept; at the root of an
    /// absolute path it is dropped.
    #[must_use]
    pub fn normalize(&self) -> Path {
        let mut out: Vec<String> = Vec::with_capacity(self.components.len());
        for c in &self.components {
            match c.as_str() {
                "." => {}
                ".." => {
                    if out.last().is_some_and(|last| last != "..") {
                        out.pop();
                    } else if !self.absolute {
                        out.push(c.clone());
                    }
                }
                _ => out.push(c.clone()),
            }
        }
        self.with_components(out, self.absolute)
    }

    /// Append a `/`-separated key. An absolute `other` replaces this path.
    #[must_use]
    pub fn join(&self, other: &str) -> Path {
        if other.starts_with('/') {
            return Path::new(Arc::clone(&self.mount), other);
        }
        let mut components = self.components.clone();
        components.extend(split_segments(other));
        self.with_components(components, self.absolute)
    }

    /// Resolve `other` against this path. An absolute `other` is returned
    /// unchanged.
    #[must_use]
    pub fn resolve(&self, other: &Path) -> Path {
        if other.absolute {
            return other.clone();
        }
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        self.with_components(components, self.absolute)
    }

    /// Resolve `other` against this path's parent.
    #[must_use]
    pub fn resolve_sibling(&self, other: &str) -> Path {
        match self.parent() {
            Some(parent) => parent.join(other),
            None => Path::new(Arc::clone(&self.mount), other),
        }
    }

    /// The relative path that leads from this path to `other`.
    pub fn relativize(&self, other: &Path) -> Result<Path, Error> {
        if self.endpoint() != other.endpoint() {
            return Err(Error::CrossEndpoint {
                from: self.endpoint().clone(),
                to: other.endpoint().clone(),
            });
        }
        if self.absolute != other.absolute {
            return Err(Error::invalid_argument(
                "cannot relativize between absolute and relative paths",
            ));
        }
        let common = self
            .components
            .iter()
            .zip(&other.components)
            .take_while(|(a, b)| a == b)
            .count();
        let mut components = vec!["..".to_string(); self.components.len() - common];
        components.extend(other.components[common..].iter().cloned());
        Ok(self.with_components(components, false))
    }

    #[must_use]
    pub fn to_absolute_path(&self) -> Path {
        self.with_components(self.components.clone(), true)
    }

    /// The canonical URI form: `scheme://host:port/prefix/segments...`.
    ///
    /// The result is the same whether or not the path is absolute.
    pub fn to_absolute_string(&self) -> String {
        let mut s = self.mount.uri_base();
        let mut empty = true;
        for segment in self.key_segments() {
            s.push('/');
            s.extend(utf8_percent_encode(segment, SEGMENT));
            empty = false;
        }
        if empty {
            s.push('/');
        }
        s
    }

    pub fn to_uri(&self) -> Result<Url, Error> {
        let uri = self.to_absolute_string();
        Url::parse(&uri).map_err(|e| Error::InvalidUri {
            message: e.to_string(),
            uri,
        })
    }

    /// Keys have no link indirection to resolve.
    pub fn to_real_path(&self) -> Result<Path, Error> {
        Err(Error::unsupported("to_real_path"))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/")?;
        }
        write!(f, "{}", self.components.join("/"))
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint() == other.endpoint() && self.key_segments().eq(other.key_segments())
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint().hash(state);
        for segment in self.key_segments() {
            segment.hash(state);
        }
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.content_key()
            .cmp(&other.content_key())
            .then_with(|| self.endpoint().cmp(other.endpoint()))
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
