//! Path matchers and directory filters.

use regex::Regex;

use crate::{Error, Path};

/// Matches paths against a `glob:` or `regex:` pattern.
///
/// The pattern is tested against the whole relative key of a path
/// (`music/song1`), never a substring of it.
///
/// | Syntax | Translation |
/// |---|---|
/// | `glob:` | `*` matches any run of characters (including `/`), `?` one character, everything else is literal |
/// | `regex:` | used as written, anchored at both ends |
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
}

impl PathMatcher {
    pub fn parse(syntax_and_pattern: &str) -> Result<Self, Error> {
        let invalid = |message: String| Error::InvalidMatcher {
            pattern: syntax_and_pattern.to_string(),
            message,
        };
        let (syntax, pattern) = syntax_and_pattern
            .split_once(':')
            .ok_or_else(|| invalid("expected <syntax>:<pattern>".to_string()))?;

        let expr = match syntax {
            "glob" => glob_to_regex(pattern),
            "regex" => format!("^(?:{})$", pattern),
            other => return Err(invalid(format!("unknown syntax {:?}", other))),
        };
        let regex = Regex::new(&expr).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&path.key())
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

/// Decides which entries a directory listing keeps.
///
/// A filter that returns an error excludes the entry; the listing itself
/// carries on.
pub trait DirectoryFilter {
    fn accept(&self, path: &Path) -> Result<bool, Error>;
}

impl<F> DirectoryFilter for F
where
    F: Fn(&Path) -> Result<bool, Error>,
{
    fn accept(&self, path: &Path) -> Result<bool, Error> {
        self(path)
    }
}

impl DirectoryFilter for PathMatcher {
    fn accept(&self, path: &Path) -> Result<bool, Error> {
        Ok(self.matches(path))
    }
}
