//! Backend glob patterns, as used by key scans.

use regex::Regex;

use crate::KvError;

const GLOB_META: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Escape a literal so it only matches itself inside a backend glob pattern.
pub fn escape_pattern(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if GLOB_META.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translate a backend glob pattern into an anchored regular expression.
///
/// Supports `*`, `?`, character classes (`[abc]`, `[^a-z]`) and backslash
/// escapes. An unterminated `[` matches itself.
pub(crate) fn pattern_to_regex(pattern: &str) -> Result<Regex, KvError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            '[' => match chars[i + 1..].iter().position(|c| *c == ']') {
                Some(len) if len > 0 => {
                    let class = &chars[i + 1..i + 1 + len];
                    out.push('[');
                    for (n, c) in class.iter().enumerate() {
                        match c {
                            '^' if n == 0 => out.push('^'),
                            '-' if n > 0 && n + 1 < class.len() => out.push('-'),
                            c => out.push_str(&regex::escape(&c.to_string())),
                        }
                    }
                    out.push(']');
                    i += len + 1;
                }
                _ => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');

    Regex::new(&out).map_err(|e| KvError::command(format!("invalid pattern {:?}: {}", pattern, e)))
}
