//! Glob patterns over project-relative paths.
//!
//! Supported syntax: `*` (within one path segment), `**` (any number of
//! segments), `?`, `[abc]` / `[!abc]` classes and `{a,b}` alternatives.
//! Paths are matched with `/` separators, relative to the project root.

use std::path::Path;

use regex::Regex;

/// Errors from compiling a glob pattern.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GlobError {
    #[error("Invalid glob pattern {pattern:?}: {reason}")]
    Invalid { pattern: String, reason: String },
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    /// Compile a glob pattern. A leading `./` is ignored.
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let pattern = pattern.trim_start_matches("./").to_string();
        let source = translate(&pattern)?;
        let regex = Regex::new(&source).map_err(|e| GlobError::Invalid {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { pattern, regex })
    }

    /// The pattern as written (without a leading `./`).
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the pattern contains any wildcard syntax.
    pub fn has_wildcards(&self) -> bool {
        self.pattern.contains(['*', '?', '[', '{'])
    }

    /// The directory part of the pattern before the first wildcard.
    ///
    /// Patterns without wildcards return the whole pattern.
    pub fn base(&self) -> &str {
        match self.pattern.find(['*', '?', '[', '{']) {
            Some(pos) => match self.pattern[..pos].rfind('/') {
                Some(slash) => &self.pattern[..slash],
                None => "",
            },
            None => &self.pattern,
        }
    }

    /// Match a `/`-separated relative path.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path.trim_start_matches("./"))
    }

    /// Match a relative filesystem path.
    pub fn is_match_path(&self, path: &Path) -> bool {
        self.is_match(&to_slash(path))
    }
}

/// Render a relative path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn translate(pattern: &str) -> Result<String, GlobError> {
    let invalid = |reason: &str| GlobError::Invalid {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let segment_start = i == 0 || chars[i - 1] == '/';
                if segment_start && chars.get(i + 2) == Some(&'/') {
                    // zero or more whole directories
                    re.push_str("(?:[^/]*/)*");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '{' => {
                brace_depth += 1;
                re.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                re.push(')');
            }
            ',' if brace_depth > 0 => re.push('|'),
            '[' => {
                let mut j = i + 1;
                let negated = matches!(chars.get(j), Some('!') | Some('^'));
                if negated {
                    j += 1;
                }
                // A `]` right after the opening bracket is literal
                let class_start = j;
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(invalid("unclosed character class"));
                }

                re.push('[');
                if negated {
                    re.push('^');
                }
                for &c in &chars[class_start..j] {
                    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '^') {
                        re.push('\\');
                    }
                    re.push(c);
                }
                re.push(']');
                i = j + 1;
                continue;
            }
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    if brace_depth > 0 {
        return Err(invalid("unclosed brace"));
    }

    re.push('$');
    Ok(re)
}
