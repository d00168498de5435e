//! Doublestar glob patterns compiled to anchored regular expressions.
//!
//! Supported syntax:
//!
//! | Token    | Matches                                        |
//! |----------|------------------------------------------------|
//! | `*`      | any run of characters within one path segment  |
//! | `**`     | any run of characters across segments          |
//! | `**/`    | zero or more leading segments                  |
//! | `?`      | one character other than `/`                   |
//! | `[a-z]`  | character class, `[!…]` or `[^…]` negated      |
//! | `{a,b}`  | alternatives, may nest                         |
//! | `\x`     | literal `x`                                    |
//!
//! The empty pattern matches every input.

use regex::Regex;

use crate::error::ParameterError;

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Option<Regex>,
}

impl GlobPattern {
    pub fn compile(pattern: &str) -> Result<Self, ParameterError> {
        if pattern.is_empty() {
            return Ok(Self {
                source: String::new(),
                regex: None,
            });
        }

        let translated = translate(pattern)?;
        let regex = Regex::new(&format!("^{translated}$")).map_err(|e| ParameterError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(input))
    }

    /// Match a repository name, written either in full (`library/base/ubuntu`)
    /// or relative to its project (`base/ubuntu`).
    pub fn matches_repository(&self, full_name: &str) -> bool {
        if self.is_match(full_name) {
            return true;
        }
        full_name
            .split_once('/')
            .is_some_and(|(_, relative)| self.is_match(relative))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn translate(pattern: &str) -> Result<String, ParameterError> {
    let err = |reason: &str| ParameterError::Pattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| p + i + 1)
                    .ok_or_else(|| err("unterminated character class"))?;
                let mut body = &chars[i + 1..close];
                out.push('[');
                if let Some('!' | '^') = body.first() {
                    out.push('^');
                    body = &body[1..];
                }
                if body.is_empty() {
                    return Err(err("empty character class"));
                }
                for &c in body {
                    if c == '-' {
                        out.push('-');
                    } else {
                        out.push_str(&regex::escape(&c.to_string()));
                    }
                }
                out.push(']');
                i = close;
            }
            '{' => {
                depth += 1;
                out.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                out.push(')');
            }
            ',' if depth > 0 => out.push('|'),
            '\\' => {
                i += 1;
                let c = chars.get(i).ok_or_else(|| err("trailing escape"))?;
                out.push_str(&regex::escape(&c.to_string()));
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if depth != 0 {
        return Err(err("unbalanced braces"));
    }
    Ok(out)
}
