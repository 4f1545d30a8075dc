//! Relative path templates (`../../books`, `items/0`, `/absolute/path`).

use std::fmt;

use crate::pointer::{escape_component, unescape_component};
use crate::PathError;

/// Prefix marking a segment that would otherwise read as navigation:
/// `..`, `.` or the empty key. Escaped components never start with it.
const LITERAL: &str = "~2";

fn write_segment(segment: &str) -> String {
    match segment {
        "" | "." | ".." => format!("{LITERAL}{segment}"),
        _ => escape_component(segment),
    }
}

/// A parsed path template.
///
/// Relative templates climb `up` levels from a base position and then descend
/// through `down`. Absolute templates ignore the base and descend from the
/// document root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelativePath {
    pub absolute: bool,
    pub up: usize,
    pub down: Vec<String>,
}

impl RelativePath {
    /// Parses a template. `.` and empty segments are skipped in relative
    /// templates; `..` after a named segment cancels it. Keys spelled like
    /// those are written with a `~2` prefix.
    pub fn parse(template: &str) -> Result<Self, PathError> {
        if let Some(body) = template.strip_prefix('/') {
            let mut down: Vec<String> = Vec::new();
            for raw in body.split('/').filter(|_| !body.is_empty()) {
                if let Some(literal) = raw.strip_prefix(LITERAL) {
                    down.push(literal.to_string());
                    continue;
                }
                if raw == ".." {
                    if down.pop().is_none() {
                        return Err(PathError::AboveRoot(template.to_string()));
                    }
                    continue;
                }
                down.push(unescape_component(raw));
            }
            return Ok(Self {
                absolute: true,
                up: 0,
                down,
            });
        }
        let mut out = Self::default();
        for raw in template.split('/') {
            match raw {
                "" | "." => {}
                ".." => {
                    if out.down.pop().is_none() {
                        out.up += 1;
                    }
                }
                seg => match seg.strip_prefix(LITERAL) {
                    Some(literal) => out.down.push(literal.to_string()),
                    None => out.down.push(unescape_component(seg)),
                },
            }
        }
        Ok(out)
    }

    /// Computes the template that leads from `from` to `to`.
    pub fn between<S: AsRef<str>>(from: &[S], to: &[S]) -> Self {
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a.as_ref() == b.as_ref())
            .count();
        Self {
            absolute: false,
            up: from.len() - common,
            down: to[common..].iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Resolves the template against `base`, yielding an absolute segment list.
    pub fn apply<S: AsRef<str>>(&self, base: &[S]) -> Result<Vec<String>, PathError> {
        if self.absolute {
            return Ok(self.down.clone());
        }
        if self.up > base.len() {
            return Err(PathError::AboveRoot(self.to_string()));
        }
        let mut out: Vec<String> = base[..base.len() - self.up]
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        out.extend(self.down.iter().cloned());
        Ok(out)
    }

    /// Joins another template onto this one.
    pub fn join(&self, other: &RelativePath) -> RelativePath {
        if other.absolute {
            return other.clone();
        }
        let mut out = self.clone();
        for _ in 0..other.up {
            if out.down.pop().is_none() {
                if out.absolute {
                    // climbing above an absolute root stays at the root
                    continue;
                }
                out.up += 1;
            }
        }
        out.down.extend(other.down.iter().cloned());
        out
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            for seg in &self.down {
                write!(f, "/{}", write_segment(seg))?;
            }
            if self.down.is_empty() {
                f.write_str("/")?;
            }
            return Ok(());
        }
        let parts: Vec<String> = std::iter::repeat("..".to_string())
            .take(self.up)
            .chain(self.down.iter().map(|s| write_segment(s)))
            .collect();
        f.write_str(&parts.join("/"))
    }
}
