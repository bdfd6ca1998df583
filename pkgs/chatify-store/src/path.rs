//! Hierarchical paths into the backend tree

use std::fmt;

use crate::error::BackendError;

/// Characters the backend refuses inside a single path segment
const FORBIDDEN_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// A slash-separated location in the backend tree, e.g. `messages/u1/u2`
///
/// Paths are built freely and only validated when handed to a backend, so a
/// bad key surfaces as [`BackendError::InvalidPath`] at the write site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-separated path, ignoring empty segments
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Append a single key. The key is kept verbatim, slashes included.
    pub fn child(&self, key: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.as_ref().to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<DbPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `self` equals `other` or is one of its ancestors
    pub fn contains(&self, other: &DbPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when a write at one path can change the snapshot at the other
    pub fn overlaps(&self, other: &DbPath) -> bool {
        self.contains(other) || other.contains(self)
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        for segment in &self.segments {
            if segment.is_empty() || segment.contains(FORBIDDEN_CHARS) {
                return Err(BackendError::InvalidPath(self.to_string()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

impl From<&str> for DbPath {
    fn from(path: &str) -> Self {
        DbPath::new(path)
    }
}
