//! Virtual paths (`./Category/Sub/`) addressing folders in the VFS tree.

use std::fmt;

/// Marker every rendered virtual path starts with.
pub const ROOT_MARKER: &str = "./";

/// A parsed virtual path: the folder names from the root down.
///
/// Parsing is lenient: `""`, `"/"` and `"./"` all mean the root, empty and `.`
/// segments are dropped, and a trailing `/` is optional. Rendering is always
/// the canonical `./A/B/` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VPath {
    segments: Vec<String>,
}

impl VPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Parent folder path, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Segment-wise prefix test. Every path starts with itself and with the root.
    pub fn starts_with(&self, prefix: &VPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for VPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_MARKER)?;
        for segment in &self.segments {
            write!(f, "{}/", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for VPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
