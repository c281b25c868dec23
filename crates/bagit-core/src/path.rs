//! Path arithmetic relative to a bag root.
//!
//! Normalisation is purely lexical: `.` and `..` segments are resolved with a
//! stack and never by touching the filesystem, so paths that do not exist yet
//! can be checked. A `..` with nothing left to pop rejects the whole path;
//! nothing is ever clamped to the root.

use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the payload directory under the bag root.
pub const DATA_DIR: &str = "data";

/// A normalised, forward-slash path relative to the bag root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalise a relative path string. Returns `None` when the path is
    /// empty after normalisation or walks above the root.
    pub fn parse(path: &str) -> Option<Self> {
        normalize(path).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// True iff the first segment is `data` and something follows it.
    pub fn is_payload(&self) -> bool {
        let mut segments = self.segments();
        segments.next() == Some(DATA_DIR) && segments.next().is_some()
    }

    /// Last segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True when the path names a file directly in the bag root.
    pub fn is_top_level(&self) -> bool {
        !self.0.contains('/')
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve `.`/`..` segments left to right. Empty segments (`a//b`) are
/// skipped. Returns `None` for an empty result or a `..` that would climb
/// above the starting point.
pub fn normalize(path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        None
    } else {
        Some(stack.join("/"))
    }
}

fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Resolves paths against a fixed bag root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
    root_slash: String,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_slash = to_slash(&root).trim_end_matches('/').to_string();
        Self { root, root_slash }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Express `path` relative to the bag root.
    ///
    /// Absolute paths must start with the root; relative paths are taken as
    /// already relative to it. Returns `None` if the normalised result is empty
    /// or would leave the root.
    pub fn make_relative(&self, path: impl AsRef<Path>) -> Option<RelativePath> {
        let path = to_slash(path.as_ref());
        let prefix = format!("{}/", self.root_slash);
        let remainder = if let Some(rest) = path.strip_prefix(&prefix) {
            rest
        } else if path == self.root_slash || path.starts_with('/') {
            return None;
        } else {
            path.as_str()
        };
        RelativePath::parse(remainder)
    }

    pub fn make_absolute(&self, relative: &RelativePath) -> PathBuf {
        relative
            .segments()
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    /// True iff `path` resolves to something strictly under `data/`.
    pub fn path_in_bag_data(&self, path: impl AsRef<Path>) -> bool {
        self.make_relative(path)
            .map(|relative| relative.is_payload())
            .unwrap_or(false)
    }
}

/// Anchor a caller-supplied payload destination under `data/`.
///
/// `images/a.jpg` and `data/images/a.jpg` name the same file. The result is
/// normalised and must still be a payload path.
pub fn base_in_data(dest: &str) -> Option<RelativePath> {
    let trimmed = dest.trim_start_matches('/');
    let anchored = if trimmed.starts_with("data/") {
        trimmed.to_string()
    } else {
        format!("{}/{}", DATA_DIR, trimmed)
    };
    RelativePath::parse(&anchored).filter(RelativePath::is_payload)
}

/// Percent-encode the characters BagIt 1.0 forbids verbatim in manifest and
/// fetch paths.
pub fn encode_path(path: &str) -> String {
    path.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Inverse of [`encode_path`]. Hex digits are accepted in either case.
pub fn decode_path(path: &str) -> String {
    path.replace("%0D", "\r")
        .replace("%0d", "\r")
        .replace("%0A", "\n")
        .replace("%0a", "\n")
        .replace("%25", "%")
}
