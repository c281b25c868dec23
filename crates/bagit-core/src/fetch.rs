//! `fetch.txt`: payload files declared by URL instead of being present.

use crate::error::{BagError, BagResult};
use crate::fs::BagIo;
use crate::manifest::Manifest;
use crate::path::{decode_path, encode_path, RelativePath};
use crate::report::Report;
use crate::version::Version;
use std::collections::HashMap;
use std::fmt;
use url::Url;

pub const FETCH_FILE: &str = "fetch.txt";

/// Declared byte length of a fetched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchLength {
    Known(u64),
    /// Written as `-`.
    Unknown,
}

impl FetchLength {
    fn parse(token: &str, version: Version) -> Result<Self, String> {
        if token == "-" {
            return if version.allows_unknown_fetch_length() {
                Ok(FetchLength::Unknown)
            } else {
                Err(format!("length '-' is not allowed in BagIt {}", version))
            };
        }
        token
            .parse::<u64>()
            .map(FetchLength::Known)
            .map_err(|_| format!("length '{}' is not a non-negative integer", token))
    }
}

impl fmt::Display for FetchLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchLength::Known(n) => write!(f, "{}", n),
            FetchLength::Unknown => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEntry {
    pub url: String,
    pub length: FetchLength,
    pub destination: RelativePath,
}

impl FetchEntry {
    /// Validate the pieces of a declaration.
    pub fn new(url: &str, length: FetchLength, destination: &str) -> Result<Self, String> {
        let parsed = Url::parse(url).map_err(|e| format!("invalid url '{}': {}", url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "unsupported url scheme '{}' in '{}'",
                parsed.scheme(),
                url
            ));
        }
        let destination = RelativePath::parse(destination)
            .filter(RelativePath::is_payload)
            .ok_or_else(|| format!("destination '{}' is not inside data/", destination))?;
        Ok(Self {
            url: url.to_string(),
            length,
            destination,
        })
    }

    /// `<url> <length|-> <path>`. The path is everything after the second
    /// separator, so it may contain spaces.
    pub fn parse_line(line: &str, version: Version) -> Result<Self, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut rest = line.trim_start();
        let mut token = || {
            let (head, tail) = rest.split_once(char::is_whitespace)?;
            rest = tail.trim_start();
            Some(head)
        };
        let (url, length) = match (token(), token()) {
            (Some(url), Some(length)) if !rest.is_empty() => (url, length),
            _ => return Err(format!("expected '<url> <length> <path>', got '{}'", line)),
        };
        let length = FetchLength::parse(length, version)?;
        let destination = if version.percent_encodes_paths() {
            decode_path(rest)
        } else {
            rest.to_string()
        };
        Self::new(url, length, &destination)
    }

    pub fn to_line(&self, version: Version) -> String {
        let destination = if version.percent_encodes_paths() {
            encode_path(self.destination.as_str())
        } else {
            self.destination.as_str().to_string()
        };
        format!("{} {} {}", self.url, self.length, destination)
    }
}

/// Ordered set of fetch entries keyed by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRegistry {
    entries: Vec<FetchEntry>,
    index: HashMap<RelativePath, usize>,
}

impl FetchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FetchEntry] {
        &self.entries
    }

    pub fn get(&self, destination: &RelativePath) -> Option<&FetchEntry> {
        self.index.get(destination).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, destination: &RelativePath) -> bool {
        self.index.contains_key(destination)
    }

    /// Two entries may not target the same destination.
    pub fn add(&mut self, entry: FetchEntry) -> BagResult<()> {
        if self.contains(&entry.destination) {
            return Err(BagError::InvalidFetch {
                message: format!("{} is already declared", entry.destination),
            });
        }
        self.index
            .insert(entry.destination.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, destination: &RelativePath) -> Option<FetchEntry> {
        let i = self.index.remove(destination)?;
        let entry = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Bad lines are recorded as errors and skipped.
    pub fn parse(lines: &[String], version: Version, report: &mut Report) -> Self {
        let numbered = lines.iter().enumerate().map(|(idx, line)| (idx + 1, line.as_str()));
        Self::parse_numbered(numbered, version, report)
    }

    /// [`FetchRegistry::parse`] over lines that carry their own line numbers.
    pub fn parse_numbered<'l>(
        lines: impl IntoIterator<Item = (usize, &'l str)>,
        version: Version,
        report: &mut Report,
    ) -> Self {
        let mut registry = FetchRegistry::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                report.warning(FETCH_FILE, format!("line {}: blank line", line_no));
                continue;
            }
            let result = FetchEntry::parse_line(line, version)
                .and_then(|entry| registry.add(entry).map_err(|e| e.to_string()));
            if let Err(message) = result {
                report.error(FETCH_FILE, format!("line {}: {}", line_no, message));
            }
        }
        registry
    }

    pub fn serialize(&self, version: Version) -> Vec<String> {
        self.entries.iter().map(|e| e.to_line(version)).collect()
    }

    /// Check declarations against payload manifests and, for files already
    /// materialised, their declared length.
    pub fn cross_check<'m>(
        &self,
        manifests: impl IntoIterator<Item = &'m Manifest> + Clone,
        io: &BagIo<'_>,
        report: &mut Report,
    ) {
        for entry in &self.entries {
            let listed = manifests
                .clone()
                .into_iter()
                .any(|m| m.contains(&entry.destination));
            if !listed {
                report.warning(
                    FETCH_FILE,
                    format!("{} is not listed in any payload manifest", entry.destination),
                );
            }

            let FetchLength::Known(expected) = entry.length else {
                continue;
            };
            let absolute = io.resolver.make_absolute(&entry.destination);
            if !io.fs.exists(&absolute) {
                continue;
            }
            match io.fs.file_size(&absolute) {
                Ok(actual) if actual == expected => {}
                Ok(actual) => report.error(
                    FETCH_FILE,
                    format!(
                        "{} is {} bytes, fetch.txt declares {}",
                        entry.destination, actual, expected
                    ),
                ),
                Err(e) => report.error(FETCH_FILE, e.to_string()),
            }
        }
    }
}
