//! Payload and tag manifests.
//!
//! One [`Manifest`] per algorithm per scope. Entries keep insertion order so
//! reconciliation reports findings in a reproducible order.

use crate::algorithm::Algorithm;
use crate::error::BagResult;
use crate::fs::BagIo;
use crate::path::{decode_path, encode_path, RelativePath};
use crate::report::Report;
use crate::version::Version;
use std::collections::{HashMap, HashSet};

const PAYLOAD_PREFIX: &str = "manifest-";
const TAG_PREFIX: &str = "tagmanifest-";
const SUFFIX: &str = ".txt";

/// Which files a manifest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// `manifest-<alg>.txt`, entries under `data/`.
    Payload,
    /// `tagmanifest-<alg>.txt`, entries for every non-payload file.
    Tag,
}

impl ManifestKind {
    pub fn file_name(&self, algorithm: Algorithm) -> String {
        let prefix = match self {
            ManifestKind::Payload => PAYLOAD_PREFIX,
            ManifestKind::Tag => TAG_PREFIX,
        };
        format!("{}{}{}", prefix, algorithm.name(), SUFFIX)
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Payload(Algorithm),
    Tag(Algorithm),
    Neither,
}

/// Classify a file by name. Only the last path segment is considered and the
/// algorithm token must be a supported algorithm, spelled exactly.
pub fn classify(file_name: &str) -> FileClass {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let token = |prefix: &str| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .and_then(Algorithm::from_token)
    };
    if let Some(alg) = token(TAG_PREFIX) {
        FileClass::Tag(alg)
    } else if let Some(alg) = token(PAYLOAD_PREFIX) {
        FileClass::Payload(alg)
    } else {
        FileClass::Neither
    }
}

/// True for any `tagmanifest-*.txt` name, recognised algorithm or not.
pub fn is_tag_manifest(file_name: &str) -> bool {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    name.starts_with(TAG_PREFIX) && name.ends_with(SUFFIX)
}

/// True for any `manifest-*.txt` / `tagmanifest-*.txt` name, recognised or not.
pub fn looks_like_manifest(file_name: &str) -> bool {
    (file_name.starts_with(PAYLOAD_PREFIX) || file_name.starts_with(TAG_PREFIX))
        && file_name.ends_with(SUFFIX)
}

/// Outcome of [`Manifest::add_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryChange {
    Inserted,
    Unchanged,
    Replaced { previous: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    kind: ManifestKind,
    algorithm: Algorithm,
    entries: Vec<(RelativePath, String)>,
    index: HashMap<RelativePath, usize>,
}

impl Manifest {
    pub fn new(kind: ManifestKind, algorithm: Algorithm) -> Self {
        Self {
            kind,
            algorithm,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn file_name(&self) -> String {
        self.kind.file_name(self.algorithm)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&RelativePath, &str)> {
        self.entries.iter().map(|(p, c)| (p, c.as_str()))
    }

    pub fn get(&self, path: &RelativePath) -> Option<&str> {
        self.index.get(path).map(|&i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, path: &RelativePath) -> bool {
        self.index.contains_key(path)
    }

    /// Insert or overwrite. The checksum is stored lowercased; the last
    /// value written wins.
    pub fn add_entry(&mut self, path: RelativePath, checksum: &str) -> EntryChange {
        let checksum = checksum.to_ascii_lowercase();
        match self.index.get(&path) {
            Some(&i) if self.entries[i].1 == checksum => EntryChange::Unchanged,
            Some(&i) => {
                let previous = std::mem::replace(&mut self.entries[i].1, checksum);
                EntryChange::Replaced { previous }
            }
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, checksum));
                EntryChange::Inserted
            }
        }
    }

    pub fn remove_entry(&mut self, path: &RelativePath) -> Option<String> {
        let i = self.index.remove(path)?;
        let (_, checksum) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(checksum)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Split `<checksum><whitespace><path>`.
    ///
    /// The checksum must be hex; the path is percent-decoded for bags that
    /// encode paths and must normalise to somewhere inside the bag.
    pub fn parse_line(line: &str, version: Version) -> Result<(String, RelativePath), String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (checksum, raw_path) = line
            .split_once(char::is_whitespace)
            .map(|(c, p)| (c, p.trim_start()))
            .filter(|(c, p)| !c.is_empty() && !p.is_empty())
            .ok_or_else(|| format!("expected '<checksum> <path>', got '{}'", line))?;
        if !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("checksum '{}' is not hexadecimal", checksum));
        }
        let path = if version.percent_encodes_paths() {
            decode_path(raw_path)
        } else {
            raw_path.to_string()
        };
        let relative = RelativePath::parse(&path)
            .ok_or_else(|| format!("path '{}' resolves outside the bag", raw_path))?;
        Ok((checksum.to_ascii_lowercase(), relative))
    }

    /// Parse manifest lines. Bad lines are reported against this manifest's
    /// file name and skipped; the rest of the file is still read.
    pub fn parse(
        kind: ManifestKind,
        algorithm: Algorithm,
        lines: &[String],
        version: Version,
        report: &mut Report,
    ) -> Self {
        Self::parse_numbered(kind, algorithm, numbered(lines), version, report)
    }

    /// [`Manifest::parse`] over lines that carry their own line numbers.
    pub fn parse_numbered<'l>(
        kind: ManifestKind,
        algorithm: Algorithm,
        lines: impl IntoIterator<Item = (usize, &'l str)>,
        version: Version,
        report: &mut Report,
    ) -> Self {
        let mut manifest = Manifest::new(kind, algorithm);
        let file = manifest.file_name();
        let mut folded: HashMap<String, RelativePath> = HashMap::new();

        for (line_no, line) in lines {
            if line.trim().is_empty() {
                report.warning(&file, format!("line {}: blank line", line_no));
                continue;
            }
            let (checksum, path) = match Manifest::parse_line(line, version) {
                Ok(parsed) => parsed,
                Err(message) => {
                    report.error(&file, format!("line {}: {}", line_no, message));
                    continue;
                }
            };
            if checksum.len() != algorithm.hex_len() {
                report.error(
                    &file,
                    format!(
                        "line {}: {} checksum for {} has {} characters, expected {}",
                        line_no,
                        algorithm,
                        path,
                        checksum.len(),
                        algorithm.hex_len()
                    ),
                );
                continue;
            }
            match kind {
                ManifestKind::Payload if !path.is_payload() => {
                    report.error(
                        &file,
                        format!("line {}: {} is not in the data directory", line_no, path),
                    );
                    continue;
                }
                ManifestKind::Tag if path.is_payload() => {
                    report.error(
                        &file,
                        format!("line {}: {} is a payload file", line_no, path),
                    );
                    continue;
                }
                _ => {}
            }
            let key = path.as_str().to_lowercase();
            if let Some(other) = folded.get(&key) {
                if other != &path {
                    report.warning(
                        &file,
                        format!(
                            "line {}: {} and {} differ only by case",
                            line_no, other, path
                        ),
                    );
                }
            } else {
                folded.insert(key, path.clone());
            }
            if let EntryChange::Replaced { previous } = manifest.add_entry(path.clone(), &checksum)
            {
                report.warning(
                    &file,
                    format!(
                        "line {}: duplicate entry for {} ({} replaces {})",
                        line_no, path, checksum, previous
                    ),
                );
            }
        }
        manifest
    }

    /// `<checksum> <path>` lines in insertion order.
    pub fn serialize(&self, version: Version) -> Vec<String> {
        self.entries
            .iter()
            .map(|(path, checksum)| {
                let path = if version.percent_encodes_paths() {
                    encode_path(path.as_str())
                } else {
                    path.as_str().to_string()
                };
                format!("{} {}", checksum, path)
            })
            .collect()
    }

    /// Replace every entry with freshly computed digests of `files`.
    pub fn rebuild(&mut self, files: &[RelativePath], io: &BagIo<'_>) -> BagResult<()> {
        self.clear();
        for path in files {
            let checksum = digest_file(path, self.algorithm, io)?;
            self.add_entry(path.clone(), &checksum);
        }
        Ok(())
    }

    /// Compare this manifest against the files currently on disk in its scope.
    ///
    /// Entries are checked in insertion order, then files on disk that the
    /// manifest does not mention are reported in `on_disk` order. Entries in
    /// `pending` (fetch destinations) may be absent without an error. Tag
    /// manifests never have to list themselves or each other.
    pub fn reconcile(
        &self,
        on_disk: &[RelativePath],
        pending: &[RelativePath],
        io: &BagIo<'_>,
        report: &mut Report,
    ) {
        let file = self.file_name();
        let present: HashSet<&RelativePath> = on_disk.iter().collect();

        for (path, expected) in &self.entries {
            if !present.contains(path) {
                if pending.contains(path) {
                    tracing::debug!(manifest = %file, path = %path, "not fetched yet");
                    continue;
                }
                let what = match self.kind {
                    ManifestKind::Payload => "payload file missing",
                    ManifestKind::Tag => "tag file missing",
                };
                report.error(&file, format!("{}: {}", what, path));
                continue;
            }
            match digest_file(path, self.algorithm, io) {
                Ok(actual) if &actual == expected => {
                    tracing::debug!(manifest = %file, path = %path, "checksum ok");
                }
                Ok(actual) => report.error(
                    &file,
                    format!(
                        "checksum mismatch for {}: expected {}, computed {}",
                        path, expected, actual
                    ),
                ),
                Err(e) => report.error(&file, format!("unable to read {}: {}", path, e)),
            }
        }

        for path in on_disk {
            let exempt = self.kind == ManifestKind::Tag
                && path.is_top_level()
                && is_tag_manifest(path.as_str());
            if !exempt && !self.contains(path) {
                report.error(&file, format!("file not in manifest: {}", path));
            }
        }
    }
}

fn numbered(lines: &[String]) -> impl Iterator<Item = (usize, &str)> {
    lines.iter().enumerate().map(|(idx, line)| (idx + 1, line.as_str()))
}

pub(crate) fn digest_file(
    path: &RelativePath,
    algorithm: Algorithm,
    io: &BagIo<'_>,
) -> BagResult<String> {
    let absolute = io.resolver.make_absolute(path);
    let mut reader = io.fs.open(&absolute)?;
    io.hasher
        .digest(algorithm, &mut reader)
        .map_err(|e| crate::error::BagError::io(&absolute, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    /// `<fill x32> <path>` for md5 manifests.
    fn md5_line(fill: char, path: &str) -> String {
        format!("{} {}", fill.to_string().repeat(32), path)
    }

    #[test]
    fn classify_manifest_names() {
        assert_eq!(classify("manifest-sha1.txt"), FileClass::Payload(Algorithm::Sha1));
        assert_eq!(
            classify("/bags/x/tagmanifest-sha256.txt"),
            FileClass::Tag(Algorithm::Sha256)
        );
        assert_eq!(classify("/bags/x/fetch.txt"), FileClass::Neither);
        assert_eq!(classify("manifest-crc32.txt"), FileClass::Neither);
        assert_eq!(classify("manifest-SHA1.txt"), FileClass::Neither);
        assert_eq!(classify("manifest-sha1.txt.bak"), FileClass::Neither);
        assert!(looks_like_manifest("manifest-crc32.txt"));
        assert!(is_tag_manifest("tagmanifest-sha256.txt"));
        assert!(!is_tag_manifest("fetch.txt"));
    }

    #[test]
    fn parse_line_accepts_any_whitespace_run() {
        let (checksum, path) =
            Manifest::parse_line("ABCDEF0123 \t  data/my file.txt", Version::V1_0).unwrap();
        assert_eq!(checksum, "abcdef0123");
        assert_eq!(path.as_str(), "data/my file.txt");
    }

    #[test]
    fn parse_line_rejects_malformed_lines() {
        assert!(Manifest::parse_line("onlyonetoken", Version::V1_0).is_err());
        assert!(Manifest::parse_line("nothex data/a.txt", Version::V1_0).is_err());
        assert!(Manifest::parse_line("abcd data/../../etc/passwd", Version::V1_0).is_err());
    }

    #[test]
    fn percent_decoding_is_version_gated() {
        let (_, v1) = Manifest::parse_line("ab data/a%0Ab.txt", Version::V1_0).unwrap();
        assert_eq!(v1.as_str(), "data/a\nb.txt");
        let (_, v097) = Manifest::parse_line("ab data/a%0Ab.txt", Version::V0_97).unwrap();
        assert_eq!(v097.as_str(), "data/a%0Ab.txt");
    }

    #[test]
    fn bad_line_does_not_hide_the_rest() {
        let mut report = Report::new();
        let manifest = Manifest::parse(
            ManifestKind::Payload,
            Algorithm::Md5,
            &[
                md5_line('a', "data/one.txt"),
                "garbage".to_string(),
                md5_line('b', "bagit.txt"),
                md5_line('c', "data/two.txt"),
            ],
            Version::V1_0,
            &mut report,
        );
        assert_eq!(manifest.len(), 2);
        assert_eq!(report.errors().len(), 2);
        assert!(report.errors().iter().all(|f| f.file == "manifest-md5.txt"));
        assert!(report.errors()[0].message.starts_with("line 2"));
        assert!(report.errors()[1].message.contains("not in the data directory"));
    }

    #[test]
    fn duplicate_entries_warn_only_when_checksum_differs() {
        let mut report = Report::new();
        let manifest = Manifest::parse(
            ManifestKind::Payload,
            Algorithm::Md5,
            &[
                md5_line('a', "data/one.txt"),
                md5_line('a', "data/one.txt"),
                md5_line('b', "data/one.txt"),
            ],
            Version::V1_0,
            &mut report,
        );
        assert_eq!(manifest.len(), 1);
        assert_eq!(
            manifest.get(&rel("data/one.txt")),
            Some("b".repeat(32).as_str())
        );
        assert!(report.is_ok());
        assert_eq!(report.warnings().len(), 1);
        assert!(report.warnings()[0].message.contains("duplicate entry"));
    }

    #[test]
    fn case_only_differences_warn() {
        let mut report = Report::new();
        Manifest::parse(
            ManifestKind::Payload,
            Algorithm::Md5,
            &[md5_line('a', "data/File.txt"), md5_line('b', "data/file.txt")],
            Version::V1_0,
            &mut report,
        );
        assert!(report.is_ok());
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn tag_manifest_rejects_payload_paths() {
        let mut report = Report::new();
        let manifest = Manifest::parse(
            ManifestKind::Tag,
            Algorithm::Sha256,
            &[
                format!("{} bagit.txt", "a".repeat(64)),
                format!("{} data/one.txt", "b".repeat(64)),
            ],
            Version::V1_0,
            &mut report,
        );
        assert_eq!(manifest.len(), 1);
        assert_eq!(report.errors().len(), 1);
    }

    #[test]
    fn checksum_length_must_match_algorithm() {
        let mut report = Report::new();
        let manifest = Manifest::parse(
            ManifestKind::Payload,
            Algorithm::Sha512,
            &lines(&["ab data/x.txt"]),
            Version::V1_0,
            &mut report,
        );
        assert!(manifest.is_empty());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(
            report.errors()[0].message,
            "line 1: sha512 checksum for data/x.txt has 2 characters, expected 128"
        );
    }

    #[test]
    fn add_entry_reports_changes() {
        let mut manifest = Manifest::new(ManifestKind::Payload, Algorithm::Sha1);
        assert_eq!(manifest.add_entry(rel("data/a"), "AA"), EntryChange::Inserted);
        assert_eq!(manifest.add_entry(rel("data/a"), "aa"), EntryChange::Unchanged);
        assert_eq!(
            manifest.add_entry(rel("data/a"), "bb"),
            EntryChange::Replaced {
                previous: "aa".into()
            }
        );
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn remove_entry_keeps_order_and_index() {
        let mut manifest = Manifest::new(ManifestKind::Payload, Algorithm::Sha1);
        manifest.add_entry(rel("data/a"), "01");
        manifest.add_entry(rel("data/b"), "02");
        manifest.add_entry(rel("data/c"), "03");
        assert_eq!(manifest.remove_entry(&rel("data/a")), Some("01".into()));
        assert_eq!(manifest.get(&rel("data/c")), Some("03"));
        assert_eq!(
            manifest.serialize(Version::V1_0),
            vec!["02 data/b", "03 data/c"]
        );
    }

    #[test]
    fn serialize_encodes_paths_from_1_0() {
        let mut manifest = Manifest::new(ManifestKind::Payload, Algorithm::Sha1);
        manifest.add_entry(rel("data/100%.txt"), "ff");
        assert_eq!(manifest.serialize(Version::V1_0), vec!["ff data/100%25.txt"]);
        assert_eq!(manifest.serialize(Version::V0_97), vec!["ff data/100%.txt"]);
    }
}
