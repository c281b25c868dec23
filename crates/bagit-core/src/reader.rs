//! Reading a bag's tag files from disk.

use crate::bag_info::{BagInfo, BAG_INFO_FILE};
use crate::error::{BagError, BagResult};
use crate::fetch::{FetchRegistry, FETCH_FILE};
use crate::fs::{decode_lines, BagIo};
use crate::manifest::{classify, is_tag_manifest, looks_like_manifest, FileClass, Manifest, ManifestKind};
use crate::path::RelativePath;
use crate::report::Report;
use crate::size::PayloadOxum;
use crate::version::Version;

pub const BAGIT_FILE: &str = "bagit.txt";

/// The only tag-file encoding read or written.
pub const TAG_FILE_ENCODING: &str = "UTF-8";

const BOM: char = '\u{feff}';

/// Everything parsed from a bag directory.
#[derive(Debug, Clone)]
pub(crate) struct Contents {
    pub version: Version,
    pub payload_manifests: Vec<Manifest>,
    pub tag_manifests: Vec<Manifest>,
    pub bag_info: Option<BagInfo>,
    pub fetch: FetchRegistry,
}

/// `bagit.txt` lines for `version`.
pub(crate) fn declaration(version: Version) -> Vec<String> {
    vec![
        format!("BagIt-Version: {}", version),
        format!("Tag-File-Character-Encoding: {}", TAG_FILE_ENCODING),
    ]
}

/// Parse `bagit.txt`. A missing file, missing or unsupported version, or a
/// non-UTF-8 encoding is fatal.
pub(crate) fn read_declaration(io: &BagIo<'_>, report: &mut Report) -> BagResult<Version> {
    let path = io.resolver.root().join(BAGIT_FILE);
    if !io.fs.exists(&path) {
        return Err(BagError::structure(&path, "bagit.txt is missing"));
    }
    let raw = io.fs.read_to_string(&path)?;
    let (had_bom, text) = match raw.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, raw.as_str()),
    };

    let mut version = None;
    let mut encoding = None;
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            report.error(
                BAGIT_FILE,
                format!("line {}: expected 'Name: value'", idx + 1),
            );
            continue;
        };
        let value = value.trim().to_string();
        match name.trim() {
            "BagIt-Version" => version = Some(value),
            "Tag-File-Character-Encoding" => encoding = Some(value),
            other => report.warning(
                BAGIT_FILE,
                format!("line {}: unexpected tag '{}'", idx + 1, other),
            ),
        }
    }

    let version = version.ok_or_else(|| BagError::structure(&path, "BagIt-Version is missing"))?;
    let version = Version::parse_supported(&version)?;
    match encoding {
        Some(enc) if enc.eq_ignore_ascii_case(TAG_FILE_ENCODING) => {}
        Some(enc) => return Err(BagError::UnsupportedEncoding { value: enc }),
        None => report.error(BAGIT_FILE, "Tag-File-Character-Encoding is missing"),
    }
    if had_bom {
        let message = "file starts with a byte-order mark";
        if version.forbids_bom() {
            report.error(BAGIT_FILE, message);
        } else {
            report.warning(BAGIT_FILE, message);
        }
    }
    Ok(version)
}

/// Parse every tag file of the bag at `io.resolver.root()`.
///
/// Line-level problems are recorded in `report`; only structural failures
/// are returned as errors.
pub(crate) fn load_contents(io: &BagIo<'_>, report: &mut Report) -> BagResult<Contents> {
    let root = io.resolver.root();
    if !io.fs.is_dir(root) {
        return Err(BagError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "bag directory not found"),
        ));
    }
    let version = read_declaration(io, report)?;
    let data_dir = io.resolver.data_dir();
    if !io.fs.is_dir(&data_dir) {
        return Err(BagError::structure(&data_dir, "payload directory is missing"));
    }

    let mut payload_manifests = Vec::new();
    let mut tag_manifests = Vec::new();
    for entry in io.fs.list_entries(root)? {
        if io.fs.is_dir(&entry) {
            continue;
        }
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match classify(name) {
            FileClass::Payload(alg) => {
                let lines = read_tag_lines(io, &entry, name, report)?;
                payload_manifests.push(Manifest::parse_numbered(
                    ManifestKind::Payload,
                    alg,
                    borrowed(&lines),
                    version,
                    report,
                ));
            }
            FileClass::Tag(alg) => {
                let lines = read_tag_lines(io, &entry, name, report)?;
                tag_manifests.push(Manifest::parse_numbered(
                    ManifestKind::Tag,
                    alg,
                    borrowed(&lines),
                    version,
                    report,
                ));
            }
            FileClass::Neither if looks_like_manifest(name) => {
                report.warning(name, "unsupported algorithm, manifest ignored");
            }
            FileClass::Neither => {}
        }
    }
    if payload_manifests.is_empty() {
        report.error("manifest-*.txt", "bag has no payload manifest");
    }

    let info_path = root.join(BAG_INFO_FILE);
    let bag_info = if io.fs.exists(&info_path) {
        let lines = read_tag_lines(io, &info_path, BAG_INFO_FILE, report)?;
        Some(BagInfo::parse_numbered(borrowed(&lines), version, report))
    } else {
        None
    };

    let fetch_path = root.join(FETCH_FILE);
    let fetch = if io.fs.exists(&fetch_path) {
        let lines = read_tag_lines(io, &fetch_path, FETCH_FILE, report)?;
        FetchRegistry::parse_numbered(borrowed(&lines), version, report)
    } else {
        FetchRegistry::new()
    };

    if version.expects_manifests_in_tag_manifest() {
        for tag in &tag_manifests {
            for payload in &payload_manifests {
                let listed = RelativePath::parse(&payload.file_name())
                    .map(|p| tag.contains(&p))
                    .unwrap_or(false);
                if !listed {
                    report.warning(
                        tag.file_name(),
                        format!("{} is not listed", payload.file_name()),
                    );
                }
            }
        }
    }

    tracing::debug!(
        root = %root.display(),
        version = %version,
        payload_manifests = payload_manifests.len(),
        tag_manifests = tag_manifests.len(),
        "read bag"
    );
    Ok(Contents {
        version,
        payload_manifests,
        tag_manifests,
        bag_info,
        fetch,
    })
}

/// Numbered lines of a tag file. Lines that are not UTF-8 are reported
/// against `file` and left out; the remaining lines keep their numbers.
fn read_tag_lines(
    io: &BagIo<'_>,
    path: &std::path::Path,
    file: &str,
    report: &mut Report,
) -> BagResult<Vec<(usize, String)>> {
    let bytes = io.fs.read_bytes(path)?;
    let mut lines = Vec::new();
    for (line_no, decoded) in decode_lines(&bytes) {
        match decoded {
            Ok(line) => lines.push((line_no, line)),
            Err(_) => report.error(file, format!("line {}: not valid UTF-8", line_no)),
        }
    }
    Ok(lines)
}

fn borrowed(lines: &[(usize, String)]) -> impl Iterator<Item = (usize, &str)> {
    lines.iter().map(|(line_no, line)| (*line_no, line.as_str()))
}

/// Files under `data/`, sorted.
pub(crate) fn payload_files(io: &BagIo<'_>) -> BagResult<Vec<RelativePath>> {
    let data_dir = io.resolver.data_dir();
    if !io.fs.is_dir(&data_dir) {
        return Ok(Vec::new());
    }
    Ok(io
        .fs
        .list_files(&data_dir)?
        .into_iter()
        .filter_map(|p| io.resolver.make_relative(p))
        .filter(RelativePath::is_payload)
        .collect())
}

/// Every non-payload file, top-level tag manifests included, sorted.
pub(crate) fn tag_files(io: &BagIo<'_>) -> BagResult<Vec<RelativePath>> {
    Ok(io
        .fs
        .list_files(io.resolver.root())?
        .into_iter()
        .filter_map(|p| io.resolver.make_relative(p))
        .filter(|p| !p.is_payload() && p.as_str() != crate::path::DATA_DIR)
        .collect())
}

/// What a regenerated tag manifest covers: [`tag_files`] minus the
/// top-level `tagmanifest-*.txt` files.
pub(crate) fn tag_manifest_scope(io: &BagIo<'_>) -> BagResult<Vec<RelativePath>> {
    Ok(tag_files(io)?
        .into_iter()
        .filter(|p| !(p.is_top_level() && is_tag_manifest(p.as_str())))
        .collect())
}

/// Octet and file count of `files`.
pub(crate) fn payload_oxum(io: &BagIo<'_>, files: &[RelativePath]) -> BagResult<PayloadOxum> {
    let mut oxum = PayloadOxum::default();
    for path in files {
        oxum.octets += io.fs.file_size(&io.resolver.make_absolute(path))?;
        oxum.files += 1;
    }
    Ok(oxum)
}
