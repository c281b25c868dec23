//! `.tar.gz` packaging of a bag directory and safe extraction.
//!
//! Archives are deterministic: gzip mtime 0, fixed header metadata, entries
//! sorted by path under a single top-level directory named after the bag.

use crate::error::{BagError, BagResult};
use crate::fs::Filesystem;
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::io::{Read, Write};
use std::path::{Component, Path};
use tar::{Builder, EntryType, Header};

/// File names treated as gzip'd tarballs by [`is_archive`].
pub const ARCHIVE_SUFFIXES: [&str; 2] = [".tar.gz", ".tgz"];

pub fn is_archive(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn archive_err(context: &str, e: impl std::fmt::Display) -> BagError {
    BagError::Archive {
        message: format!("{}: {}", context, e),
    }
}

/// Write `bag_dir` to `w` as `.tar.gz` with `root_name/` as the only
/// top-level entry.
pub fn write_tar_gz<W: Write>(
    w: W,
    fs: &dyn Filesystem,
    bag_dir: &Path,
    root_name: &str,
) -> BagResult<()> {
    let gz = GzBuilder::new().mtime(0).write(w, Compression::default());
    let mut tar = Builder::new(gz);
    tar.mode(tar::HeaderMode::Deterministic);

    write_dir_entry(&mut tar, root_name)?;
    write_dir_entry(&mut tar, &format!("{}/{}", root_name, crate::path::DATA_DIR))?;

    let mut files: Vec<(String, std::path::PathBuf)> = Vec::new();
    for absolute in fs.list_files(bag_dir)? {
        let relative = absolute
            .strip_prefix(bag_dir)
            .map_err(|e| archive_err("relativize", e))?;
        let posix = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((posix, absolute));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for (posix, absolute) in &files {
        let size = fs.file_size(absolute)?;
        let reader = fs.open(absolute)?;
        write_file_entry(&mut tar, &format!("{}/{}", root_name, posix), size, reader)?;
    }

    let gz = tar.into_inner().map_err(|e| archive_err("finalize tar", e))?;
    let mut w = gz.finish().map_err(|e| archive_err("finish gzip", e))?;
    w.flush().map_err(|e| archive_err("flush", e))
}

fn write_dir_entry<T: Write>(tar: &mut Builder<T>, path: &str) -> BagResult<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header
        .set_path(format!("{}/", path))
        .map_err(|e| archive_err("set_path", e))?;
    header.set_size(0);
    header.set_mode(0o755);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_cksum();
    tar.append(&header, std::io::empty())
        .map_err(|e| archive_err("append directory", e))
}

fn write_file_entry<T: Write>(
    tar: &mut Builder<T>,
    path: &str,
    size: u64,
    data: impl Read,
) -> BagResult<()> {
    let mut header = Header::new_gnu();
    header
        .set_path(path)
        .map_err(|e| archive_err("set_path", e))?;
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_cksum();
    tar.append(&header, data)
        .map_err(|e| archive_err(&format!("append {}", path), e))
}

/// Unpack a `.tar.gz` into `dest`.
///
/// Only regular files and directories are accepted, and every entry path
/// must stay below `dest`.
pub fn extract_tar_gz(fs: &dyn Filesystem, archive: &Path, dest: &Path) -> BagResult<()> {
    let reader = fs.open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(reader));
    let entries = tar
        .entries()
        .map_err(|e| archive_err("Gzip/Tar stream", e))?;

    for (i, entry) in entries.enumerate() {
        let mut entry = entry.map_err(|e| archive_err(&format!("entry #{}", i), e))?;
        let path = entry
            .path()
            .map_err(|e| archive_err(&format!("entry #{}", i), e))?
            .to_path_buf();

        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(archive_err(
                        "path traversal",
                        format!("invalid path component in '{}'", path.display()),
                    ))
                }
            }
        }
        match entry.header().entry_type() {
            EntryType::Regular | EntryType::Directory => {}
            other => {
                return Err(archive_err(
                    "unsupported entry",
                    format!("{:?} at '{}'", other, path.display()),
                ))
            }
        }
        entry
            .unpack_in(dest)
            .map_err(|e| archive_err(&format!("unpack {}", path.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StdFilesystem;
    use std::fs;
    use tempfile::tempdir;

    fn sample_bag(dir: &Path) {
        fs::create_dir_all(dir.join("data/sub")).unwrap();
        fs::write(dir.join("bagit.txt"), "BagIt-Version: 1.0\n").unwrap();
        fs::write(dir.join("data/sub/b.txt"), "bravo").unwrap();
        fs::write(dir.join("data/a.txt"), "alpha").unwrap();
    }

    #[test]
    fn archive_suffixes() {
        assert!(is_archive(Path::new("/tmp/bag.tar.gz")));
        assert!(is_archive(Path::new("bag.TGZ")));
        assert!(!is_archive(Path::new("bag.zip")));
        assert!(!is_archive(Path::new("/tmp/bag")));
    }

    #[test]
    fn output_is_deterministic() {
        let tmp = tempdir().unwrap();
        let bag = tmp.path().join("bag");
        sample_bag(&bag);

        let mut first = Vec::new();
        write_tar_gz(&mut first, &StdFilesystem, &bag, "bag").unwrap();
        let mut second = Vec::new();
        write_tar_gz(&mut second, &StdFilesystem, &bag, "bag").unwrap();
        assert_eq!(first, second);

        let mut archive = tar::Archive::new(GzDecoder::new(&first[..]));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "bag/",
                "bag/data/",
                "bag/bagit.txt",
                "bag/data/a.txt",
                "bag/data/sub/b.txt"
            ]
        );
    }

    #[test]
    fn extract_round_trip() {
        let tmp = tempdir().unwrap();
        let bag = tmp.path().join("bag");
        sample_bag(&bag);
        let tarball = tmp.path().join("bag.tar.gz");
        let out = StdFilesystem.create(&tarball).unwrap();
        write_tar_gz(out, &StdFilesystem, &bag, "bag").unwrap();

        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        extract_tar_gz(&StdFilesystem, &tarball, &dest).unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("bag/data/sub/b.txt")).unwrap(),
            "bravo"
        );
    }

    #[test]
    fn extract_rejects_parent_components() {
        let tmp = tempdir().unwrap();
        let tarball = tmp.path().join("evil.tar.gz");

        let gz = GzBuilder::new()
            .mtime(0)
            .write(fs::File::create(&tarball).unwrap(), Compression::default());
        let mut tar = Builder::new(gz);
        let mut header = Header::new_gnu();
        // set_path refuses "..", so write the raw name bytes.
        let name = b"bag/../../escape.txt";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append(&header, &b"x"[..]).unwrap();
        tar.into_inner().unwrap().finish().unwrap();

        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        let err = extract_tar_gz(&StdFilesystem, &tarball, &dest).unwrap_err();
        assert!(matches!(err, BagError::Archive { .. }));
        assert!(!tmp.path().join("escape.txt").exists());
    }
}
