//! Filesystem collaborator.
//!
//! Everything the bag model reads from or writes to disk goes through the
//! [`Filesystem`] trait, so reconciliation can be exercised against any
//! backing store. [`StdFilesystem`] is the `std::fs` + `walkdir`
//! implementation used by default.

use crate::algorithm::Hasher;
use crate::error::{BagError, BagResult};
use crate::path::PathResolver;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;
use walkdir::WalkDir;

pub trait Filesystem {
    /// Every regular file below `dir`, recursively, sorted by path.
    fn list_files(&self, dir: &Path) -> BagResult<Vec<PathBuf>>;

    /// Immediate children of `dir` (files and directories), sorted.
    fn list_entries(&self, dir: &Path) -> BagResult<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> BagResult<String>;

    fn read_bytes(&self, path: &Path) -> BagResult<Vec<u8>>;

    /// Lines without terminators; `\r\n` and `\n` are both accepted.
    fn read_lines(&self, path: &Path) -> BagResult<Vec<String>> {
        Ok(self
            .read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Write newline-terminated lines, creating parent directories.
    fn write_lines(&self, path: &Path, lines: &[String]) -> BagResult<()> {
        let mut content = String::new();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        self.write_bytes(path, content.as_bytes())
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> BagResult<()>;

    fn open(&self, path: &Path) -> BagResult<Box<dyn Read>>;

    fn create(&self, path: &Path) -> BagResult<Box<dyn Write>>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn remove(&self, path: &Path) -> BagResult<()>;

    fn create_dir_all(&self, path: &Path) -> BagResult<()>;

    fn file_size(&self, path: &Path) -> BagResult<u64>;

    fn copy(&self, from: &Path, to: &Path) -> BagResult<u64>;

    fn rename(&self, from: &Path, to: &Path) -> BagResult<()>;
}

/// `std::fs`-backed filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFilesystem;

impl Filesystem for StdFilesystem {
    fn list_files(&self, dir: &Path) -> BagResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                BagError::io(path, source)
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn list_entries(&self, dir: &Path) -> BagResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| BagError::io(dir, e))?
            .map(|entry| entry.map(|e| e.path()).map_err(|e| BagError::io(dir, e)))
            .collect::<BagResult<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> BagResult<String> {
        fs::read_to_string(path).map_err(|e| BagError::io(path, e))
    }

    fn read_bytes(&self, path: &Path) -> BagResult<Vec<u8>> {
        fs::read(path).map_err(|e| BagError::io(path, e))
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> BagResult<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        fs::write(path, bytes).map_err(|e| BagError::io(path, e))
    }

    fn open(&self, path: &Path) -> BagResult<Box<dyn Read>> {
        let file = fs::File::open(path).map_err(|e| BagError::io(path, e))?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }

    fn create(&self, path: &Path) -> BagResult<Box<dyn Write>> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let file = fs::File::create(path).map_err(|e| BagError::io(path, e))?;
        Ok(Box::new(std::io::BufWriter::new(file)))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove(&self, path: &Path) -> BagResult<()> {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| BagError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> BagResult<()> {
        fs::create_dir_all(path).map_err(|e| BagError::io(path, e))
    }

    fn file_size(&self, path: &Path) -> BagResult<u64> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| BagError::io(path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> BagResult<u64> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent)?;
        }
        fs::copy(from, to).map_err(|e| BagError::io(from, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> BagResult<()> {
        fs::rename(from, to).map_err(|e| BagError::io(to, e))
    }
}

/// Split raw file content into 1-based numbered lines.
///
/// Terminators follow [`str::lines`]. A line that is not valid UTF-8 is
/// returned as `Err` so the caller can report it and keep going.
pub fn decode_lines(bytes: &[u8]) -> Vec<(usize, Result<String, FromUtf8Error>)> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|&b| b == b'\n')
        .enumerate()
        .map(|(idx, raw)| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            (idx + 1, String::from_utf8(raw.to_vec()))
        })
        .collect()
}

/// The single subdirectory of `dir`.
///
/// Used to find the bag inside an extracted archive: zero or several
/// candidate directories is an error.
pub fn get_directory(fs: &dyn Filesystem, dir: &Path) -> BagResult<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs
        .list_entries(dir)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .collect();
    if dirs.len() != 1 {
        return Err(BagError::AmbiguousRoot {
            path: dir.to_path_buf(),
            found: dirs.len(),
        });
    }
    Ok(dirs.remove(0))
}

/// Collaborators a bag operation runs against.
#[derive(Clone, Copy)]
pub struct BagIo<'a> {
    pub resolver: &'a PathResolver,
    pub fs: &'a dyn Filesystem,
    pub hasher: &'a dyn Hasher,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn get_directory_finds_single_subdirectory() {
        let tmp = tempdir().unwrap();
        let expected = tmp.path().join("expectedDir");
        fs::create_dir_all(&expected).unwrap();
        fs::write(tmp.path().join("stray.txt"), b"not a dir").unwrap();
        assert_eq!(get_directory(&StdFilesystem, tmp.path()).unwrap(), expected);
    }

    #[test]
    fn get_directory_fails_with_several_subdirectories() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("expectedDir")).unwrap();
        fs::create_dir_all(tmp.path().join("anotherExpectedDir")).unwrap();
        let err = get_directory(&StdFilesystem, tmp.path()).unwrap_err();
        assert!(matches!(err, BagError::AmbiguousRoot { found: 2, .. }));
    }

    #[test]
    fn get_directory_fails_when_empty() {
        let tmp = tempdir().unwrap();
        let err = get_directory(&StdFilesystem, tmp.path()).unwrap_err();
        assert!(matches!(err, BagError::AmbiguousRoot { found: 0, .. }));
    }

    #[test]
    fn list_files_is_recursive_and_sorted() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("b/c")).unwrap();
        fs::write(tmp.path().join("b/c/z.txt"), b"z").unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        let files = StdFilesystem.list_files(tmp.path()).unwrap();
        assert_eq!(
            files,
            vec![tmp.path().join("a.txt"), tmp.path().join("b/c/z.txt")]
        );
    }

    #[test]
    fn decode_lines_keeps_numbering_past_bad_bytes() {
        let lines = decode_lines(b"one\r\ncaf\xe9\nthree\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (1, Ok("one".to_string())));
        assert_eq!(lines[1].0, 2);
        assert!(lines[1].1.is_err());
        assert_eq!(lines[2], (3, Ok("three".to_string())));
        assert!(decode_lines(b"").is_empty());
        assert_eq!(decode_lines(b"\n"), vec![(1, Ok(String::new()))]);
    }

    #[test]
    fn write_then_read_lines() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/file.txt");
        let lines = vec!["one".to_string(), "two".to_string()];
        StdFilesystem.write_lines(&path, &lines).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert_eq!(StdFilesystem.read_lines(&path).unwrap(), lines);
    }
}
