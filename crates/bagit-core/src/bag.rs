//! The bag model.
//!
//! A [`Bag`] owns the in-memory view of one bag directory. Mutations only
//! change that view and mark the bag dirty; [`Bag::update`] is the single
//! step that writes tag files and manifests back to disk.

use crate::algorithm::{Algorithm, Hasher, StdHasher};
use crate::archive;
use crate::bag_info::{is_generated_tag, BagInfo, BagInfoTag, BAG_INFO_FILE};
use crate::download::Downloader;
use crate::error::{BagError, BagResult};
use crate::fetch::{FetchEntry, FetchLength, FetchRegistry, FETCH_FILE};
use crate::fs::{get_directory, BagIo, Filesystem, StdFilesystem};
use crate::manifest::{classify, FileClass, Manifest, ManifestKind};
use crate::options::BagOptions;
use crate::path::{base_in_data, PathResolver, RelativePath};
use crate::reader::{self, BAGIT_FILE};
use crate::report::{Finding, Report};
use crate::size::{convert_to_human_readable, PayloadOxum};
use crate::validate::{self, ValidationState};
use crate::version::Version;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Bag {
    resolver: PathResolver,
    fs: Box<dyn Filesystem>,
    hasher: Box<dyn Hasher>,
    options: BagOptions,
    version: Version,
    payload_manifests: Vec<Manifest>,
    tag_manifests: Vec<Manifest>,
    bag_info: BagInfo,
    fetch: FetchRegistry,
    extended: bool,
    report: Report,
    state: ValidationState,
    dirty: bool,
    // Keeps an extracted archive alive for the lifetime of the bag.
    _extracted: Option<TempDir>,
}

impl std::fmt::Debug for Bag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bag")
            .field("root", &self.resolver.root())
            .field("version", &self.version)
            .field("algorithms", &self.algorithms())
            .field("extended", &self.extended)
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Bag {
    /// New bag with default options. See [`Bag::create_with`].
    pub fn create(path: impl AsRef<Path>) -> BagResult<Self> {
        Self::create_with(path, BagOptions::default())
    }

    /// New bag at `path`, which must not exist or be an empty directory.
    ///
    /// The bag is written immediately, so a freshly created bag validates.
    pub fn create_with(path: impl AsRef<Path>, options: BagOptions) -> BagResult<Self> {
        Self::create_using(path, options, Box::new(StdFilesystem), Box::new(StdHasher))
    }

    /// [`Bag::create_with`] over explicit collaborators.
    pub fn create_using(
        path: impl AsRef<Path>,
        options: BagOptions,
        fs: Box<dyn Filesystem>,
        hasher: Box<dyn Hasher>,
    ) -> BagResult<Self> {
        let root = path.as_ref();
        if fs.exists(root) && (!fs.is_dir(root) || !fs.list_entries(root)?.is_empty()) {
            return Err(BagError::AlreadyExists {
                path: root.to_path_buf(),
            });
        }
        if options.algorithms.is_empty() {
            return Err(BagError::NoAlgorithm);
        }
        if !options.version.is_supported() {
            return Err(BagError::UnsupportedVersion {
                value: options.version.to_string(),
            });
        }
        let resolver = PathResolver::new(root);
        fs.create_dir_all(&resolver.data_dir())?;

        let payload_manifests = options
            .algorithms
            .iter()
            .map(|&alg| Manifest::new(ManifestKind::Payload, alg))
            .collect();
        let mut bag = Self {
            resolver,
            fs,
            hasher,
            version: options.version,
            extended: options.extended,
            options,
            payload_manifests,
            tag_manifests: Vec::new(),
            bag_info: BagInfo::new(),
            fetch: FetchRegistry::new(),
            report: Report::new(),
            state: ValidationState::Fresh,
            dirty: true,
            _extracted: None,
        };
        bag.update()?;
        tracing::info!(root = %root.display(), version = %bag.version, "created bag");
        Ok(bag)
    }

    /// Load a bag directory or a `.tar.gz`/`.tgz` archive of one.
    ///
    /// Problems in individual lines are available through [`Bag::errors`]
    /// and [`Bag::warnings`] afterwards; only structural failures are
    /// returned as errors.
    pub fn load(path: impl AsRef<Path>) -> BagResult<Self> {
        Self::load_with(path, BagOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: BagOptions) -> BagResult<Self> {
        Self::load_using(path, options, Box::new(StdFilesystem), Box::new(StdHasher))
    }

    /// [`Bag::load_with`] over explicit collaborators.
    pub fn load_using(
        path: impl AsRef<Path>,
        options: BagOptions,
        fs: Box<dyn Filesystem>,
        hasher: Box<dyn Hasher>,
    ) -> BagResult<Self> {
        let path = path.as_ref();
        let (root, extracted) = if archive::is_archive(path) && !fs.is_dir(path) {
            let tmp = tempfile::Builder::new()
                .prefix("bagit-")
                .tempdir()
                .map_err(|e| BagError::io(std::env::temp_dir(), e))?;
            archive::extract_tar_gz(fs.as_ref(), path, tmp.path())?;
            let root = get_directory(fs.as_ref(), tmp.path())?;
            tracing::debug!(archive = %path.display(), root = %root.display(), "extracted bag");
            (root, Some(tmp))
        } else {
            (path.to_path_buf(), None)
        };

        let resolver = PathResolver::new(root);
        let mut report = Report::new();
        let contents = {
            let io = BagIo {
                resolver: &resolver,
                fs: fs.as_ref(),
                hasher: hasher.as_ref(),
            };
            reader::load_contents(&io, &mut report)?
        };

        let extended = contents.bag_info.is_some() || !contents.tag_manifests.is_empty();
        tracing::info!(
            root = %resolver.root().display(),
            version = %contents.version,
            errors = report.errors().len(),
            warnings = report.warnings().len(),
            "loaded bag"
        );
        Ok(Self {
            resolver,
            fs,
            hasher,
            options,
            version: contents.version,
            payload_manifests: contents.payload_manifests,
            tag_manifests: contents.tag_manifests,
            bag_info: contents.bag_info.unwrap_or_default(),
            fetch: contents.fetch,
            extended,
            report,
            state: ValidationState::Fresh,
            dirty: false,
            _extracted: extracted,
        })
    }

    fn io(&self) -> BagIo<'_> {
        BagIo {
            resolver: &self.resolver,
            fs: self.fs.as_ref(),
            hasher: self.hasher.as_ref(),
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.state = ValidationState::Fresh;
    }

    // ---- Accessors ----

    pub fn bag_root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn data_directory(&self) -> PathBuf {
        self.resolver.data_dir()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// `other` compared against this bag's version: -1, 0 or 1.
    pub fn compare_version(&self, other: &str) -> BagResult<i32> {
        Ok(Version::parse(other)?.compare(&self.version))
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// True when in-memory changes have not been written by [`Bag::update`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// True only after a [`Bag::validate`] pass found no errors.
    pub fn is_valid(&self) -> bool {
        self.state == ValidationState::Valid
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn errors(&self) -> &[Finding] {
        self.report.errors()
    }

    pub fn warnings(&self) -> &[Finding] {
        self.report.warnings()
    }

    pub fn options(&self) -> &BagOptions {
        &self.options
    }

    pub fn make_relative(&self, path: impl AsRef<Path>) -> Option<RelativePath> {
        self.resolver.make_relative(path)
    }

    /// Absolute path for a bag-relative path, if it stays inside the bag.
    pub fn make_absolute(&self, relative: &str) -> Option<PathBuf> {
        RelativePath::parse(relative).map(|r| self.resolver.make_absolute(&r))
    }

    pub fn path_in_bag_data(&self, path: impl AsRef<Path>) -> bool {
        self.resolver.path_in_bag_data(path)
    }

    /// Payload octets and file count currently on disk.
    pub fn payload_oxum(&self) -> BagResult<PayloadOxum> {
        let io = self.io();
        let files = reader::payload_files(&io)?;
        reader::payload_oxum(&io, &files)
    }

    pub fn payload_manifests(&self) -> &[Manifest] {
        &self.payload_manifests
    }

    pub fn tag_manifests(&self) -> &[Manifest] {
        &self.tag_manifests
    }

    // ---- Payload ----

    /// Copy `source` into the payload at `dest` (relative to `data/`, a
    /// leading `data/` is accepted).
    pub fn add_file(&mut self, source: impl AsRef<Path>, dest: &str) -> BagResult<RelativePath> {
        let source = source.as_ref();
        let relative = base_in_data(dest)
            .ok_or_else(|| BagError::invalid_path(dest, "destination is not inside data/"))?;
        if !self.fs.exists(source) || self.fs.is_dir(source) {
            return Err(BagError::invalid_path(
                source.display().to_string(),
                "source is not a file",
            ));
        }
        let target = self.resolver.make_absolute(&relative);
        if self.fs.exists(&target) {
            return Err(BagError::AlreadyExists { path: target });
        }
        self.fs.copy(source, &target)?;
        tracing::debug!(dest = %relative, "added payload file");
        self.touch();
        Ok(relative)
    }

    /// Delete a payload file and any directories it leaves empty.
    pub fn remove_file(&mut self, dest: &str) -> BagResult<()> {
        let relative = base_in_data(dest)
            .ok_or_else(|| BagError::invalid_path(dest, "destination is not inside data/"))?;
        let target = self.resolver.make_absolute(&relative);
        if !self.fs.exists(&target) || self.fs.is_dir(&target) {
            return Err(BagError::invalid_path(dest, "no such payload file"));
        }
        self.fs.remove(&target)?;

        let data_dir = self.resolver.data_dir();
        let mut dir = target.parent().map(Path::to_path_buf);
        while let Some(current) = dir {
            if current == data_dir || !current.starts_with(&data_dir) {
                break;
            }
            if !self.fs.list_entries(&current)?.is_empty() {
                break;
            }
            self.fs.remove(&current)?;
            dir = current.parent().map(Path::to_path_buf);
        }
        tracing::debug!(dest = %relative, "removed payload file");
        self.touch();
        Ok(())
    }

    // ---- Algorithms ----

    /// Active payload algorithms in registration order.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.payload_manifests.iter().map(Manifest::algorithm).collect()
    }

    pub fn has_algorithm(&self, name: &str) -> BagResult<bool> {
        let alg = Algorithm::parse(name)?;
        Ok(self.payload_manifests.iter().any(|m| m.algorithm() == alg))
    }

    /// Register an algorithm. Unknown names fail here, not at update time.
    pub fn add_algorithm(&mut self, name: &str) -> BagResult<()> {
        let alg = Algorithm::parse(name)?;
        if self.payload_manifests.iter().any(|m| m.algorithm() == alg) {
            return Ok(());
        }
        self.payload_manifests
            .push(Manifest::new(ManifestKind::Payload, alg));
        self.touch();
        Ok(())
    }

    /// Unregister an algorithm; the last one cannot be removed.
    pub fn remove_algorithm(&mut self, name: &str) -> BagResult<()> {
        let alg = Algorithm::parse(name)?;
        let Some(pos) = self
            .payload_manifests
            .iter()
            .position(|m| m.algorithm() == alg)
        else {
            return Ok(());
        };
        if self.payload_manifests.len() == 1 {
            return Err(BagError::LastAlgorithm {
                name: alg.to_string(),
            });
        }
        self.payload_manifests.remove(pos);
        self.tag_manifests.retain(|m| m.algorithm() != alg);
        self.touch();
        Ok(())
    }

    /// Replace every algorithm with `name`.
    pub fn set_algorithm(&mut self, name: &str) -> BagResult<()> {
        let alg = Algorithm::parse(name)?;
        self.clear_payload_manifests();
        self.payload_manifests
            .push(Manifest::new(ManifestKind::Payload, alg));
        Ok(())
    }

    /// Forget every payload and tag manifest. The files go on the next
    /// [`Bag::update`], which needs an algorithm added first.
    pub fn clear_payload_manifests(&mut self) {
        self.payload_manifests.clear();
        self.tag_manifests.clear();
        self.touch();
    }

    // ---- Bag-info ----

    pub fn bag_info(&self) -> &BagInfo {
        &self.bag_info
    }

    pub fn bag_info_tags(&self) -> &[BagInfoTag] {
        self.bag_info.tags()
    }

    pub fn has_bag_info_tag(&self, name: &str) -> bool {
        self.bag_info.has_tag(name)
    }

    pub fn get_bag_info_by_tag(&self, name: &str) -> &[String] {
        self.bag_info.get_values(name)
    }

    /// Append a value. Makes the bag extended.
    pub fn add_bag_info_tag(&mut self, name: &str, value: &str) -> BagResult<()> {
        if is_generated_tag(name.trim()) {
            return Err(BagError::GeneratedTag {
                name: name.to_string(),
            });
        }
        self.bag_info.add_tag(name, value)?;
        self.extended = true;
        self.touch();
        Ok(())
    }

    pub fn remove_bag_info_tag(&mut self, name: &str) -> bool {
        let removed = self.bag_info.remove_tag(name);
        if removed {
            self.touch();
        }
        removed
    }

    /// Remove the `index`th value of `name`; the tag goes with its last value.
    pub fn remove_bag_info_tag_value(&mut self, name: &str, index: usize) -> bool {
        let removed = self.bag_info.remove_value(name, index);
        if removed {
            self.touch();
        }
        removed
    }

    /// Extended bags carry `bag-info.txt` and tag manifests.
    pub fn set_extended(&mut self, extended: bool) {
        if self.extended != extended {
            self.extended = extended;
            self.touch();
        }
    }

    // ---- Fetch ----

    pub fn fetch_entries(&self) -> &[FetchEntry] {
        self.fetch.entries()
    }

    /// Declare a remote payload file. `length` of `None` is written as `-`.
    pub fn add_fetch_entry(
        &mut self,
        url: &str,
        length: Option<u64>,
        dest: &str,
    ) -> BagResult<()> {
        let relative = base_in_data(dest).ok_or_else(|| BagError::InvalidFetch {
            message: format!("destination '{}' is not inside data/", dest),
        })?;
        let length = match length {
            Some(n) => FetchLength::Known(n),
            None if self.version.allows_unknown_fetch_length() => FetchLength::Unknown,
            None => {
                return Err(BagError::InvalidFetch {
                    message: format!("BagIt {} requires a numeric length", self.version),
                })
            }
        };
        let entry = FetchEntry::new(url, length, relative.as_str())
            .map_err(|message| BagError::InvalidFetch { message })?;
        self.fetch.add(entry)?;
        self.touch();
        Ok(())
    }

    pub fn remove_fetch_entry(&mut self, dest: &str) -> bool {
        let removed = base_in_data(dest)
            .and_then(|relative| self.fetch.remove(&relative))
            .is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Download every declared file not yet on disk. Returns how many
    /// files were written.
    ///
    /// Each body goes to a `.part` file next to its destination and is
    /// renamed into place only once it is complete and has the declared
    /// length; on failure the partial file is removed.
    pub fn fetch(&mut self, downloader: &dyn Downloader) -> BagResult<usize> {
        let mut fetched = 0;
        let mut outcome = Ok(());
        for entry in self.fetch.entries() {
            let target = self.resolver.make_absolute(&entry.destination);
            if self.fs.exists(&target) {
                continue;
            }
            let partial = partial_path(&target);
            let result = self
                .download_to(downloader, entry, &partial)
                .and_then(|written| self.fs.rename(&partial, &target).map(|_| written));
            match result {
                Ok(written) => {
                    tracing::info!(url = %entry.url, dest = %entry.destination, bytes = written, "fetched");
                    fetched += 1;
                }
                Err(e) => {
                    if self.fs.exists(&partial) {
                        if let Err(cleanup) = self.fs.remove(&partial) {
                            tracing::warn!(error = %cleanup, "could not remove partial download");
                        }
                    }
                    outcome = Err(e);
                    break;
                }
            }
        }
        if fetched > 0 {
            self.touch();
        }
        outcome.map(|_| fetched)
    }

    fn download_to(
        &self,
        downloader: &dyn Downloader,
        entry: &FetchEntry,
        partial: &Path,
    ) -> BagResult<u64> {
        let mismatch = |actual: u64, expected: u64| BagError::Download {
            url: entry.url.clone(),
            message: format!("received {} bytes, fetch.txt declares {}", actual, expected),
        };
        let mut download = downloader.get(&entry.url)?;
        if let (FetchLength::Known(expected), Some(reported)) = (entry.length, download.length) {
            if reported != expected {
                return Err(mismatch(reported, expected));
            }
        }
        let mut out = self.fs.create(partial)?;
        let written = std::io::copy(&mut download.reader, &mut out)
            .and_then(|n| out.flush().map(|_| n))
            .map_err(|e| BagError::Download {
                url: entry.url.clone(),
                message: e.to_string(),
            })?;
        drop(out);
        match entry.length {
            FetchLength::Known(expected) if written != expected => Err(mismatch(written, expected)),
            _ => Ok(written),
        }
    }

    // ---- Sync ----

    /// Write the in-memory model to disk.
    ///
    /// Payload manifests are recomputed from the files under `data/`;
    /// fetch destinations not yet on disk keep their recorded checksums.
    /// Tag manifests are written last so they cover the final tag files.
    pub fn update(&mut self) -> BagResult<()> {
        if self.payload_manifests.is_empty() {
            return Err(BagError::NoAlgorithm);
        }
        let io = BagIo {
            resolver: &self.resolver,
            fs: self.fs.as_ref(),
            hasher: self.hasher.as_ref(),
        };
        let root = io.resolver.root();
        let version = self.version;

        let files = reader::payload_files(&io)?;
        for manifest in &mut self.payload_manifests {
            let retained: Vec<(RelativePath, String)> = self
                .fetch
                .entries()
                .iter()
                .filter(|e| !files.contains(&e.destination))
                .filter_map(|e| {
                    manifest
                        .get(&e.destination)
                        .map(|c| (e.destination.clone(), c.to_string()))
                })
                .collect();
            manifest.rebuild(&files, &io)?;
            for (path, checksum) in retained {
                manifest.add_entry(path, &checksum);
            }
        }

        io.fs
            .write_lines(&root.join(BAGIT_FILE), &reader::declaration(version))?;

        let info_path = root.join(BAG_INFO_FILE);
        if self.extended {
            let oxum = reader::payload_oxum(&io, &files)?;
            self.bag_info.set_tag("Payload-Oxum", &oxum.to_string())?;
            self.bag_info.set_tag(
                "Bagging-Date",
                &chrono::Local::now().format("%Y-%m-%d").to_string(),
            )?;
            self.bag_info
                .set_tag("Bag-Size", &convert_to_human_readable(oxum.octets))?;
            io.fs.write_lines(&info_path, &self.bag_info.serialize())?;
        } else if io.fs.exists(&info_path) {
            io.fs.remove(&info_path)?;
        }

        let fetch_path = root.join(FETCH_FILE);
        if !self.fetch.is_empty() {
            io.fs.write_lines(&fetch_path, &self.fetch.serialize(version))?;
        } else if io.fs.exists(&fetch_path) {
            io.fs.remove(&fetch_path)?;
        }

        for manifest in &self.payload_manifests {
            io.fs
                .write_lines(&root.join(manifest.file_name()), &manifest.serialize(version))?;
        }

        let active: Vec<Algorithm> = self.payload_manifests.iter().map(Manifest::algorithm).collect();
        for entry in io.fs.list_entries(root)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let stale = match classify(name) {
                FileClass::Payload(alg) => !active.contains(&alg),
                FileClass::Tag(alg) => !self.extended || !active.contains(&alg),
                FileClass::Neither => false,
            };
            if stale && !io.fs.is_dir(&entry) {
                tracing::debug!(file = name, "removing stale manifest");
                io.fs.remove(&entry)?;
            }
        }

        self.tag_manifests.clear();
        if self.extended {
            let tags = reader::tag_manifest_scope(&io)?;
            for &alg in &active {
                let mut manifest = Manifest::new(ManifestKind::Tag, alg);
                manifest.rebuild(&tags, &io)?;
                io.fs
                    .write_lines(&root.join(manifest.file_name()), &manifest.serialize(version))?;
                self.tag_manifests.push(manifest);
            }
        }

        self.dirty = false;
        self.state = ValidationState::Fresh;
        tracing::info!(
            root = %root.display(),
            algorithms = ?active,
            payload_files = files.len(),
            "updated bag"
        );
        Ok(())
    }

    /// Validate the files on disk.
    ///
    /// The report is reset first, so passes never accumulate. Returns
    /// whether the bag is valid; the findings are in [`Bag::report`].
    pub fn validate(&mut self) -> BagResult<bool> {
        self.report.reset();
        self.state = ValidationState::Running;
        let options = self.options.clone();
        let io = BagIo {
            resolver: &self.resolver,
            fs: self.fs.as_ref(),
            hasher: self.hasher.as_ref(),
        };
        let registration = self.algorithms();
        if let Err(e) = validate::run(&io, &options, &registration, &mut self.report) {
            self.state = ValidationState::Invalid;
            return Err(e);
        }
        if self.dirty {
            self.report.warning(
                BAGIT_FILE,
                "bag has changes not yet written by update(); validated the files on disk",
            );
        }
        self.state = if self.report.is_ok() {
            ValidationState::Valid
        } else {
            ValidationState::Invalid
        };
        tracing::info!(
            root = %self.resolver.root().display(),
            valid = self.report.is_ok(),
            errors = self.report.errors().len(),
            warnings = self.report.warnings().len(),
            "validated bag"
        );
        Ok(self.state == ValidationState::Valid)
    }

    /// Write the bag to `dest` as a deterministic `.tar.gz`, syncing first
    /// if there are unsaved changes.
    pub fn package(&mut self, dest: impl AsRef<Path>) -> BagResult<()> {
        let dest = dest.as_ref();
        if dest.starts_with(self.resolver.root()) {
            return Err(BagError::invalid_path(
                dest.display().to_string(),
                "archive cannot be written inside the bag",
            ));
        }
        if !archive::is_archive(dest) {
            return Err(BagError::invalid_path(
                dest.display().to_string(),
                "archive name must end in .tar.gz or .tgz",
            ));
        }
        if self.dirty {
            self.update()?;
        }
        let root = self.resolver.root();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bag".to_string());
        let out = self.fs.create(dest)?;
        archive::write_tar_gz(out, self.fs.as_ref(), root, &name)?;
        tracing::info!(archive = %dest.display(), "packaged bag");
        Ok(())
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::tests::{DroppingDownloader, MockDownloader};
    use std::fs;
    use tempfile::tempdir;

    fn new_bag(dir: &Path) -> Bag {
        Bag::create(dir.join("bag")).unwrap()
    }

    fn source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn create_writes_a_valid_bag() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let root = bag.bag_root().to_path_buf();
        assert!(root.join("data").is_dir());
        assert_eq!(
            fs::read_to_string(root.join("bagit.txt")).unwrap(),
            "BagIt-Version: 1.0\nTag-File-Character-Encoding: UTF-8\n"
        );
        assert!(root.join("manifest-sha512.txt").exists());
        assert!(root.join("tagmanifest-sha512.txt").exists());
        assert!(bag.validate().unwrap(), "{:?}", bag.errors());
        assert!(bag.is_valid());
    }

    #[test]
    fn create_refuses_non_empty_directory() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("stray.txt"), "x").unwrap();
        assert!(matches!(
            Bag::create(tmp.path()),
            Err(BagError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn default_algorithm_plus_sha1() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_algorithm("sha1").unwrap();
        bag.update().unwrap();
        let root = bag.bag_root();
        assert!(root.join("manifest-sha1.txt").exists());
        assert!(root.join("manifest-sha512.txt").exists());
        assert_eq!(bag.algorithms(), vec![Algorithm::Sha512, Algorithm::Sha1]);
    }

    #[test]
    fn unknown_algorithm_fails_at_registration() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        assert!(matches!(
            bag.add_algorithm("crc32"),
            Err(BagError::UnsupportedAlgorithm { .. })
        ));
        assert!(!bag.is_dirty());
    }

    #[test]
    fn last_algorithm_cannot_be_removed() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        assert!(matches!(
            bag.remove_algorithm("sha512"),
            Err(BagError::LastAlgorithm { .. })
        ));
        bag.add_algorithm("md5").unwrap();
        bag.remove_algorithm("sha512").unwrap();
        bag.update().unwrap();
        assert!(!bag.bag_root().join("manifest-sha512.txt").exists());
        assert!(!bag.bag_root().join("tagmanifest-sha512.txt").exists());
        assert!(bag.bag_root().join("tagmanifest-md5.txt").exists());
    }

    #[test]
    fn compare_version_against_bag() {
        let tmp = tempdir().unwrap();
        let bag = new_bag(tmp.path());
        assert_eq!(bag.compare_version("0.97").unwrap(), -1);
        assert_eq!(bag.compare_version("1.0").unwrap(), 0);
        assert_eq!(bag.compare_version("1.1").unwrap(), 1);
        assert!(bag.compare_version("one").is_err());
    }

    #[test]
    fn mutations_are_not_written_until_update() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let src = source(tmp.path(), "a.txt", "alpha");
        bag.add_file(&src, "a.txt").unwrap();
        assert!(bag.is_dirty());
        let manifest = fs::read_to_string(bag.bag_root().join("manifest-sha512.txt")).unwrap();
        assert!(manifest.is_empty());

        bag.update().unwrap();
        assert!(!bag.is_dirty());
        let manifest = fs::read_to_string(bag.bag_root().join("manifest-sha512.txt")).unwrap();
        assert!(manifest.ends_with(" data/a.txt\n"));
    }

    #[test]
    fn add_file_rejects_escaping_destination() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let src = source(tmp.path(), "a.txt", "alpha");
        assert!(matches!(
            bag.add_file(&src, "../bagit.txt"),
            Err(BagError::InvalidPath { .. })
        ));
    }

    #[test]
    fn remove_file_prunes_empty_directories() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let src = source(tmp.path(), "a.txt", "alpha");
        bag.add_file(&src, "deep/er/a.txt").unwrap();
        bag.remove_file("data/deep/er/a.txt").unwrap();
        assert!(!bag.data_directory().join("deep").exists());
        assert!(bag.data_directory().exists());
    }

    #[test]
    fn generated_tags_are_rejected() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        assert!(matches!(
            bag.add_bag_info_tag("payload-oxum", "1.1"),
            Err(BagError::GeneratedTag { .. })
        ));
        bag.add_bag_info_tag("Contact-Name", "Jane").unwrap();
        assert_eq!(bag.get_bag_info_by_tag("CONTACT-NAME"), ["Jane".to_string()]);
    }

    #[test]
    fn update_writes_generated_tags() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let src = source(tmp.path(), "a.txt", "alpha");
        bag.add_file(&src, "a.txt").unwrap();
        bag.update().unwrap();
        assert_eq!(bag.get_bag_info_by_tag("Payload-Oxum"), ["5.1".to_string()]);
        assert_eq!(bag.get_bag_info_by_tag("Bag-Size"), ["5.00 B".to_string()]);
        assert_eq!(bag.get_bag_info_by_tag("Bagging-Date").len(), 1);
    }

    #[test]
    fn non_extended_bag_has_no_tag_files() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.set_extended(false);
        bag.update().unwrap();
        let root = bag.bag_root();
        assert!(!root.join("bag-info.txt").exists());
        assert!(!root.join("tagmanifest-sha512.txt").exists());
        assert!(bag.validate().unwrap());
    }

    #[test]
    fn fetch_entries_round_trip_through_update() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_fetch_entry("http://example.org/a.txt", Some(5), "a.txt")
            .unwrap();
        assert!(matches!(
            bag.add_fetch_entry("http://example.org/b.txt", None, "../b.txt"),
            Err(BagError::InvalidFetch { .. })
        ));
        bag.update().unwrap();
        assert_eq!(
            fs::read_to_string(bag.bag_root().join("fetch.txt")).unwrap(),
            "http://example.org/a.txt 5 data/a.txt\n"
        );
        assert!(bag.remove_fetch_entry("data/a.txt"));
        bag.update().unwrap();
        assert!(!bag.bag_root().join("fetch.txt").exists());
    }

    #[test]
    fn fetch_materialises_declared_files() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_fetch_entry("http://example.org/a.txt", Some(5), "a.txt")
            .unwrap();
        bag.add_fetch_entry("http://example.org/b.txt", Some(3), "b.txt")
            .unwrap();

        let mut downloader = MockDownloader::default();
        downloader
            .bodies
            .insert("http://example.org/a.txt".into(), b"alpha".to_vec());
        downloader
            .bodies
            .insert("http://example.org/b.txt".into(), b"toolong".to_vec());

        let err = bag.fetch(&downloader).unwrap_err();
        assert!(matches!(err, BagError::Download { .. }));
        assert_eq!(
            fs::read_to_string(bag.data_directory().join("a.txt")).unwrap(),
            "alpha"
        );
        assert!(!bag.data_directory().join("b.txt").exists());

        downloader
            .bodies
            .insert("http://example.org/b.txt".into(), b"bee".to_vec());
        assert_eq!(bag.fetch(&downloader).unwrap(), 1);
    }

    #[test]
    fn interrupted_fetch_leaves_no_partial_file() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_fetch_entry("http://example.org/big.iso", None, "big.iso")
            .unwrap();

        let dropping = DroppingDownloader {
            prefix: b"abc".to_vec(),
        };
        let err = bag.fetch(&dropping).unwrap_err();
        assert!(matches!(err, BagError::Download { .. }), "{err:?}");
        assert!(!bag.data_directory().join("big.iso").exists());
        assert!(!bag.data_directory().join("big.iso.part").exists());

        let mut downloader = MockDownloader::default();
        downloader
            .bodies
            .insert("http://example.org/big.iso".into(), b"abcdef".to_vec());
        assert_eq!(bag.fetch(&downloader).unwrap(), 1);
        assert_eq!(
            fs::read(bag.data_directory().join("big.iso")).unwrap(),
            b"abcdef"
        );
    }

    #[test]
    fn fetch_marks_bag_dirty_so_package_syncs() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        bag.add_fetch_entry("http://example.org/a.txt", Some(6), "a.txt")
            .unwrap();
        bag.update().unwrap();
        assert!(!bag.is_dirty());

        let mut downloader = MockDownloader::default();
        downloader
            .bodies
            .insert("http://example.org/a.txt".into(), b"alpha!".to_vec());
        assert_eq!(bag.fetch(&downloader).unwrap(), 1);
        assert!(bag.is_dirty());

        let archive = tmp.path().join("bag.tar.gz");
        bag.package(&archive).unwrap();
        let mut loaded = Bag::load(&archive).unwrap();
        assert!(loaded.validate().unwrap(), "{:?}", loaded.errors());
        assert_eq!(loaded.get_bag_info_by_tag("Payload-Oxum"), ["6.1".to_string()]);
    }

    #[test]
    fn package_refuses_destination_inside_bag() {
        let tmp = tempdir().unwrap();
        let mut bag = new_bag(tmp.path());
        let inside = bag.bag_root().join("bag.tar.gz");
        assert!(matches!(
            bag.package(&inside),
            Err(BagError::InvalidPath { .. })
        ));
    }
}
