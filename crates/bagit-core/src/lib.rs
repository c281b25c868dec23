//! Create, load, update and validate BagIt packages (0.96, 0.97, 1.0).

pub mod algorithm;
pub mod archive;
pub mod bag;
pub mod bag_info;
pub mod download;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod manifest;
pub mod options;
pub mod path;
pub mod reader;
pub mod report;
pub mod size;
pub mod validate;
pub mod version;

// Convenience re-exports
pub use algorithm::{Algorithm, Hasher, StdHasher};
pub use bag::Bag;
pub use bag_info::{wrap_line, BagInfo, BagInfoTag};
pub use download::{Download, Downloader};
pub use error::{BagError, BagResult};
pub use fetch::{FetchEntry, FetchLength, FetchRegistry};
pub use fs::{get_directory, Filesystem, StdFilesystem};
pub use manifest::{classify, is_tag_manifest, FileClass, Manifest, ManifestKind};
pub use options::{BagOptions, BagOptionsOverrides};
pub use path::{PathResolver, RelativePath};
pub use report::{Finding, Report, Severity};
pub use size::{convert_to_human_readable, PayloadOxum};
pub use validate::ValidationState;
pub use version::Version;

#[cfg(feature = "http-fetch")]
pub use download::HttpDownloader;
