//! Bag creation and validation options.

use crate::algorithm::Algorithm;
use crate::error::{BagError, BagResult};
use crate::version::Version;
use serde::Deserialize;
use std::path::Path;

/// Options applied when a bag is created, and the validation knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagOptions {
    /// Payload algorithms for a new bag, in registration order.
    pub algorithms: Vec<Algorithm>,
    /// Version written to `bagit.txt` for a new bag.
    pub version: Version,
    /// New bags carry `bag-info.txt` and tag manifests.
    pub extended: bool,
    /// Warn during validation when md5 or sha1 manifests are present.
    pub warn_on_weak_algorithms: bool,
}

impl Default for BagOptions {
    fn default() -> Self {
        Self {
            algorithms: vec![Algorithm::Sha512],
            version: Version::CURRENT,
            extended: true,
            warn_on_weak_algorithms: true,
        }
    }
}

/// Partial overrides for `BagOptions`. Used for CLI/config JSON parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BagOptionsOverrides {
    pub algorithms: Option<Vec<String>>,
    pub version: Option<String>,
    pub extended: Option<bool>,
    pub warn_on_weak_algorithms: Option<bool>,
}

impl BagOptions {
    /// Apply overrides onto these options. Only `Some` values override;
    /// names and versions are checked here rather than at first use.
    pub fn apply(self, overrides: BagOptionsOverrides) -> BagResult<Self> {
        let algorithms = match overrides.algorithms {
            Some(names) => {
                let mut algorithms = Vec::with_capacity(names.len());
                for name in &names {
                    let alg = Algorithm::parse(name)?;
                    if !algorithms.contains(&alg) {
                        algorithms.push(alg);
                    }
                }
                if algorithms.is_empty() {
                    return Err(BagError::InvalidOptions {
                        message: "algorithms must not be empty".into(),
                    });
                }
                algorithms
            }
            None => self.algorithms,
        };
        let version = match overrides.version {
            Some(v) => Version::parse_supported(&v)?,
            None => self.version,
        };
        Ok(Self {
            algorithms,
            version,
            extended: overrides.extended.unwrap_or(self.extended),
            warn_on_weak_algorithms: overrides
                .warn_on_weak_algorithms
                .unwrap_or(self.warn_on_weak_algorithms),
        })
    }

    /// Defaults with the overrides from a JSON file applied.
    pub fn from_json_file(path: &Path) -> BagResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| BagError::io(path, e))?;
        let overrides: BagOptionsOverrides =
            serde_json::from_str(&raw).map_err(|e| BagError::InvalidOptions {
                message: format!("{}: {}", path.display(), e),
            })?;
        Self::default().apply(overrides)
    }
}
