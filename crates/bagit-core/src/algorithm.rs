//! Checksum algorithms and the hashing collaborator.

use crate::error::{BagError, BagResult};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// A digest usable in `manifest-<alg>.txt` / `tagmanifest-<alg>.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha224,
        Algorithm::Sha256,
        Algorithm::Sha384,
        Algorithm::Sha512,
    ];

    /// Token used in manifest file names.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha224 => "sha224",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Exact manifest-token match (lowercase, no hyphen).
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == token)
    }

    /// Lenient parse for user input: case-insensitive, hyphen optional.
    pub fn parse(name: &str) -> BagResult<Self> {
        let folded = name.trim().to_ascii_lowercase().replace('-', "");
        Self::from_token(&folded).ok_or_else(|| BagError::UnsupportedAlgorithm {
            name: name.to_string(),
        })
    }

    /// Digest length in hex characters.
    pub fn hex_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 32,
            Algorithm::Sha1 => 40,
            Algorithm::Sha224 => 56,
            Algorithm::Sha256 => 64,
            Algorithm::Sha384 => 96,
            Algorithm::Sha512 => 128,
        }
    }

    /// md5 and sha1 are still readable but no longer recommended.
    pub fn is_weak(&self) -> bool {
        matches!(self, Algorithm::Md5 | Algorithm::Sha1)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Computes lowercase hex digests of byte streams.
pub trait Hasher {
    fn digest(&self, algorithm: Algorithm, reader: &mut dyn Read) -> io::Result<String>;

    fn digest_bytes(&self, algorithm: Algorithm, bytes: &[u8]) -> io::Result<String> {
        let mut cursor = io::Cursor::new(bytes);
        self.digest(algorithm, &mut cursor)
    }
}

/// RustCrypto/md5-backed hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHasher;

fn stream<D: Digest + io::Write>(mut hasher: D, reader: &mut dyn Read) -> io::Result<String> {
    io::copy(reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

impl Hasher for StdHasher {
    fn digest(&self, algorithm: Algorithm, reader: &mut dyn Read) -> io::Result<String> {
        match algorithm {
            Algorithm::Md5 => {
                let mut context = md5::Context::new();
                io::copy(reader, &mut context)?;
                Ok(format!("{:x}", context.finalize()))
            }
            Algorithm::Sha1 => stream(Sha1::new(), reader),
            Algorithm::Sha224 => stream(Sha224::new(), reader),
            Algorithm::Sha256 => stream(Sha256::new(), reader),
            Algorithm::Sha384 => stream(Sha384::new(), reader),
            Algorithm::Sha512 => stream(Sha512::new(), reader),
        }
    }
}
