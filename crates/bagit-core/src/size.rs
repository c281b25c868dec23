//! Payload size bookkeeping: `Payload-Oxum` and human-readable `Bag-Size`.

use std::fmt;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with 1024-based units and two decimals.
///
/// Zero is special-cased to `"0 B"`.
pub fn convert_to_human_readable(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// `<octet count>.<stream count>` of the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadOxum {
    pub octets: u64,
    pub files: u64,
}

impl PayloadOxum {
    pub fn parse(value: &str) -> Option<Self> {
        let (octets, files) = value.trim().split_once('.')?;
        Some(Self {
            octets: octets.parse().ok()?,
            files: files.parse().ok()?,
        })
    }
}

impl fmt::Display for PayloadOxum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.octets, self.files)
    }
}
