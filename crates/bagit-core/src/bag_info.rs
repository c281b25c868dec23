//! `bag-info.txt`: ordered, multi-valued, case-insensitive metadata.
//!
//! Tags keep the casing they were first written with and are emitted in
//! insertion order. Lookups go through a case-folded index so no lookup ever
//! scans the ordered store.

use crate::error::{BagError, BagResult};
use crate::report::Report;
use crate::version::Version;
use std::collections::HashMap;

/// File name of the bag-info tag file.
pub const BAG_INFO_FILE: &str = "bag-info.txt";

/// Maximum line length before wrapping.
pub const WRAP_WIDTH: usize = 79;

/// Indent used for continuation lines.
pub const CONTINUATION_PREFIX: &str = "  ";

/// Tags computed by `Bag::update`.
pub const GENERATED_TAGS: [&str; 3] = ["Payload-Oxum", "Bagging-Date", "Bag-Size"];

/// Tags that SHOULD NOT appear more than once.
pub const NON_REPEATABLE_TAGS: [&str; 5] = [
    "Bagging-Date",
    "Bag-Size",
    "Payload-Oxum",
    "Bag-Group-Identifier",
    "Bag-Count",
];

pub fn is_generated_tag(name: &str) -> bool {
    GENERATED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// One tag with all of its values, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagInfoTag {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagInfo {
    tags: Vec<BagInfoTag>,
    index: HashMap<String, usize>,
}

impl BagInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn tags(&self) -> &[BagInfoTag] {
        &self.tags
    }

    /// Append `value` to `name`, creating the tag if needed. Line breaks in
    /// the value are flattened to single spaces.
    pub fn add_tag(&mut self, name: &str, value: &str) -> BagResult<()> {
        validate_name(name)?;
        self.push_parsed(name, flatten(value));
        Ok(())
    }

    /// Replace all values of `name` with a single value, keeping its position.
    pub fn set_tag(&mut self, name: &str, value: &str) -> BagResult<()> {
        let key = fold(name);
        match self.index.get(&key) {
            Some(&pos) => {
                self.tags[pos].values = vec![flatten(value)];
                Ok(())
            }
            None => self.add_tag(name, value),
        }
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.index.contains_key(&fold(name))
    }

    /// All values of `name`, empty when the tag is absent.
    pub fn get_values(&self, name: &str) -> &[String] {
        self.index
            .get(&fold(name))
            .map(|&pos| self.tags[pos].values.as_slice())
            .unwrap_or(&[])
    }

    /// The casing `name` was first written with.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.index
            .get(&fold(name))
            .map(|&pos| self.tags[pos].name.as_str())
    }

    /// Remove a tag and all of its values.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        match self.index.get(&fold(name)) {
            Some(&pos) => {
                self.tags.remove(pos);
                self.rebuild_index();
                true
            }
            None => false,
        }
    }

    /// Remove a single value; the tag goes away with its last value.
    pub fn remove_value(&mut self, name: &str, index: usize) -> bool {
        let Some(&pos) = self.index.get(&fold(name)) else {
            return false;
        };
        let values = &mut self.tags[pos].values;
        if index >= values.len() {
            return false;
        }
        values.remove(index);
        if values.is_empty() {
            self.tags.remove(pos);
            self.rebuild_index();
        }
        true
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tags
            .iter()
            .enumerate()
            .map(|(pos, tag)| (fold(&tag.name), pos))
            .collect();
    }

    /// Render every `Name: value` pair, wrapped.
    pub fn serialize(&self) -> Vec<String> {
        self.tags
            .iter()
            .flat_map(|tag| {
                tag.values
                    .iter()
                    .flat_map(move |value| wrap_line(&format!("{}: {}", tag.name, value)))
            })
            .collect()
    }

    /// Parse tag-file lines. Line-level problems are recorded in `report`
    /// against `bag-info.txt`; parsing continues past them.
    pub fn parse(lines: &[String], version: Version, report: &mut Report) -> Self {
        let numbered = lines.iter().enumerate().map(|(idx, line)| (idx + 1, line.as_str()));
        Self::parse_numbered(numbered, version, report)
    }

    /// [`BagInfo::parse`] over lines that carry their own line numbers.
    pub fn parse_numbered<'l>(
        lines: impl IntoIterator<Item = (usize, &'l str)>,
        version: Version,
        report: &mut Report,
    ) -> Self {
        let mut info = BagInfo::new();
        let mut current: Option<(String, String)> = None;

        for (line_no, line) in lines {
            if line.trim().is_empty() {
                report.warning(BAG_INFO_FILE, format!("line {}: blank line", line_no));
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                match current.as_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(line.trim());
                    }
                    None => report.error(
                        BAG_INFO_FILE,
                        format!("line {}: continuation line without a preceding tag", line_no),
                    ),
                }
                continue;
            }
            let Some((raw_name, raw_value)) = line.split_once(':') else {
                report.error(
                    BAG_INFO_FILE,
                    format!("line {}: expected 'Name: value', got '{}'", line_no, line),
                );
                continue;
            };
            let name = raw_name.trim();
            if name.is_empty() {
                report.error(BAG_INFO_FILE, format!("line {}: empty tag name", line_no));
                continue;
            }
            if version.strict_tag_names() && name != raw_name {
                report.error(
                    BAG_INFO_FILE,
                    format!(
                        "line {}: tag name '{}' has leading or trailing whitespace",
                        line_no, raw_name
                    ),
                );
            }
            if let Some((prev_name, prev_value)) = current.take() {
                info.push_parsed(&prev_name, prev_value);
            }
            current = Some((name.to_string(), raw_value.trim().to_string()));
        }
        if let Some((name, value)) = current {
            info.push_parsed(&name, value);
        }

        for tag in &info.tags {
            let repeat_limited = NON_REPEATABLE_TAGS
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&tag.name));
            if repeat_limited && tag.values.len() > 1 {
                report.warning(
                    BAG_INFO_FILE,
                    format!("tag '{}' SHOULD NOT be repeated", tag.name),
                );
            }
        }
        info
    }

    fn push_parsed(&mut self, name: &str, value: String) {
        let key = fold(name);
        match self.index.get(&key) {
            Some(&pos) => self.tags[pos].values.push(value),
            None => {
                self.index.insert(key, self.tags.len());
                self.tags.push(BagInfoTag {
                    name: name.to_string(),
                    values: vec![value],
                });
            }
        }
    }
}

fn validate_name(name: &str) -> BagResult<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name != name.trim() {
        Some("name has leading or trailing whitespace")
    } else if name.contains(':') {
        Some("name contains ':'")
    } else if name.contains(['\r', '\n']) {
        Some("name contains a line break")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(BagError::InvalidTag {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn flatten(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap a `Name: value` line to [`WRAP_WIDTH`] columns.
///
/// Breaks at the last whitespace at or before the limit; continuation rows
/// get [`CONTINUATION_PREFIX`] and are wrapped again under the same rule. A
/// token longer than the limit is never split: the row runs on to the next
/// whitespace instead.
pub fn wrap_line(text: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = text.to_string();
    let mut prefix_len = 0;

    loop {
        let chars: Vec<char> = current.chars().collect();
        if chars.len() <= WRAP_WIDTH {
            rows.push(current);
            break;
        }
        let first_allowed = prefix_len + 1;
        let within = (first_allowed..=WRAP_WIDTH)
            .rev()
            .find(|&i| chars[i].is_whitespace());
        let split_at = within.or_else(|| {
            (WRAP_WIDTH + 1..chars.len()).find(|&i| chars[i].is_whitespace())
        });
        let Some(split_at) = split_at else {
            rows.push(current);
            break;
        };
        let head: String = chars[..split_at].iter().collect();
        let rest: String = chars[split_at..].iter().collect();
        let rest = rest.trim_start();
        rows.push(head.trim_end().to_string());
        if rest.is_empty() {
            break;
        }
        current = format!("{}{}", CONTINUATION_PREFIX, rest);
        prefix_len = CONTINUATION_PREFIX.len();
    }
    rows
}
