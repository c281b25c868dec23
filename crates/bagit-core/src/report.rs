//! Error and warning accumulation for load and validation passes.

use std::fmt;

/// Severity of a recorded finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding attributed to a bag file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Relative name of the file the finding belongs to (e.g. `manifest-sha1.txt`).
    pub file: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}

/// Ordered errors and warnings. Errors decide validity; warnings never do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn error(&mut self, file: impl Into<String>, message: impl Into<String>) {
        let finding = Finding {
            file: file.into(),
            message: message.into(),
        };
        tracing::debug!(file = %finding.file, "bag error: {}", finding.message);
        self.errors.push(finding);
    }

    pub fn warning(&mut self, file: impl Into<String>, message: impl Into<String>) {
        let finding = Finding {
            file: file.into(),
            message: message.into(),
        };
        tracing::warn!(file = %finding.file, "bag warning: {}", finding.message);
        self.warnings.push(finding);
    }

    pub fn push(&mut self, severity: Severity, file: impl Into<String>, message: impl Into<String>) {
        match severity {
            Severity::Error => self.error(file, message),
            Severity::Warning => self.warning(file, message),
        }
    }

    /// Append every finding of `other`, preserving order.
    pub fn merge(&mut self, other: Report) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Drop all findings. The only way findings are ever cleared.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.warnings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_and_warning_are_kept_apart() {
        let mut report = Report::new();
        report.error("some_file", "some_error");
        assert_eq!(report.errors().len(), 1);
        assert!(report.warnings().is_empty());

        report.warning("some_file", "some_warning");
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.warnings().len(), 1);
        assert!(!report.is_ok());
    }

    #[test]
    fn reset_clears_everything() {
        let mut report = Report::new();
        report.error("a", "b");
        report.warning("c", "d");
        report.reset();
        assert!(report.errors().is_empty());
        assert!(report.warnings().is_empty());
        assert!(report.is_ok());
    }

    #[test]
    fn merge_preserves_order() {
        let mut first = Report::new();
        first.error("one", "1");
        let mut second = Report::new();
        second.error("two", "2");
        second.push(Severity::Warning, "two", "w");
        first.merge(second);
        let files: Vec<_> = first.errors().iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files, vec!["one", "two"]);
        assert_eq!(first.warnings()[0].to_string(), "two: w");
    }
}
