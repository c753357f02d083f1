//! Diagnostics reported while compiling a panel.
//!
//! Nothing in a panel file aborts the compile. Every problem becomes a
//! [`Diagnostic`] carrying enough location data to be fixed on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Logged for information only
    Information,
    /// Something was ignored or clamped
    Warning,
    /// Something was skipped
    Error,
}

/// Which stage of the compile raised the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A single key/value was malformed; the field keeps its default
    Field,
    /// A required field is missing after the section was read; the element is skipped
    Element,
    /// A referenced image does not exist; the element needing it is skipped
    Resource,
    /// The file preamble is not understood
    Format,
}

/// Where in the panel file a diagnostic points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Panel file name as given to the compile
    pub file: String,
    /// Section name without brackets
    pub section: Option<String>,
    /// Key as written in the file
    pub key: Option<String>,
    /// 1-based
    pub line: Option<usize>,
}

impl SourceLocation {
    /// Location in `file`, narrowed by the builders below.
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Narrow to a section.
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Narrow to a key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Point at a 1-based line.
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "in {} ", key)?;
        }
        if let Some(section) = &self.section {
            write!(f, "in [{}] ", section)?;
        }
        if let Some(line) = self.line {
            write!(f, "at line {} ", line)?;
        }
        write!(f, "in {}", self.file)
    }
}

/// A single compile diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How serious it is
    pub severity: Severity,
    /// Critical diagnostics are shown to the user even when logging is quiet
    pub critical: bool,
    /// Stage that raised it
    pub kind: DiagnosticKind,
    /// Human-readable text
    pub message: String,
    /// Where it points
    pub location: SourceLocation,
}

impl Diagnostic {
    /// A malformed value; the field keeps its default.
    pub fn field(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            critical: false,
            kind: DiagnosticKind::Field,
            message: message.into(),
            location,
        }
    }

    /// A section that cannot produce its element.
    pub fn element(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            critical: false,
            kind: DiagnosticKind::Element,
            message: message.into(),
            location,
        }
    }

    /// A missing image. Always critical.
    pub fn resource(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            critical: true,
            kind: DiagnosticKind::Resource,
            message: message.into(),
            location,
        }
    }

    /// An unsupported file preamble.
    pub fn format(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            critical: false,
            kind: DiagnosticKind::Format,
            message: message.into(),
            location,
        }
    }

    /// Downgrade to a warning.
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.message, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let loc = SourceLocation::file("panel2.cfg")
            .section("Needle")
            .key("Radius")
            .line(12);
        let diag = Diagnostic::field("ValueInPixels is invalid", loc);
        assert_eq!(
            diag.to_string(),
            "ValueInPixels is invalid in Radius in [Needle] at line 12 in panel2.cfg"
        );
    }

    #[test]
    fn test_resource_is_critical() {
        let diag = Diagnostic::resource("missing", SourceLocation::file("panel.cfg"));
        assert!(diag.critical);
        assert_eq!(diag.kind, DiagnosticKind::Resource);
        assert_eq!(diag.to_string(), "missing in panel.cfg");
    }
}
