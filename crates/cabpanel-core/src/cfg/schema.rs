//! Generic section-body reader.
//!
//! Each record type declares a table of [`Field`]s mapping lowercase keys (and
//! aliases) to setters. [`read_section`] walks the records of one section once,
//! dispatching every known key and ignoring the rest.

use std::path::{Path, PathBuf};

use super::parser::{split_pair, Section};
use super::values::{parse_f64_lenient, parse_i32_lenient, Color24, Color32};
use crate::diagnostics::{Diagnostic, SourceLocation};
use crate::host::{DiagnosticSink, FileLocator};

/// Characters that can never appear in an image reference.
const INVALID_PATH_CHARS: &[char] = &['<', '>', '|', '"', '*', '?', '\0'];

/// One key handler in a section schema.
pub struct Field<T> {
    /// Lowercase key and its aliases
    pub keys: &'static [&'static str],
    /// Applies the record value to the section being built
    pub set: fn(&mut T, &mut FieldContext<'_, '_>, &str),
}

/// A record type read from one `[section]`.
pub trait SectionSchema: Default + 'static {
    /// Key handlers
    const FIELDS: &'static [Field<Self>];
}

/// Shared inputs for reading sections of one file.
pub struct ReadEnv<'a> {
    /// Name used in diagnostics
    pub file_name: &'a str,
    /// Folder image references are relative to
    pub train_dir: &'a Path,
    /// Resolves image references
    pub files: &'a dyn FileLocator,
    /// Receives field diagnostics
    pub diagnostics: &'a mut dyn DiagnosticSink,
}

impl ReadEnv<'_> {
    /// Location of a section header, for element-level diagnostics.
    pub fn section_location(&self, section: &Section<'_>) -> SourceLocation {
        SourceLocation::file(self.file_name)
            .section(section.name)
            .line(section.line)
    }

    /// Report a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }
}

/// Read a section body into a schema value.
pub fn read_section<T: SectionSchema>(section: &Section<'_>, env: &mut ReadEnv<'_>) -> T {
    let mut out = T::default();

    for record in &section.records {
        let key = record.key_lower();
        match T::FIELDS.iter().find(|f| f.keys.contains(&key.as_str())) {
            Some(field) => {
                let mut ctx = FieldContext {
                    key: record.key,
                    section: section.name,
                    line: record.line,
                    env: &mut *env,
                };
                (field.set)(&mut out, &mut ctx, record.value);
            }
            None => {
                tracing::debug!(
                    "ignoring unknown key '{}' in [{}] at line {}",
                    record.key,
                    section.name,
                    record.line
                );
            }
        }
    }

    out
}

/// What a field setter knows about the record it is applying.
pub struct FieldContext<'a, 'e> {
    /// Key as written in the file
    pub key: &'a str,
    /// Section the record belongs to
    pub section: &'a str,
    /// 1-based
    pub line: usize,
    env: &'a mut ReadEnv<'e>,
}

impl FieldContext<'_, '_> {
    /// Location of the record being applied.
    pub fn location(&self) -> SourceLocation {
        SourceLocation::file(self.env.file_name)
            .section(self.section)
            .key(self.key)
            .line(self.line)
    }

    /// Report a field error.
    pub fn error(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::field(message, self.location());
        self.env.report(diagnostic);
    }

    /// Report `<what> is invalid`.
    pub fn invalid(&mut self, what: &str) {
        self.error(format!("{} is invalid", what));
    }

    /// Parse a number; an empty value is silently `None`.
    pub fn number(&mut self, what: &str, value: &str) -> Option<f64> {
        if value.is_empty() {
            return None;
        }
        let parsed = parse_f64_lenient(value);
        if parsed.is_none() {
            self.invalid(what);
        }
        parsed
    }

    /// Parse an integer; an empty value is silently `None`.
    pub fn integer(&mut self, what: &str, value: &str) -> Option<i32> {
        if value.is_empty() {
            return None;
        }
        let parsed = parse_i32_lenient(value);
        if parsed.is_none() {
            self.invalid(what);
        }
        parsed
    }

    /// Parse an angle in degrees, returning radians.
    pub fn degrees(&mut self, value: &str) -> Option<f64> {
        self.number("ValueInDegrees", value).map(f64::to_radians)
    }

    /// Parse `a, b` where each half is a number.
    pub fn number_pair(
        &mut self,
        what: (&str, &str),
        value: &str,
    ) -> Option<(Option<f64>, Option<f64>)> {
        let Some((a, b)) = split_pair(value) else {
            self.error("Two arguments are expected");
            return None;
        };
        Some((self.number(what.0, a), self.number(what.1, b)))
    }

    /// Parse `a, b` where each half is an integer.
    pub fn integer_pair(
        &mut self,
        what: (&str, &str),
        value: &str,
    ) -> Option<(Option<i32>, Option<i32>)> {
        let Some((a, b)) = split_pair(value) else {
            self.error("Two arguments are expected");
            return None;
        };
        Some((self.integer(what.0, a), self.integer(what.1, b)))
    }

    /// Parse a 24-bit hex color; an empty value is silently `None`.
    pub fn color24(&mut self, value: &str) -> Option<Color24> {
        if value.is_empty() {
            return None;
        }
        let parsed = Color24::parse_hex(value);
        if parsed.is_none() {
            self.invalid("HexColor");
        }
        parsed
    }

    /// Parse a 32-bit hex color; an empty value is silently `None`.
    pub fn color32(&mut self, value: &str) -> Option<Color32> {
        if value.is_empty() {
            return None;
        }
        let parsed = Color32::parse_hex(value);
        if parsed.is_none() {
            self.invalid("HexColor");
        }
        parsed
    }

    /// Resolve an image reference against the train folder.
    ///
    /// A value without an extension gets `.bmp`. A missing file is a critical
    /// resource diagnostic and yields `None`.
    pub fn image(&mut self, value: &str) -> Option<PathBuf> {
        if value.is_empty() {
            return None;
        }
        if value.contains(INVALID_PATH_CHARS) {
            self.error("FileName contains illegal characters");
            return None;
        }
        let mut relative = PathBuf::from(value);
        if relative.extension().is_none() {
            relative.set_extension("bmp");
        }
        let path = self.env.files.combine_path(self.env.train_dir, &relative);
        if !self.env.files.file_exists(&path) {
            let diagnostic = Diagnostic::resource(
                format!("FileName {} could not be found", path.display()),
                self.location(),
            );
            self.env.report(diagnostic);
            return None;
        }
        Some(path)
    }
}
