//! Panel file reading and line preprocessing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::PanelError;

/// How the bytes of a panel file are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8 when valid, Latin-1 otherwise
    #[default]
    Auto,
    /// Strict UTF-8 (invalid sequences are replaced)
    Utf8,
    /// ISO-8859-1, one byte per character
    Latin1,
}

impl TextEncoding {
    /// Decode raw file bytes into text.
    pub fn decode(self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        match self {
            TextEncoding::Auto => match std::str::from_utf8(bytes) {
                Ok(s) => s.to_string(),
                Err(_) => bytes.iter().map(|&b| b as char).collect(),
            },
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// A preprocessed panel file: comment-free, trimmed lines plus where it came from.
#[derive(Debug, Clone)]
pub struct PanelSource {
    /// Path of the panel file (used in diagnostics and for format detection)
    pub path: PathBuf,
    /// Folder that image references are resolved against
    pub train_dir: PathBuf,
    /// Preprocessed lines; index + 1 is the line number in the file
    pub lines: Vec<String>,
}

impl PanelSource {
    /// Read and preprocess a panel file.
    pub fn from_file<P: AsRef<Path>>(path: P, encoding: TextEncoding) -> Result<Self, PanelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PanelError::NotFound(path.display().to_string())
            } else {
                PanelError::IoError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        let content = encoding.decode(&bytes);
        let train_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self::from_str(path, train_dir, &content))
    }

    /// Build a source from text already in memory.
    pub fn from_str(path: impl Into<PathBuf>, train_dir: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            train_dir: train_dir.into(),
            lines: content.lines().map(preprocess_line).collect(),
        }
    }

    /// File name shown in diagnostics.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Trim a raw line and drop everything from the first `;`.
pub fn preprocess_line(line: &str) -> String {
    let line = line.trim();
    match line.find(';') {
        Some(j) => line[..j].trim_end().to_string(),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_line() {
        assert_eq!(preprocess_line("  Resolution = 1024 ; wide panel"), "Resolution = 1024");
        assert_eq!(preprocess_line("; whole line comment"), "");
        assert_eq!(preprocess_line("\t[Needle]  "), "[Needle]");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"Subject = kmph \xB0";
        let text = TextEncoding::Auto.decode(bytes);
        assert!(text.ends_with('\u{B0}'));
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBF[This]";
        assert_eq!(TextEncoding::Auto.decode(bytes), "[This]");
    }

    #[test]
    fn test_from_str_keeps_line_numbers() {
        let src = PanelSource::from_str("panel2.cfg", "", "[This]\n; comment\nResolution = 800");
        assert_eq!(src.lines.len(), 3);
        assert_eq!(src.lines[1], "");
        assert_eq!(src.file_name(), "panel2.cfg");
    }
}
