//! Error types for panel file loading

use thiserror::Error;

/// Errors that stop a panel from being compiled at all.
///
/// Problems inside the file never surface here; they are reported as
/// [`Diagnostic`](crate::diagnostics::Diagnostic)s and the compile carries on.
#[derive(Error, Debug)]
pub enum PanelError {
    /// Reading a file failed
    #[error("I/O error reading '{path}': {message}")]
    IoError { path: String, message: String },

    /// The panel file does not exist
    #[error("Panel file not found: '{0}'")]
    NotFound(String),

    /// Neither `panel2.cfg` nor `panel.cfg` exists
    #[error("No panel configuration found in '{0}'")]
    NoPanelFile(String),

    /// The file name is neither `panel2.cfg` nor `panel.cfg`
    #[error("Unrecognised panel file name: '{0}'")]
    UnknownFormat(String),

    /// The options file could not be parsed
    #[error("Invalid compile options in '{path}': {message}")]
    InvalidOptions { path: String, message: String },
}
