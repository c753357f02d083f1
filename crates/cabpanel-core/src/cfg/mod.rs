//! Panel configuration text format
//!
//! Panel files are line oriented:
//! - `;` starts a comment that runs to the end of the line
//! - `[Name]` opens a section (names are case-insensitive)
//! - `Key = Value` records live inside a section
//! - Unknown sections and keys are skipped, never rejected

mod error;
pub mod parser;
pub mod schema;
mod source;
pub mod values;

pub use error::PanelError;
pub use parser::{split_arguments, tokenize, Record, Section, Tokenized};
pub use schema::{read_section, Field, FieldContext, ReadEnv, SectionSchema};
pub use source::{preprocess_line, PanelSource, TextEncoding};
pub use values::{Color24, Color32};
