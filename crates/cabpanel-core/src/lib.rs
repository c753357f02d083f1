//! # CabPanel Core Library
//!
//! Compiles train cab panel configuration files into positioned, textured and
//! animated panel elements.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Section/key-value panel file parsing (`panel2.cfg` and legacy `panel.cfg`)
//! - Panel-space to eye-space quad geometry and camera restriction
//! - Instrument builders (needles, lamps, digit strips, LED sweeps, ...)
//! - Subject name to postfix expression translation
//!
//! ## Example
//!
//! ```rust,ignore
//! use cabpanel_core::prelude::*;
//!
//! let options = CompileOptions::default();
//! let source = PanelSource::from_file("train/panel2.cfg", options.encoding)?;
//!
//! let mut textures = ImageHeaderTextures::default();
//! let files = DiskFiles::new(&options.compatibility_folder);
//! let mut sections = CarSections::new(1);
//! let mut log = DiagnosticLog::default();
//! let mut signal = CancelFlag::default();
//!
//! let mut ctx = LoadContext {
//!     textures: &mut textures,
//!     files: &files,
//!     sink: &mut sections,
//!     diagnostics: &mut log,
//!     signal: &mut signal,
//! };
//! let outcome = compile_panel(&source, &options, &mut ctx);
//! println!("{} elements", outcome.elements_added);
//! ```

pub mod cfg;
pub mod diagnostics;
pub mod element;
pub mod geometry;
pub mod host;
pub mod options;
pub mod panel;
pub mod subject;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cfg::{PanelError, PanelSource, TextEncoding};
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
    pub use crate::element::{ElementKind, ElementState, ElementStep, PanelElement};
    pub use crate::geometry::{CameraRestriction, PanelCalibration, ViewportState};
    pub use crate::host::{
        CancelFlag, CarSections, DiagnosticLog, DiagnosticSink, DiskFiles, ElementSink,
        FileLocator, ImageHeaderTextures, LoadContext, LoadSignal, TextureProvider,
    };
    pub use crate::options::{BrakeHandle, CompileOptions, TrainInfo};
    pub use crate::panel::{compile_panel, compile_panel_as, locate_panel, PanelFormat, PanelOutcome};
    pub use crate::subject::SubjectTranslator;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
