//! Collaborator interfaces used while compiling a panel.
//!
//! The compiler never loads images, stores meshes or prints anything itself; it
//! talks to the outside world only through these traits. Stock implementations
//! cover the common desktop case and the command line front end.

mod disk;
mod sinks;
mod textures;

pub use disk::DiskFiles;
pub use sinks::{CancelFlag, CarSections, DiagnosticLog};
pub use textures::{ImageHeaderTextures, RegisteredTexture};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cfg::Color24;
use crate::diagnostics::Diagnostic;
use crate::element::{ElementState, PanelElement};

/// Opaque handle to a registered texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub usize);

/// Texture wrapping along one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    /// Sample the border texel outside 0..1
    #[default]
    ClampToEdge,
    /// Tile the texture
    Repeat,
}

/// Sub-rectangle of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRegion {
    /// Left edge
    pub left: u32,
    /// Top edge
    pub top: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// How an image file becomes a texture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureParameters {
    /// Pixels of this color become transparent
    pub transparent_color: Option<Color24>,
    /// Part of the image to use, whole image when unset
    pub clip: Option<ClipRegion>,
    /// Horizontal wrapping
    pub wrap_u: WrapMode,
    /// Vertical wrapping
    pub wrap_v: WrapMode,
}

impl TextureParameters {
    /// Whole image with a color key.
    pub fn keyed(transparent_color: Color24) -> Self {
        Self {
            transparent_color: Some(transparent_color),
            ..Default::default()
        }
    }

    /// Restrict to a sub-rectangle.
    pub fn clipped(mut self, clip: ClipRegion) -> Self {
        self.clip = Some(clip);
        self
    }
}

/// Texture loading and caching.
pub trait TextureProvider {
    /// Register an image file; `None` if it cannot be used.
    fn register_texture(&mut self, path: &Path, params: &TextureParameters) -> Option<TextureHandle>;

    /// Pixel size of a registered texture (after clipping).
    fn texture_dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)>;

    /// Pixel size of an image file without registering it.
    fn image_dimensions(&self, path: &Path) -> Option<(u32, u32)>;
}

/// File system access.
pub trait FileLocator {
    /// Whether a file exists at `path`.
    fn file_exists(&self, path: &Path) -> bool;

    /// Join a relative reference onto a base folder.
    fn combine_path(&self, base: &Path, relative: &Path) -> PathBuf;

    /// Location of a bundled compatibility image (legacy needles and hands).
    fn compatibility_file(&self, name: &str) -> PathBuf;
}

/// Receives built elements, per car.
pub trait ElementSink {
    /// Append a new element and return its index.
    fn append_element(&mut self, car: usize, element: PanelElement) -> usize;

    /// Append a state to an existing element.
    fn append_state(&mut self, car: usize, element: usize, state: ElementState);

    /// Index of the most recently appended element of a car.
    fn last_element(&self, car: usize) -> Option<usize>;
}

/// Receives diagnostics.
pub trait DiagnosticSink {
    /// Take one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Cooperative cancellation and progress.
pub trait LoadSignal {
    /// True once the compile should stop.
    fn is_cancelled(&self) -> bool;

    /// Give other work a chance to run.
    fn yield_now(&mut self) {}

    /// Called once per processed line.
    fn report_progress(&mut self, _line: usize, _total: usize) {}
}

/// All collaborators of one compile, borrowed for its duration.
pub struct LoadContext<'a> {
    /// Texture registry
    pub textures: &'a mut dyn TextureProvider,
    /// Resolves file references
    pub files: &'a dyn FileLocator,
    /// Receives the built elements
    pub sink: &'a mut dyn ElementSink,
    /// Receives diagnostics
    pub diagnostics: &'a mut dyn DiagnosticSink,
    /// Checked between sections for cancellation
    pub signal: &'a mut dyn LoadSignal,
}
