//! Shared pieces of the element builders.

use glam::{DVec2, DVec3};
use std::path::{Path, PathBuf};

use crate::cfg::{ReadEnv, Section};
use crate::diagnostics::Diagnostic;
use crate::element::{ElementState, Material, Mesh, RadialSweep};
use crate::geometry::{CompiledQuad, PanelRect, PanelSpace};
use crate::host::{ClipRegion, DiagnosticSink, FileLocator, TextureHandle, TextureParameters, TextureProvider};
use crate::options::CompileOptions;
use crate::subject::{number, SubjectTranslator};

/// Collaborators and settings every builder of one compile shares.
pub struct BuildContext<'a> {
    /// Diagnostic and file access for the section readers
    pub read: ReadEnv<'a>,
    /// Texture registry of the host
    pub textures: &'a mut dyn TextureProvider,
    /// Subject translator for the train
    pub subjects: SubjectTranslator,
    /// Options of the compile
    pub options: &'a CompileOptions,
}

impl<'a> BuildContext<'a> {
    /// Context for compiling `file_name` found in `train_dir`.
    pub fn new(
        file_name: &'a str,
        train_dir: &'a Path,
        files: &'a dyn FileLocator,
        diagnostics: &'a mut dyn DiagnosticSink,
        textures: &'a mut dyn TextureProvider,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            read: ReadEnv {
                file_name,
                train_dir,
                files,
                diagnostics,
            },
            textures,
            subjects: SubjectTranslator::new(options.train.cars),
            options,
        }
    }

    /// Element-level error at a section header.
    pub fn element_error(&mut self, section: &Section<'_>, message: impl Into<String>) {
        let diagnostic = Diagnostic::element(message, self.read.section_location(section));
        self.read.report(diagnostic);
    }

    /// Element-level warning at a section header.
    pub fn element_warning(&mut self, section: &Section<'_>, message: impl Into<String>) {
        let diagnostic = Diagnostic::element(message, self.read.section_location(section)).warning();
        self.read.report(diagnostic);
    }

    /// Translate a subject, reporting unknown names at the `Subject` record
    /// (or the section header when the subject was left at its default).
    pub fn subject(&mut self, section: &Section<'_>, subject: &str, line: Option<usize>) -> String {
        let mut location = self.read.section_location(section).key("Subject");
        if let Some(line) = line {
            location = location.line(line);
        }
        self.subjects
            .translate(subject, location, &mut *self.read.diagnostics)
    }

    /// Register a texture and return it with its pixel size.
    pub fn texture(
        &mut self,
        section: &Section<'_>,
        path: &Path,
        params: &TextureParameters,
    ) -> Option<(TextureHandle, DVec2)> {
        let registered = self.textures.register_texture(path, params).and_then(|handle| {
            let (w, h) = self.textures.texture_dimensions(handle)?;
            Some((handle, DVec2::new(f64::from(w), f64::from(h))))
        });
        if registered.is_none() {
            self.element_error(section, format!("Texture {} could not be loaded", path.display()));
        }
        registered
    }

    /// Register an optional texture; `None` in, `None` out.
    pub fn optional_texture(
        &mut self,
        section: &Section<'_>,
        path: Option<&Path>,
        params: &TextureParameters,
    ) -> Option<TextureHandle> {
        path.and_then(|p| self.texture(section, p, params))
            .map(|(handle, _)| handle)
    }

    /// Pixel size of an image without registering it.
    pub fn image_size(&mut self, section: &Section<'_>, path: &Path) -> Option<DVec2> {
        let size = self
            .textures
            .image_dimensions(path)
            .map(|(w, h)| DVec2::new(f64::from(w), f64::from(h)));
        if size.is_none() {
            self.element_error(section, format!("Image {} could not be read", path.display()));
        }
        size
    }

    /// Stock image from the compatibility folder, if present.
    pub fn compatibility_image(&mut self, section: &Section<'_>, name: &str) -> Option<PathBuf> {
        let path = self.read.files.compatibility_file(name);
        if self.read.files.file_exists(&path) {
            return Some(path);
        }
        let diagnostic = Diagnostic::resource(
            format!("Compatibility file {} could not be found", path.display()),
            self.read.section_location(section),
        );
        self.read.report(diagnostic);
        None
    }

    /// Compile a rectangle into a state, warning about zero-sized rectangles.
    pub fn quad_state(
        &mut self,
        section: &Section<'_>,
        space: &dyn PanelSpace,
        rect: &PanelRect,
        pivot: DVec2,
        depth: f64,
        material: Material,
    ) -> (CompiledQuad, ElementState) {
        if rect.is_degenerate() {
            self.element_warning(section, "The element has zero width or height");
        }
        let quad = space.compile_quad(rect, pivot, depth);
        let state = ElementState {
            offset: quad.offset,
            mesh: Mesh::quad(quad.vertices, material),
        };
        (quad, state)
    }
}

/// Linear map from a value range onto an angle range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleMap {
    /// Angle at `minimum`, radians
    pub initial: f64,
    /// Angle at `maximum`, radians
    pub last: f64,
    /// Value mapped to `initial`
    pub minimum: f64,
    /// Value mapped to `last`
    pub maximum: f64,
}

impl AngleMap {
    /// `(a1, a0)` with `angle = a1·v + a0`.
    pub fn coefficients(&self) -> (f64, f64) {
        let range = self.maximum - self.minimum;
        let a1 = (self.last - self.initial) / range;
        let a0 = (self.initial * self.maximum - self.last * self.minimum) / range;
        (a1, a0)
    }

    /// `<value> a1 a0 fma`
    pub fn expression(&self, value: &str) -> String {
        let (a1, a0) = self.coefficients();
        format!("{} {} {} fma", value, number(a1), number(a0))
    }
}

/// Quantize the value on the stack to `step` (0 leaves it continuous).
pub fn step_fragment(step: f64) -> String {
    if step == 1.0 {
        " floor".to_string()
    } else if step != 0.0 {
        format!(" {} * floor {} *", number(1.0 / step), number(step))
    } else {
        String::new()
    }
}

/// LED sweep over a compiled quad.
pub fn radial_sweep(quad: &CompiledQuad, initial: f64, last: f64, function: String) -> RadialSweep {
    let corners = quad.vertices.map(|v| v.position);
    let centroid = corners.iter().fold(DVec3::ZERO, |acc, &c| acc + c) * 0.25;
    RadialSweep {
        initial_angle: initial,
        last_angle: last,
        clockwise: initial <= last,
        vectors: [corners[0], corners[1], corners[2], corners[3], centroid],
        function,
    }
}

/// Number of whole frames of `interval` pixels in a sheet.
pub fn frame_count(sheet: f64, interval: f64) -> usize {
    if interval <= 0.0 || sheet < interval {
        return 0;
    }
    (sheet / interval).floor() as usize
}

/// Texture parameters for frame `index` of a vertically stacked sheet.
pub fn vertical_frame(base: &TextureParameters, width: f64, interval: f64, index: usize) -> TextureParameters {
    base.clone().clipped(ClipRegion {
        left: 0,
        top: (index as f64 * interval) as u32,
        width: width as u32,
        height: interval as u32,
    })
}

/// Texture parameters for frame `index` of a horizontally stacked sheet.
pub fn horizontal_frame(base: &TextureParameters, interval: f64, height: f64, index: usize) -> TextureParameters {
    base.clone().clipped(ClipRegion {
        left: (index as f64 * interval) as u32,
        top: 0,
        width: interval as u32,
        height: height as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_map_bounds() {
        let map = AngleMap {
            initial: -2.0,
            last: 2.5,
            minimum: 10.0,
            maximum: 110.0,
        };
        let (a1, a0) = map.coefficients();
        assert!((a1.mul_add(10.0, a0) - -2.0).abs() < 1e-12);
        assert!((a1.mul_add(110.0, a0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_step_fragment() {
        assert_eq!(step_fragment(0.0), "");
        assert_eq!(step_fragment(1.0), " floor");
        assert_eq!(step_fragment(5.0), " 0.2 * floor 5 *");
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(110.0, 10.0), 11);
        assert_eq!(frame_count(115.0, 10.0), 11);
        assert_eq!(frame_count(5.0, 10.0), 0);
        assert_eq!(frame_count(100.0, 0.0), 0);
    }

    #[test]
    fn test_frame_clips() {
        let params = vertical_frame(&TextureParameters::default(), 24.0, 16.0, 3);
        assert_eq!(
            params.clip,
            Some(ClipRegion {
                left: 0,
                top: 48,
                width: 24,
                height: 16
            })
        );
        let params = horizontal_frame(&TextureParameters::default(), 32.0, 20.0, 2);
        assert_eq!(params.clip.map(|c| c.left), Some(64));
    }
}
