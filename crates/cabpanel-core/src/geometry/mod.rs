//! Panel-space to eye-space geometry.
//!
//! Panels are authored in pixels. A [`PanelSpace`] maps a pixel rectangle to
//! a quad one eye distance in front of the driver, sized so the panel fills the
//! binding screen axis without being stretched along the other.

mod calibrated;
pub mod camera;
mod legacy;

pub use calibrated::{CalibratedSpace, PanelCalibration};
pub use camera::CameraRestriction;
pub use legacy::{LegacyFrame, LegacySpace};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::element::Vertex;

/// Distance from the eye to the panel plane.
pub const EYE_DISTANCE: f64 = 1.0;

/// Depth step between stacked layers.
pub const STACK_DISTANCE: f64 = 1e-6;

/// Screen properties the panel is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportState {
    /// Width over height
    pub aspect_ratio: f64,
    /// Radians
    pub horizontal_half_fov: f64,
    /// Radians
    pub vertical_half_fov: f64,
}

impl ViewportState {
    /// Build from an aspect ratio and a full vertical field of view in degrees.
    pub fn from_vertical_fov(aspect_ratio: f64, vertical_fov_degrees: f64) -> Self {
        let vertical_half_fov = 0.5 * vertical_fov_degrees.to_radians();
        Self {
            aspect_ratio,
            horizontal_half_fov: (vertical_half_fov.tan() * aspect_ratio).atan(),
            vertical_half_fov,
        }
    }

    /// World-unit size of a panel whose authoring frame has aspect `frame_aspect`.
    pub fn world_size(&self, frame_aspect: f64) -> DVec2 {
        if self.aspect_ratio >= 1.0 {
            let width = 2.0 * self.horizontal_half_fov.tan() * EYE_DISTANCE;
            DVec2::new(width, width / frame_aspect)
        } else {
            let height = 2.0 * self.vertical_half_fov.tan() * EYE_DISTANCE / self.aspect_ratio;
            DVec2::new(height * frame_aspect, height)
        }
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::from_vertical_fov(16.0 / 9.0, 45.0)
    }
}

/// Rectangle in panel pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    /// Left edge
    pub left: f64,
    /// Top edge; y grows downwards
    pub top: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl PanelRect {
    /// Rectangle from its top-left corner and size.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Square of side `2·radius` centred on a point.
    pub fn around(center: DVec2, radius: f64) -> Self {
        Self::new(center.x - radius, center.y - radius, 2.0 * radius, 2.0 * radius)
    }

    /// True when the rectangle has no area.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }

    /// Centre point.
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.left + 0.5 * self.width, self.top + 0.5 * self.height)
    }
}

/// A quad centred on its rotation pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledQuad {
    /// Relative to `offset`
    pub vertices: [Vertex; 4],
    /// Pivot in eye space
    pub offset: DVec3,
}

impl CompiledQuad {
    /// Corner positions in eye space.
    pub fn corners(&self) -> [DVec3; 4] {
        self.vertices.map(|v| v.position + self.offset)
    }
}

/// A coordinate system panels are authored in.
pub trait PanelSpace {
    /// Eye-space corners `(x0, y0)` (left, top) and `(x1, y1)` (right, bottom)
    /// of a pixel rectangle, including the driver's lateral offset.
    fn project(&self, rect: &PanelRect) -> (DVec2, DVec2);

    /// Driver eye position relative to the car.
    fn driver(&self) -> DVec3;

    /// Compile a rectangle into a quad pivoting at `pivot` (fractions of the
    /// rectangle), `depth` in front of the panel plane.
    fn compile_quad(&self, rect: &PanelRect, pivot: DVec2, depth: f64) -> CompiledQuad {
        let (p0, p1) = self.project(rect);
        let xm = p0.x * (1.0 - pivot.x) + p1.x * pivot.x;
        let ym = p0.y * (1.0 - pivot.y) + p1.y * pivot.y;

        let vertex = |x: f64, y: f64, u: f64, v: f64| Vertex {
            position: DVec3::new(x - xm, y - ym, 0.0),
            texcoord: DVec2::new(u, v),
        };

        CompiledQuad {
            vertices: [
                vertex(p0.x, p1.y, 0.0, 1.0),
                vertex(p0.x, p0.y, 0.0, 0.0),
                vertex(p1.x, p0.y, 1.0, 0.0),
                vertex(p1.x, p1.y, 1.0, 1.0),
            ],
            offset: DVec3::new(xm, ym, EYE_DISTANCE - depth + self.driver().z),
        }
    }
}
