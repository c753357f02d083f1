//! Fixed 480×440 panel space of `panel.cfg`.

use glam::{DVec2, DVec3};

use super::{PanelRect, PanelSpace, ViewportState};

/// Authoring frame of a legacy panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyFrame {
    /// Top of the background image, in frame pixels
    pub semi_height: f64,
    /// World width of the frame at the panel distance
    pub world_width: f64,
    /// World height of the frame
    pub world_height: f64,
    /// World X of the frame's left edge
    pub world_left: f64,
    /// World Y of the frame's top edge
    pub world_top: f64,
}

impl LegacyFrame {
    /// Frame width in pixels.
    pub const WIDTH: f64 = 480.0;
    /// Frame height in pixels.
    pub const HEIGHT: f64 = 440.0;

    /// Frame centred on the driver, sized to the viewport.
    pub fn new(viewport: &ViewportState, driver: DVec3) -> Self {
        let world = viewport.world_size(Self::WIDTH / Self::HEIGHT);
        Self {
            semi_height: 240.0,
            world_width: world.x,
            world_height: world.y,
            world_left: driver.x - 0.5 * world.x,
            world_top: driver.y + 0.5 * world.y,
        }
    }

    /// Place the background: it sits on the bottom edge of the frame.
    pub fn with_background_height(mut self, height: f64) -> Self {
        self.semi_height = Self::HEIGHT - height;
        self
    }

    fn to_world(&self, px: f64, py: f64) -> DVec2 {
        DVec2::new(
            self.world_left + self.world_width * px / Self::WIDTH,
            self.world_top - self.world_height * py / Self::HEIGHT,
        )
    }
}

/// [`PanelSpace`] of a legacy panel.
#[derive(Debug, Clone, Copy)]
pub struct LegacySpace {
    /// Frame the pixel coordinates refer to
    pub frame: LegacyFrame,
    /// Driver eye position relative to the car
    pub driver: DVec3,
}

impl PanelSpace for LegacySpace {
    fn project(&self, rect: &PanelRect) -> (DVec2, DVec2) {
        (
            self.frame.to_world(rect.left, rect.top),
            self.frame
                .to_world(rect.left + rect.width, rect.top + rect.height),
        )
    }

    fn driver(&self) -> DVec3 {
        self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_spans_world() {
        let viewport = ViewportState::from_vertical_fov(4.0 / 3.0, 45.0);
        let driver = DVec3::new(0.5, 1.0, 0.0);
        let frame = LegacyFrame::new(&viewport, driver);
        let space = LegacySpace { frame, driver };

        let (p0, p1) = space.project(&PanelRect::new(0.0, 0.0, 480.0, 440.0));
        assert!((p0.x - (driver.x - 0.5 * frame.world_width)).abs() < 1e-12);
        assert!((p1.x - (driver.x + 0.5 * frame.world_width)).abs() < 1e-12);
        assert!(((p0.y + p1.y) * 0.5 - driver.y).abs() < 1e-12);
    }

    #[test]
    fn test_background_height_moves_semi_height() {
        let frame = LegacyFrame::new(&ViewportState::default(), DVec3::ZERO);
        assert_eq!(frame.semi_height, 240.0);
        assert_eq!(frame.with_background_height(300.0).semi_height, 140.0);
    }

    #[test]
    fn test_centred_pivot_is_symmetric() {
        let driver = DVec3::new(0.0, 1.0, 0.0);
        let space = LegacySpace {
            frame: LegacyFrame::new(&ViewportState::default(), driver),
            driver,
        };
        let quad = space.compile_quad(
            &PanelRect::new(10.0, 20.0, 30.0, 40.0),
            DVec2::splat(0.5),
            0.0,
        );
        let sum = quad
            .vertices
            .iter()
            .fold(DVec3::ZERO, |acc, v| acc + v.position);
        assert!(sum.length() < 1e-12);
    }
}
