//! Resizable panel space of `panel2.cfg`.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use super::{PanelRect, PanelSpace, ViewportState};
use crate::cfg::Color24;

/// Pixel-to-world calibration of one panel, fixed once `[This]` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelCalibration {
    /// Pixels per panel width
    pub resolution: f64,
    /// Left pan bound, pixels
    pub left: f64,
    /// Right pan bound
    pub right: f64,
    /// Top pan bound
    pub top: f64,
    /// Bottom pan bound
    pub bottom: f64,
    /// Pixel that appears at the screen centre
    pub center: DVec2,
    /// Pixel the driver looks at
    pub origin: DVec2,
    /// Size of the background bitmap, 0 until it is registered
    pub bitmap_width: f64,
    /// Height of the background bitmap
    pub bitmap_height: f64,
    /// Color key of the background image
    pub transparent_color: Color24,
}

impl Default for PanelCalibration {
    fn default() -> Self {
        Self {
            resolution: 1024.0,
            left: 0.0,
            right: 1024.0,
            top: 0.0,
            bottom: 1024.0,
            center: DVec2::new(0.0, 512.0),
            origin: DVec2::new(0.0, 512.0),
            bitmap_width: 0.0,
            bitmap_height: 0.0,
            transparent_color: Color24::BLUE,
        }
    }
}

/// [`PanelSpace`] of a calibrated panel.
#[derive(Debug, Clone, Copy)]
pub struct CalibratedSpace<'a> {
    /// Calibration read from `[This]`
    pub calibration: &'a PanelCalibration,
    /// Screen and field of view
    pub viewport: ViewportState,
    /// Driver eye position relative to the car
    pub driver: DVec3,
}

impl<'a> CalibratedSpace<'a> {
    /// Space for one calibrated panel.
    pub fn new(calibration: &'a PanelCalibration, viewport: ViewportState, driver: DVec3) -> Self {
        Self {
            calibration,
            viewport,
            driver,
        }
    }

    /// World size of the panel; the frame aspect is the screen's.
    pub fn world_size(&self) -> DVec2 {
        self.viewport.world_size(self.viewport.aspect_ratio)
    }
}

impl PanelSpace for CalibratedSpace<'_> {
    fn project(&self, rect: &PanelRect) -> (DVec2, DVec2) {
        let c = self.calibration;
        let aspect = self.viewport.aspect_ratio;
        let res = c.resolution;

        let mut x0 = rect.left / res;
        let mut x1 = (rect.left + rect.width) / res;
        let mut y0 = (c.bottom - rect.top) / res * aspect;
        let mut y1 = (c.bottom - (rect.top + rect.height)) / res * aspect;

        let xd = 0.5 - c.center.x / res;
        x0 += xd;
        x1 += xd;

        let yt = c.bottom - res / aspect;
        let yd = (c.center.y - yt) / (c.bottom - yt) - 0.5;
        y0 += yd;
        y1 += yd;

        let world = self.world_size();
        (
            DVec2::new(
                (x0 - 0.5) * world.x + self.driver.x,
                (y0 - 0.5) * world.y + self.driver.y,
            ),
            DVec2::new(
                (x1 - 0.5) * world.x + self.driver.x,
                (y1 - 0.5) * world.y + self.driver.y,
            ),
        )
    }

    fn driver(&self) -> DVec3 {
        self.driver
    }
}
