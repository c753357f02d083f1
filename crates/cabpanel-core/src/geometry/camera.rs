//! Camera restriction: how far the driver may look around the panel.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::{LegacyFrame, PanelCalibration, ViewportState, EYE_DISTANCE};

/// Added to the authored legacy pitch.
pub const UP_DOWN_ANGLE_CONSTANT: f64 = -0.191986217719376;

/// Eye-space clip corners and default view direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraRestriction {
    /// Lowest, leftmost visible corner
    pub bottom_left: DVec3,
    /// Highest, rightmost visible corner
    pub top_right: DVec3,
    /// Radians
    pub yaw: f64,
    /// Radians
    pub pitch: f64,
}

impl CameraRestriction {
    /// Restriction of a calibrated panel.
    pub fn calibrated(calibration: &PanelCalibration, viewport: &ViewportState) -> Self {
        let c = calibration;
        let res = c.resolution;
        let aspect = viewport.aspect_ratio;
        let world = viewport.world_size(aspect);

        let x0 = (c.left - c.center.x) / res;
        let x1 = (c.right - c.center.x) / res;
        let y0 = (c.center.y - c.bottom) / res * aspect;
        let y1 = (c.center.y - c.top) / res * aspect;

        Self {
            bottom_left: DVec3::new(x0 * world.x, y0 * world.y, EYE_DISTANCE),
            top_right: DVec3::new(x1 * world.x, y1 * world.y, EYE_DISTANCE),
            yaw: ((c.center.x - c.origin.x) * world.x / res).atan(),
            pitch: ((c.origin.y - c.center.y) * world.x / res).atan(),
        }
    }

    /// Restriction of a legacy panel; `yaw` and `pitch` are the authored
    /// `[View]` tangents.
    pub fn legacy(frame: &LegacyFrame, yaw: f64, pitch: f64) -> Self {
        let half_w = 0.5 * frame.world_width;
        let half_h = 0.5 * frame.world_height;
        Self {
            bottom_left: DVec3::new(-half_w, -half_h, EYE_DISTANCE),
            top_right: DVec3::new(half_w, half_h, EYE_DISTANCE),
            yaw: yaw.atan(),
            pitch: pitch.atan() + UP_DOWN_ANGLE_CONSTANT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    #[test]
    fn test_centred_panel_is_symmetric() {
        let calibration = PanelCalibration {
            center: DVec2::new(512.0, 512.0),
            origin: DVec2::new(512.0, 512.0),
            ..Default::default()
        };
        let viewport = ViewportState::from_vertical_fov(1.0, 45.0);
        let camera = CameraRestriction::calibrated(&calibration, &viewport);

        assert!((camera.bottom_left.x + camera.top_right.x).abs() < 1e-12);
        assert!((camera.bottom_left.y + camera.top_right.y).abs() < 1e-12);
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.0);
    }

    #[test]
    fn test_origin_offset_turns_driver() {
        let calibration = PanelCalibration {
            center: DVec2::new(512.0, 512.0),
            origin: DVec2::new(256.0, 600.0),
            ..Default::default()
        };
        let camera = CameraRestriction::calibrated(&calibration, &ViewportState::default());
        assert!(camera.yaw > 0.0);
        assert!(camera.pitch > 0.0);
    }

    #[test]
    fn test_legacy_pitch_constant() {
        let frame = LegacyFrame::new(&ViewportState::default(), DVec3::ZERO);
        let camera = CameraRestriction::legacy(&frame, 0.0, 0.0);
        assert_eq!(camera.pitch, UP_DOWN_ANGLE_CONSTANT);
        assert_eq!(camera.bottom_left.z, EYE_DISTANCE);
        assert!((camera.top_right.x - 0.5 * frame.world_width).abs() < 1e-12);
    }
}
