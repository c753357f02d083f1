//! Compile options: screen, driver and train facts a panel is compiled against.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cfg::{PanelError, TextEncoding};
use crate::geometry::ViewportState;

/// Brake handle of the train, which decides the brake indicator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrakeHandle {
    /// Automatic air brake with release/lap/service positions
    AutomaticAir,
    /// Electric command brake with numbered notches
    Notched {
        max_notch: u32,
        #[serde(default)]
        hold_brake: bool,
    },
}

impl Default for BrakeHandle {
    fn default() -> Self {
        BrakeHandle::Notched {
            max_notch: 8,
            hold_brake: false,
        }
    }
}

/// Train facts that affect panel compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainInfo {
    /// Number of cars, for door subject range checks
    pub cars: usize,
    /// Brake handle type, for brake subjects and indicators
    pub brake: BrakeHandle,
}

impl Default for TrainInfo {
    fn default() -> Self {
        Self {
            cars: 1,
            brake: BrakeHandle::default(),
        }
    }
}

/// Everything a compile needs besides the panel file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Screen and field of view
    pub viewport: ViewportState,
    /// Driver eye position relative to the car
    pub driver: DVec3,
    /// Car whose section receives the elements
    pub car: usize,
    /// Train-wide facts subjects depend on
    pub train: TrainInfo,
    /// Folder holding the stock needle and hand images used by legacy panels
    pub compatibility_folder: PathBuf,
    /// Text encoding of the panel file
    pub encoding: TextEncoding,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            viewport: ViewportState::default(),
            driver: DVec3::new(0.0, 1.0, 0.0),
            car: 0,
            train: TrainInfo::default(),
            compatibility_folder: PathBuf::from("Compatibility"),
            encoding: TextEncoding::Auto,
        }
    }
}

impl CompileOptions {
    /// Load options from a JSON file; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PanelError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PanelError::IoError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| PanelError::InvalidOptions {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save options as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PanelError> {
        let path = path.as_ref();
        let io_error = |message: String| PanelError::IoError {
            path: path.display().to_string(),
            message,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| io_error(e.to_string()))?;
        fs::write(path, json).map_err(|e| io_error(e.to_string()))
    }
}
