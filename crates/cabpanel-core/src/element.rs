//! Panel element model.
//!
//! A [`PanelElement`] is one instrument instance: a stack of selectable
//! [`ElementState`]s plus optional animation bindings. Bindings are postfix
//! expression strings; they are evaluated by the runtime, never here.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::cfg::{Color24, Color32};
use crate::host::{ElementSink, TextureHandle};

/// What kind of instrument an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Daytime/nighttime panel image
    Background,
    /// Two-state lamp
    PilotLamp,
    /// Rotating needle
    Needle,
    /// Scrolling bar texture
    LinearGauge,
    /// Digit strip, one state per frame
    DigitalNumber,
    /// LED-style radial sweep
    DigitalGauge,
    /// Surface for the custom timetable
    Timetable,
    /// Legacy pressure gauge needle
    PressureGauge,
    /// Legacy speedometer needle or LED sweep
    Speedometer,
    /// Legacy speed digits
    DigitalIndicator,
    /// Clock hand
    Clock,
    /// Legacy brake handle position strip
    BrakeIndicator,
}

/// Mesh vertex in element space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Element-space position
    pub position: DVec3,
    /// Texture coordinate, 0..1 per axis
    pub texcoord: DVec2,
}

/// Textures and tint of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Texture shown by day
    pub daytime: Option<TextureHandle>,
    /// Texture shown at night, blended with the daytime one
    pub nighttime: Option<TextureHandle>,
    /// Tint
    pub color: Color32,
    /// Set when the daytime texture uses a color key
    pub transparent_color: Option<Color24>,
}

impl Material {
    /// Untextured or textured material without a color key.
    pub fn new(daytime: Option<TextureHandle>, nighttime: Option<TextureHandle>, color: Color32) -> Self {
        Self {
            daytime,
            nighttime,
            color,
            transparent_color: None,
        }
    }

    /// Record the color key the daytime texture was registered with.
    pub fn keyed(mut self, key: Color24) -> Self {
        if self.daytime.is_some() {
            self.transparent_color = Some(key);
        }
        self
    }
}

/// Polygon mesh of one element state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex list shared by the faces
    pub vertices: Vec<Vertex>,
    /// Vertex indices per face
    pub faces: Vec<Vec<usize>>,
    /// Shared by every face
    pub material: Material,
}

impl Mesh {
    /// Single-face quad.
    pub fn quad(vertices: [Vertex; 4], material: Material) -> Self {
        Self {
            vertices: vertices.to_vec(),
            faces: vec![vec![0, 1, 2, 3]],
            material,
        }
    }

    /// Placeholder mesh for a radial sweep: 11 zeroed vertices in a
    /// five-triangle fan around vertex 0. The runtime fills the positions.
    pub fn sweep_fan(material: Material) -> Self {
        let zero = Vertex {
            position: DVec3::ZERO,
            texcoord: DVec2::ZERO,
        };
        Self {
            vertices: vec![zero; 11],
            faces: vec![
                vec![0, 1, 2],
                vec![0, 3, 4],
                vec![0, 5, 6],
                vec![0, 7, 8],
                vec![0, 9, 10],
            ],
            material,
        }
    }
}

/// One selectable pose of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    /// Eye-space position of the rotation pivot
    pub offset: DVec3,
    /// Geometry relative to the pivot
    pub mesh: Mesh,
}

/// Local frame a needle rotates in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationAxes {
    /// Right
    pub x: DVec3,
    /// Up
    pub y: DVec3,
    /// Rotation axis
    pub z: DVec3,
}

impl RotationAxes {
    /// Axes of a needle turning in the panel plane.
    pub fn needle() -> Self {
        let z = DVec3::new(0.0, 0.0, -1.0);
        let x = DVec3::new(1.0, 0.0, 0.0);
        Self { x, y: z.cross(x), z }
    }
}

/// Second-order spring damping of a needle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Damping {
    /// Radians per second
    pub natural_frequency: f64,
    /// 1.0 is critically damped
    pub damping_ratio: f64,
}

/// Needle rotation about the Z axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationBinding {
    /// Frame the angle turns in
    pub axes: RotationAxes,
    /// Postfix expression yielding the angle in radians
    pub function: String,
    /// Spring damping; none snaps to the target angle
    pub damping: Option<Damping>,
    /// Angle range the result is clamped to (needle backstop)
    pub clamp: Option<(f64, f64)>,
    /// Smooth the angle between frames
    pub smoothed: bool,
}

impl RotationBinding {
    /// Undamped, unclamped rotation about the needle axes.
    pub fn needle(function: String) -> Self {
        Self {
            axes: RotationAxes::needle(),
            function,
            damping: None,
            clamp: None,
            smoothed: false,
        }
    }
}

/// LED-style radial fill driven by an angle expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadialSweep {
    /// Angle at the minimum value, radians
    pub initial_angle: f64,
    /// Angle at the maximum value, radians
    pub last_angle: f64,
    /// Set when `initial_angle <= last_angle`
    pub clockwise: bool,
    /// The four quad corners followed by their centroid
    pub vectors: [DVec3; 5],
    /// Postfix expression yielding the sweep angle
    pub function: String,
}

/// Texture scrolling along a direction (linear gauges).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureShift {
    /// Scroll direction, each component -1, 0 or 1
    pub direction: (i32, i32),
    /// Postfix expression yielding the shift in texture widths
    pub function: String,
}

/// One instrument instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelElement {
    /// Instrument it belongs to
    pub kind: ElementKind,
    /// Visual states; `current_state` picks one
    pub states: Vec<ElementState>,
    /// State shown before the first evaluation
    pub current_state: usize,
    /// Postfix expression selecting the visible state (out of range hides the element)
    pub state_function: Option<String>,
    /// Needle rotation
    pub rotation: Option<RotationBinding>,
    /// Radial fill
    pub radial_sweep: Option<RadialSweep>,
    /// Scrolling texture
    pub texture_shift: Option<TextureShift>,
    /// Surface the custom timetable is drawn onto
    pub timetable: bool,
}

impl PanelElement {
    /// Element with a single state.
    pub fn new(kind: ElementKind, state: ElementState) -> Self {
        Self {
            kind,
            states: vec![state],
            current_state: 0,
            state_function: None,
            rotation: None,
            radial_sweep: None,
            texture_shift: None,
            timetable: false,
        }
    }

    /// Select the visible state with a postfix expression.
    pub fn with_state_function(mut self, function: impl Into<String>) -> Self {
        self.state_function = Some(function.into());
        self
    }
}

/// One output of an element builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementStep {
    /// A new element appended to the car
    NewElement(PanelElement),
    /// Another state for the element most recently appended to the car
    AppendState(ElementState),
}

/// Apply builder output to a sink, in order. Returns the number of new elements.
pub fn apply_steps(sink: &mut dyn ElementSink, car: usize, steps: Vec<ElementStep>) -> usize {
    let mut added = 0;
    for step in steps {
        match step {
            ElementStep::NewElement(element) => {
                sink.append_element(car, element);
                added += 1;
            }
            ElementStep::AppendState(state) => match sink.last_element(car) {
                Some(i) => sink.append_state(car, i, state),
                None => tracing::error!("no element to append a state to in car {}", car),
            },
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CarSections;

    fn state(x: f64) -> ElementState {
        ElementState {
            offset: DVec3::new(x, 0.0, 1.0),
            mesh: Mesh::quad(
                [Vertex {
                    position: DVec3::ZERO,
                    texcoord: DVec2::ZERO,
                }; 4],
                Material::new(None, None, Color32::WHITE),
            ),
        }
    }

    #[test]
    fn test_needle_axes_are_orthonormal() {
        let axes = RotationAxes::needle();
        assert_eq!(axes.y, DVec3::new(0.0, -1.0, 0.0));
        assert_eq!(axes.x.dot(axes.z), 0.0);
    }

    #[test]
    fn test_append_state_targets_last_element() {
        let mut sections = CarSections::new(1);
        let steps = vec![
            ElementStep::NewElement(PanelElement::new(ElementKind::Background, state(0.0))),
            ElementStep::NewElement(PanelElement::new(ElementKind::DigitalNumber, state(1.0))),
            ElementStep::AppendState(state(2.0)),
        ];
        let added = apply_steps(&mut sections, 0, steps);
        assert_eq!(added, 2);

        let elements = sections.elements(0);
        assert_eq!(elements[0].states.len(), 1);
        assert_eq!(elements[1].states.len(), 2);
        assert_eq!(elements[1].states[1].offset.x, 2.0);
    }

    #[test]
    fn test_sweep_fan_shape() {
        let mesh = Mesh::sweep_fan(Material::new(None, None, Color32::BLACK));
        assert_eq!(mesh.vertices.len(), 11);
        assert_eq!(mesh.faces.len(), 5);
        assert!(mesh.faces.iter().all(|f| f[0] == 0 && f.len() == 3));
    }
}
