//! Calibrated panels (`panel2.cfg`).
//!
//! `[This]` fixes the calibration and places the background; every other
//! section describes one instrument drawn on top of it.

use glam::DVec2;
use std::f64::consts::PI;
use std::path::PathBuf;

use super::common::{
    frame_count, radial_sweep, step_fragment, vertical_frame, AngleMap, BuildContext,
};
use super::{check_preamble, run_sections, PanelOutcome};
use crate::cfg::values::parse_flag;
use crate::cfg::{read_section, Color24, Color32, Field, FieldContext, PanelSource, Section, SectionSchema, Tokenized};
use crate::element::{
    Damping, ElementKind, ElementState, ElementStep, Material, Mesh, PanelElement,
    RotationBinding, TextureShift,
};
use crate::geometry::{CalibratedSpace, CameraRestriction, PanelCalibration, PanelRect, PanelSpace, STACK_DISTANCE};
use crate::host::{LoadContext, TextureParameters, WrapMode};
use crate::options::CompileOptions;

/// Fallback needle radius when the authored radius is zero.
const FALLBACK_RADIUS: f64 = 16.0;

fn set_pair(target: &mut DVec2, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some((x, y)) = ctx.number_pair(("X", "Y"), value) {
        if let Some(x) = x {
            target.x = x;
        }
        if let Some(y) = y {
            target.y = y;
        }
    }
}

fn set_optional_pair(target: &mut (Option<f64>, Option<f64>), ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some((x, y)) = ctx.number_pair(("X", "Y"), value) {
        if x.is_some() {
            target.0 = x;
        }
        if y.is_some() {
            target.1 = y;
        }
    }
}

fn set_number(target: &mut f64, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.number("Value", value) {
        *target = v;
    }
}

fn set_angle(target: &mut f64, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.degrees(value) {
        *target = v;
    }
}

fn set_layer(target: &mut i32, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.integer("LayerIndex", value) {
        *target = v;
    }
}

fn set_key(target: &mut Color24, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(c) = ctx.color24(value) {
        *target = c;
    }
}

fn set_tint(target: &mut Color32, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(c) = ctx.color32(value) {
        *target = c;
    }
}

fn depth(layer: i32) -> f64 {
    f64::from(layer) * STACK_DISTANCE
}

// ============================================================================
// [This]
// ============================================================================

#[derive(Debug, Default)]
struct ThisSection {
    resolution: Option<f64>,
    left: Option<f64>,
    right: Option<f64>,
    top: Option<f64>,
    bottom: Option<f64>,
    daytime_image: Option<PathBuf>,
    nighttime_image: Option<PathBuf>,
    transparent_color: Option<Color24>,
    center: (Option<f64>, Option<f64>),
    origin: (Option<f64>, Option<f64>),
}

impl SectionSchema for ThisSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["resolution"],
            set: |s, ctx, v| {
                if let Some(r) = ctx.number("Value", v) {
                    if r > 100.0 {
                        s.resolution = Some(r);
                    } else {
                        ctx.error("Value is expected to be greater than 100");
                    }
                }
            },
        },
        Field {
            keys: &["left"],
            set: |s, ctx, v| s.left = ctx.number("Left", v).or(s.left),
        },
        Field {
            keys: &["right"],
            set: |s, ctx, v| s.right = ctx.number("Right", v).or(s.right),
        },
        Field {
            keys: &["top"],
            set: |s, ctx, v| s.top = ctx.number("Top", v).or(s.top),
        },
        Field {
            keys: &["bottom"],
            set: |s, ctx, v| s.bottom = ctx.number("Bottom", v).or(s.bottom),
        },
        Field {
            keys: &["daytimeimage"],
            set: |s, ctx, v| s.daytime_image = ctx.image(v),
        },
        Field {
            keys: &["nighttimeimage"],
            set: |s, ctx, v| s.nighttime_image = ctx.image(v),
        },
        Field {
            keys: &["transparentcolor"],
            set: |s, ctx, v| s.transparent_color = ctx.color24(v).or(s.transparent_color),
        },
        Field {
            keys: &["center"],
            set: |s, ctx, v| set_optional_pair(&mut s.center, ctx, v),
        },
        Field {
            keys: &["origin"],
            set: |s, ctx, v| set_optional_pair(&mut s.origin, ctx, v),
        },
    ];
}

impl ThisSection {
    fn apply(&self, calibration: &mut PanelCalibration, build: &mut BuildContext<'_>) {
        let c = calibration;
        c.resolution = self.resolution.unwrap_or(c.resolution);
        c.left = self.left.unwrap_or(c.left);
        c.right = self.right.unwrap_or(c.right);
        c.top = self.top.unwrap_or(c.top);
        c.bottom = self.bottom.unwrap_or(c.bottom);
        c.transparent_color = self.transparent_color.unwrap_or(c.transparent_color);
        c.center.x = self.center.0.unwrap_or(c.center.x);
        c.center.y = self.center.1.unwrap_or(c.center.y);
        c.origin.x = self.origin.0.unwrap_or(c.origin.x);
        c.origin.y = self.origin.1.unwrap_or(c.origin.y);

        if let Some(day) = &self.daytime_image {
            if let Some((w, h)) = build.textures.image_dimensions(day) {
                c.bitmap_width = f64::from(w);
                c.bitmap_height = f64::from(h);
            }
        }
    }

    fn build(
        &self,
        section: &Section<'_>,
        space: &dyn PanelSpace,
        calibration: &PanelCalibration,
        build: &mut BuildContext<'_>,
    ) -> Vec<ElementStep> {
        let Some(day) = &self.daytime_image else {
            return Vec::new();
        };
        let params = TextureParameters::keyed(calibration.transparent_color);
        let Some((tday, size)) = build.texture(section, day, &params) else {
            return Vec::new();
        };
        let tnight = build.optional_texture(section, self.nighttime_image.as_deref(), &params);

        let material = Material::new(Some(tday), tnight, Color32::WHITE).keyed(calibration.transparent_color);
        let (_, state) = build.quad_state(
            section,
            space,
            &PanelRect::new(0.0, 0.0, size.x, size.y),
            DVec2::splat(0.5),
            0.0,
            material,
        );
        vec![ElementStep::NewElement(PanelElement::new(ElementKind::Background, state))]
    }
}

// ============================================================================
// [PilotLamp]
// ============================================================================

#[derive(Debug)]
struct PilotLampSection {
    subject: String,
    subject_line: Option<usize>,
    location: DVec2,
    daytime_image: Option<PathBuf>,
    nighttime_image: Option<PathBuf>,
    transparent_color: Color24,
    layer: i32,
}

impl Default for PilotLampSection {
    fn default() -> Self {
        Self {
            subject: "true".to_string(),
            subject_line: None,
            location: DVec2::ZERO,
            daytime_image: None,
            nighttime_image: None,
            transparent_color: Color24::BLUE,
            layer: 0,
        }
    }
}

impl SectionSchema for PilotLampSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["subject"],
            set: |s, ctx, v| {
                s.subject = v.to_string();
                s.subject_line = Some(ctx.line);
            },
        },
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["daytimeimage"],
            set: |s, ctx, v| s.daytime_image = ctx.image(v),
        },
        Field {
            keys: &["nighttimeimage"],
            set: |s, ctx, v| s.nighttime_image = ctx.image(v),
        },
        Field {
            keys: &["transparentcolor"],
            set: |s, ctx, v| set_key(&mut s.transparent_color, ctx, v),
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
    ];
}

impl PilotLampSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(day) = &self.daytime_image else {
            build.element_error(section, "DaytimeImage is required to be specified");
            return Vec::new();
        };
        let params = TextureParameters::keyed(self.transparent_color);
        let Some((tday, size)) = build.texture(section, day, &params) else {
            return Vec::new();
        };
        let tnight = build.optional_texture(section, self.nighttime_image.as_deref(), &params);

        let subject = build.subject(section, &self.subject, self.subject_line);
        let material = Material::new(Some(tday), tnight, Color32::WHITE).keyed(self.transparent_color);
        let (_, state) = build.quad_state(
            section,
            space,
            &PanelRect::new(self.location.x, self.location.y, size.x, size.y),
            DVec2::splat(0.5),
            depth(self.layer),
            material,
        );

        let element = PanelElement::new(ElementKind::PilotLamp, state)
            .with_state_function(format!("{} 1 == --", subject));
        vec![ElementStep::NewElement(element)]
    }
}

// ============================================================================
// [Needle]
// ============================================================================

#[derive(Debug)]
struct NeedleSection {
    subject: String,
    subject_line: Option<usize>,
    location: DVec2,
    radius: f64,
    daytime_image: Option<PathBuf>,
    nighttime_image: Option<PathBuf>,
    color: Color32,
    transparent_color: Color24,
    origin: (Option<f64>, Option<f64>),
    initial_angle: f64,
    last_angle: f64,
    minimum: f64,
    maximum: f64,
    natural_frequency: Option<f64>,
    damping_ratio: Option<f64>,
    layer: i32,
    backstop: bool,
    smoothed: bool,
}

impl Default for NeedleSection {
    fn default() -> Self {
        Self {
            subject: "true".to_string(),
            subject_line: None,
            location: DVec2::ZERO,
            radius: 0.0,
            daytime_image: None,
            nighttime_image: None,
            color: Color32::WHITE,
            transparent_color: Color24::BLUE,
            origin: (None, None),
            initial_angle: (-120.0f64).to_radians(),
            last_angle: 120.0f64.to_radians(),
            minimum: 0.0,
            maximum: 1000.0,
            natural_frequency: None,
            damping_ratio: None,
            layer: 0,
            backstop: false,
            smoothed: false,
        }
    }
}

fn non_negative(ctx: &mut FieldContext<'_, '_>, value: &str) -> Option<f64> {
    let v = ctx.number("Value", value)?;
    if v < 0.0 {
        ctx.error("Value is expected to be non-negative");
        return Some(v.abs());
    }
    Some(v)
}

impl SectionSchema for NeedleSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["subject"],
            set: |s, ctx, v| {
                s.subject = v.to_string();
                s.subject_line = Some(ctx.line);
            },
        },
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["radius"],
            set: |s, ctx, v| {
                if let Some(r) = ctx.number("Value", v) {
                    if r == 0.0 {
                        ctx.error("Value is expected to be non-zero");
                        s.radius = FALLBACK_RADIUS;
                    } else {
                        s.radius = r;
                    }
                }
            },
        },
        Field {
            keys: &["daytimeimage"],
            set: |s, ctx, v| s.daytime_image = ctx.image(v),
        },
        Field {
            keys: &["nighttimeimage"],
            set: |s, ctx, v| s.nighttime_image = ctx.image(v),
        },
        Field {
            keys: &["color"],
            set: |s, ctx, v| set_tint(&mut s.color, ctx, v),
        },
        Field {
            keys: &["transparentcolor"],
            set: |s, ctx, v| set_key(&mut s.transparent_color, ctx, v),
        },
        Field {
            keys: &["origin"],
            set: |s, ctx, v| set_optional_pair(&mut s.origin, ctx, v),
        },
        Field {
            keys: &["initialangle"],
            set: |s, ctx, v| set_angle(&mut s.initial_angle, ctx, v),
        },
        Field {
            keys: &["lastangle"],
            set: |s, ctx, v| set_angle(&mut s.last_angle, ctx, v),
        },
        Field {
            keys: &["minimum"],
            set: |s, ctx, v| set_number(&mut s.minimum, ctx, v),
        },
        Field {
            keys: &["maximum"],
            set: |s, ctx, v| set_number(&mut s.maximum, ctx, v),
        },
        Field {
            keys: &["naturalfreq"],
            set: |s, ctx, v| s.natural_frequency = non_negative(ctx, v).or(s.natural_frequency),
        },
        Field {
            keys: &["dampingratio"],
            set: |s, ctx, v| s.damping_ratio = non_negative(ctx, v).or(s.damping_ratio),
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
        Field {
            keys: &["backstop"],
            set: |s, _, v| s.backstop = parse_flag(v),
        },
        Field {
            keys: &["smoothed"],
            set: |s, _, v| s.smoothed = parse_flag(v),
        },
    ];
}

impl NeedleSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(day) = &self.daytime_image else {
            build.element_error(section, "DaytimeImage is required to be specified");
            return Vec::new();
        };
        if self.minimum == self.maximum {
            build.element_error(section, "Minimum and Maximum must not be equal");
            return Vec::new();
        }
        let params = TextureParameters::keyed(self.transparent_color);
        let Some((tday, size)) = build.texture(section, day, &params) else {
            return Vec::new();
        };
        let tnight = build.optional_texture(section, self.nighttime_image.as_deref(), &params);

        let origin_x = self.origin.0.unwrap_or(0.5 * size.x);
        let origin_y = self.origin.1.unwrap_or(0.5 * size.y);
        let pivot = DVec2::new(origin_x / size.x, origin_y / size.y);
        let n = if self.radius == 0.0 || origin_y == 0.0 {
            1.0
        } else {
            self.radius / origin_y
        };
        let scaled = size * n;
        let rect = PanelRect::new(
            self.location.x - pivot.x * scaled.x,
            self.location.y - pivot.y * scaled.y,
            scaled.x,
            scaled.y,
        );

        let material = Material::new(Some(tday), tnight, self.color).keyed(self.transparent_color);
        let (_, state) = build.quad_state(section, space, &rect, pivot, depth(self.layer), material);

        let subject = build.subject(section, &self.subject, self.subject_line);
        let map = AngleMap {
            initial: self.initial_angle,
            last: self.last_angle,
            minimum: self.minimum,
            maximum: self.maximum,
        };
        let mut rotation = RotationBinding::needle(map.expression(&subject));
        if let (Some(natural_frequency), Some(damping_ratio)) = (self.natural_frequency, self.damping_ratio) {
            rotation.damping = Some(Damping {
                natural_frequency,
                damping_ratio,
            });
        }
        if self.backstop {
            rotation.clamp = Some((self.initial_angle, self.last_angle));
        }
        rotation.smoothed = self.smoothed;

        let mut element = PanelElement::new(ElementKind::Needle, state);
        element.rotation = Some(rotation);
        vec![ElementStep::NewElement(element)]
    }
}

// ============================================================================
// [LinearGauge]
// ============================================================================

#[derive(Debug)]
struct LinearGaugeSection {
    subject: String,
    subject_line: Option<usize>,
    location: DVec2,
    minimum: f64,
    maximum: f64,
    width: f64,
    direction: (i32, i32),
    daytime_image: Option<PathBuf>,
    nighttime_image: Option<PathBuf>,
    transparent_color: Color24,
    layer: i32,
}

impl Default for LinearGaugeSection {
    fn default() -> Self {
        Self {
            subject: "true".to_string(),
            subject_line: None,
            location: DVec2::ZERO,
            minimum: 0.0,
            maximum: 0.0,
            width: 0.0,
            direction: (0, 0),
            daytime_image: None,
            nighttime_image: None,
            transparent_color: Color24::BLUE,
            layer: 0,
        }
    }
}

impl SectionSchema for LinearGaugeSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["subject"],
            set: |s, ctx, v| {
                s.subject = v.to_string();
                s.subject_line = Some(ctx.line);
            },
        },
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["minimum"],
            set: |s, ctx, v| set_number(&mut s.minimum, ctx, v),
        },
        Field {
            keys: &["maximum"],
            set: |s, ctx, v| set_number(&mut s.maximum, ctx, v),
        },
        Field {
            keys: &["width"],
            set: |s, ctx, v| set_number(&mut s.width, ctx, v),
        },
        Field {
            keys: &["direction"],
            set: |s, ctx, v| {
                if let Some((x, y)) = ctx.integer_pair(("X", "Y"), v) {
                    s.direction = (x.unwrap_or(s.direction.0), y.unwrap_or(s.direction.1));
                }
            },
        },
        Field {
            keys: &["daytimeimage"],
            set: |s, ctx, v| s.daytime_image = ctx.image(v),
        },
        Field {
            keys: &["nighttimeimage"],
            set: |s, ctx, v| s.nighttime_image = ctx.image(v),
        },
        Field {
            keys: &["transparentcolor"],
            set: |s, ctx, v| set_key(&mut s.transparent_color, ctx, v),
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
    ];
}

impl LinearGaugeSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(day) = &self.daytime_image else {
            build.element_error(section, "DaytimeImage is required to be specified");
            return Vec::new();
        };
        if self.maximum <= self.minimum {
            build.element_error(section, "Maximum is required to be greater than Minimum");
            return Vec::new();
        }
        if self.width <= 0.0 {
            build.element_error(section, "Width is required to be positive");
            return Vec::new();
        }

        let mut params = TextureParameters::keyed(self.transparent_color);
        if self.direction.0 != 0 {
            params.wrap_u = WrapMode::Repeat;
        }
        if self.direction.1 != 0 {
            params.wrap_v = WrapMode::Repeat;
        }
        let Some((tday, size)) = build.texture(section, day, &params) else {
            return Vec::new();
        };
        let tnight = build.optional_texture(section, self.nighttime_image.as_deref(), &params);

        let material = Material::new(Some(tday), tnight, Color32::WHITE).keyed(self.transparent_color);
        let (_, state) = build.quad_state(
            section,
            space,
            &PanelRect::new(self.location.x, self.location.y, size.x, size.y),
            DVec2::splat(0.5),
            depth(self.layer),
            material,
        );

        let subject = build.subject(section, &self.subject, self.subject_line);
        let scale = self.width / size.x / (self.maximum - self.minimum);
        let function = format!(
            "{} {} - {} *",
            subject,
            crate::subject::number(self.minimum),
            crate::subject::number(scale)
        );

        let mut element = PanelElement::new(ElementKind::LinearGauge, state);
        element.texture_shift = Some(TextureShift {
            direction: self.direction,
            function,
        });
        vec![ElementStep::NewElement(element)]
    }
}

// ============================================================================
// [DigitalNumber]
// ============================================================================

#[derive(Debug)]
struct DigitalNumberSection {
    subject: String,
    subject_line: Option<usize>,
    location: DVec2,
    daytime_image: Option<PathBuf>,
    nighttime_image: Option<PathBuf>,
    transparent_color: Color24,
    interval: f64,
    layer: i32,
}

impl Default for DigitalNumberSection {
    fn default() -> Self {
        Self {
            subject: "true".to_string(),
            subject_line: None,
            location: DVec2::ZERO,
            daytime_image: None,
            nighttime_image: None,
            transparent_color: Color24::BLUE,
            interval: 0.0,
            layer: 0,
        }
    }
}

impl SectionSchema for DigitalNumberSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["subject"],
            set: |s, ctx, v| {
                s.subject = v.to_string();
                s.subject_line = Some(ctx.line);
            },
        },
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["daytimeimage"],
            set: |s, ctx, v| s.daytime_image = ctx.image(v),
        },
        Field {
            keys: &["nighttimeimage"],
            set: |s, ctx, v| s.nighttime_image = ctx.image(v),
        },
        Field {
            keys: &["transparentcolor"],
            set: |s, ctx, v| set_key(&mut s.transparent_color, ctx, v),
        },
        Field {
            keys: &["interval"],
            set: |s, ctx, v| {
                // Frames are whole pixel rows
                if let Some(i) = ctx.integer("Height", v) {
                    if i > 0 {
                        s.interval = f64::from(i);
                    } else {
                        ctx.error("Height is expected to be positive");
                    }
                }
            },
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
    ];
}

impl DigitalNumberSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(day) = &self.daytime_image else {
            build.element_error(section, "DaytimeImage is required to be specified");
            return Vec::new();
        };
        if self.interval <= 0.0 {
            build.element_error(section, "Interval is required to be specified");
            return Vec::new();
        }
        let Some(sheet) = build.image_size(section, day) else {
            return Vec::new();
        };
        let frames = frame_count(sheet.y, self.interval);
        if frames == 0 {
            build.element_error(section, "Interval is larger than the height of DaytimeImage");
            return Vec::new();
        }
        let night_frames = match &self.nighttime_image {
            Some(night) => build
                .image_size(section, night)
                .map_or(0, |s| frame_count(s.y, self.interval)),
            None => 0,
        };

        let subject = build.subject(section, &self.subject, self.subject_line);
        let base = TextureParameters::keyed(self.transparent_color);
        let rect = PanelRect::new(self.location.x, self.location.y, sheet.x, self.interval);
        let mut steps = Vec::with_capacity(frames);

        for k in 0..frames {
            let params = vertical_frame(&base, sheet.x, self.interval, k);
            let Some((tday, _)) = build.texture(section, day, &params) else {
                break;
            };
            let tnight = if k < night_frames {
                build.optional_texture(section, self.nighttime_image.as_deref(), &params)
            } else {
                None
            };
            let material = Material::new(Some(tday), tnight, Color32::WHITE).keyed(self.transparent_color);
            let (_, state) = build.quad_state(section, space, &rect, DVec2::splat(0.5), depth(self.layer), material);

            let step = if steps.is_empty() {
                ElementStep::NewElement(
                    PanelElement::new(ElementKind::DigitalNumber, state).with_state_function(subject.clone()),
                )
            } else {
                ElementStep::AppendState(state)
            };
            steps.push(step);
        }
        steps
    }
}

// ============================================================================
// [DigitalGauge]
// ============================================================================

#[derive(Debug)]
struct DigitalGaugeSection {
    subject: String,
    subject_line: Option<usize>,
    location: DVec2,
    radius: f64,
    color: Color32,
    initial_angle: f64,
    last_angle: f64,
    minimum: f64,
    maximum: f64,
    step: f64,
    layer: i32,
}

impl Default for DigitalGaugeSection {
    fn default() -> Self {
        Self {
            subject: "true".to_string(),
            subject_line: None,
            location: DVec2::ZERO,
            radius: 0.0,
            color: Color32::BLACK,
            initial_angle: (-120.0f64).to_radians(),
            last_angle: 120.0f64.to_radians(),
            minimum: 0.0,
            maximum: 1000.0,
            step: 0.0,
            layer: 0,
        }
    }
}

impl SectionSchema for DigitalGaugeSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["subject"],
            set: |s, ctx, v| {
                s.subject = v.to_string();
                s.subject_line = Some(ctx.line);
            },
        },
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["radius"],
            set: |s, ctx, v| set_number(&mut s.radius, ctx, v),
        },
        Field {
            keys: &["color"],
            set: |s, ctx, v| set_tint(&mut s.color, ctx, v),
        },
        Field {
            keys: &["initialangle"],
            set: |s, ctx, v| set_angle(&mut s.initial_angle, ctx, v),
        },
        Field {
            keys: &["lastangle"],
            set: |s, ctx, v| set_angle(&mut s.last_angle, ctx, v),
        },
        Field {
            keys: &["minimum"],
            set: |s, ctx, v| set_number(&mut s.minimum, ctx, v),
        },
        Field {
            keys: &["maximum"],
            set: |s, ctx, v| set_number(&mut s.maximum, ctx, v),
        },
        Field {
            keys: &["step"],
            set: |s, ctx, v| set_number(&mut s.step, ctx, v),
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
    ];
}

impl DigitalGaugeSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        if self.radius == 0.0 {
            build.element_error(section, "Radius is required to be non-zero");
            return Vec::new();
        }
        if self.minimum == self.maximum {
            build.element_error(section, "Minimum and Maximum must not be equal");
            return Vec::new();
        }
        if (self.last_angle - self.initial_angle).abs() > 2.0 * PI {
            build.element_warning(section, "The angle range is larger than a full turn");
        }

        let quad = space.compile_quad(
            &PanelRect::around(self.location, self.radius),
            DVec2::splat(0.5),
            depth(self.layer),
        );
        let state = ElementState {
            offset: quad.offset,
            mesh: Mesh::sweep_fan(Material::new(None, None, self.color)),
        };

        let initial = self.initial_angle + PI;
        let last = self.last_angle + PI;
        let mut value = build.subject(section, &self.subject, self.subject_line);
        value.push_str(&step_fragment(self.step));
        let map = AngleMap {
            initial,
            last,
            minimum: self.minimum,
            maximum: self.maximum,
        };

        let mut element = PanelElement::new(ElementKind::DigitalGauge, state);
        element.radial_sweep = Some(radial_sweep(&quad, initial, last, map.expression(&value)));
        vec![ElementStep::NewElement(element)]
    }
}

// ============================================================================
// [Timetable]
// ============================================================================

#[derive(Debug, Default)]
struct TimetableSection {
    location: DVec2,
    width: f64,
    height: f64,
    layer: i32,
}

impl SectionSchema for TimetableSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["location"],
            set: |s, ctx, v| set_pair(&mut s.location, ctx, v),
        },
        Field {
            keys: &["width"],
            set: |s, ctx, v| set_number(&mut s.width, ctx, v),
        },
        Field {
            keys: &["height"],
            set: |s, ctx, v| set_number(&mut s.height, ctx, v),
        },
        Field {
            // accepted for compatibility; the timetable has no texture of its own
            keys: &["transparentcolor"],
            set: |_, ctx, v| {
                ctx.color24(v);
            },
        },
        Field {
            keys: &["layer"],
            set: |s, ctx, v| set_layer(&mut s.layer, ctx, v),
        },
    ];
}

impl TimetableSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let mut valid = true;
        if self.width <= 0.0 {
            build.element_error(section, "Width is required to be positive");
            valid = false;
        }
        if self.height <= 0.0 {
            build.element_error(section, "Height is required to be positive");
            valid = false;
        }
        if !valid {
            return Vec::new();
        }

        let (_, state) = build.quad_state(
            section,
            space,
            &PanelRect::new(self.location.x, self.location.y, self.width, self.height),
            DVec2::splat(0.5),
            depth(self.layer),
            Material::new(None, None, Color32::WHITE),
        );
        let mut element = PanelElement::new(ElementKind::Timetable, state).with_state_function("panel2timetable");
        element.timetable = true;
        vec![ElementStep::NewElement(element)]
    }
}

// ============================================================================
// Compile
// ============================================================================

/// Compile a tokenized `panel2.cfg`.
pub(super) fn compile(
    source: &PanelSource,
    tokens: &Tokenized<'_>,
    options: &CompileOptions,
    ctx: &mut LoadContext<'_>,
) -> PanelOutcome {
    let file_name = source.file_name();
    let mut build = BuildContext::new(
        &file_name,
        &source.train_dir,
        ctx.files,
        &mut *ctx.diagnostics,
        &mut *ctx.textures,
        options,
    );
    check_preamble(&tokens.preamble, &mut build.read);

    // The calibration is complete before any element is built
    let headers: Vec<ThisSection> = tokens
        .sections
        .iter()
        .filter(|s| s.name_lower() == "this")
        .map(|s| read_section(s, &mut build.read))
        .collect();
    let mut calibration = PanelCalibration::default();
    for header in &headers {
        header.apply(&mut calibration, &mut build);
    }
    let calibration = calibration;

    let camera = CameraRestriction::calibrated(&calibration, &options.viewport);
    let space = CalibratedSpace::new(&calibration, options.viewport, options.driver);
    let mut headers = headers.into_iter();

    let (elements_added, cancelled) = run_sections(
        tokens,
        source.lines.len(),
        options.car,
        &mut *ctx.signal,
        &mut *ctx.sink,
        |section| match section.name_lower().as_str() {
            "this" => headers
                .next()
                .map(|h| h.build(section, &space, &calibration, &mut build))
                .unwrap_or_default(),
            "pilotlamp" => read_section::<PilotLampSection>(section, &mut build.read).build(section, &space, &mut build),
            "needle" => read_section::<NeedleSection>(section, &mut build.read).build(section, &space, &mut build),
            "lineargauge" => {
                read_section::<LinearGaugeSection>(section, &mut build.read).build(section, &space, &mut build)
            }
            "digitalnumber" => {
                read_section::<DigitalNumberSection>(section, &mut build.read).build(section, &space, &mut build)
            }
            "digitalgauge" => {
                read_section::<DigitalGaugeSection>(section, &mut build.read).build(section, &space, &mut build)
            }
            "timetable" => read_section::<TimetableSection>(section, &mut build.read).build(section, &space, &mut build),
            _ => {
                tracing::debug!("skipping unknown section [{}] at line {}", section.name, section.line);
                Vec::new()
            }
        },
    );

    PanelOutcome {
        camera,
        elements_added,
        cancelled,
    }
}
