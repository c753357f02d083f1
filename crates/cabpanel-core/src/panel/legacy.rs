//! Legacy panels (`panel.cfg`).
//!
//! Instruments are authored in a fixed 480×440 frame. Section and key names
//! may also be written in Japanese, as in the original authoring tools.

use glam::DVec2;
use std::f64::consts::PI;
use std::path::PathBuf;

use super::common::{frame_count, horizontal_frame, radial_sweep, vertical_frame, AngleMap, BuildContext};
use super::{check_preamble, run_sections, PanelOutcome};
use crate::cfg::{
    read_section, split_arguments, Color24, Color32, Field, FieldContext, PanelSource, Section,
    SectionSchema, Tokenized,
};
use crate::element::{
    ElementKind, ElementState, ElementStep, Material, Mesh, PanelElement, RotationBinding,
};
use crate::geometry::{CameraRestriction, LegacyFrame, LegacySpace, PanelRect, PanelSpace, STACK_DISTANCE};
use crate::host::{LoadContext, TextureParameters};
use crate::options::{BrakeHandle, CompileOptions};

/// ATC signal speeds in km/h, by frame of the ATC sheet.
const ATC_SPEEDS: [f64; 12] = [0.0, 0.0, 15.0, 25.0, 45.0, 55.0, 65.0, 75.0, 90.0, 100.0, 110.0, 120.0];

const KPA: f64 = 1000.0;
const KGF_PER_CM2: f64 = 98066.5;

fn layer(n: u32) -> f64 {
    f64::from(n) * STACK_DISTANCE
}

fn keyed() -> TextureParameters {
    TextureParameters::keyed(Color24::BLUE)
}

fn set_point(target: &mut DVec2, ctx: &mut FieldContext<'_, '_>, value: &str) {
    let args = split_arguments(value);
    if args.len() < 2 {
        ctx.error("Two arguments are expected");
        return;
    }
    if let Some(x) = ctx.number("X", &args[0]) {
        target.x = x;
    }
    if let Some(y) = ctx.number("Y", &args[1]) {
        target.y = y;
    }
}

fn set_number(target: &mut f64, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.number("Value", value) {
        *target = v;
    }
}

fn set_positive(target: &mut f64, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.number("Value", value) {
        if v > 0.0 {
            *target = v;
        } else {
            ctx.error("Value is expected to be positive");
        }
    }
}

fn set_angle(target: &mut f64, ctx: &mut FieldContext<'_, '_>, value: &str) {
    if let Some(v) = ctx.degrees(value) {
        *target = v;
    }
}

/// `0` selects needles, `1` an LED sweep.
fn set_led(target: &mut bool, ctx: &mut FieldContext<'_, '_>, value: &str) {
    match ctx.integer("Type", value) {
        Some(0) => *target = false,
        Some(1) => *target = true,
        Some(_) => ctx.error("Type is expected to be either 0 or 1"),
        None => {}
    }
}

fn parse_rgb(ctx: &mut FieldContext<'_, '_>, args: &[String]) -> Option<Color32> {
    if args.len() < 3 {
        ctx.error("Three color components are expected");
        return None;
    }
    let mut rgb = [0u8; 3];
    for (i, name) in ["Red", "Green", "Blue"].into_iter().enumerate() {
        let v = ctx.integer(name, &args[i])?;
        if !(0..=255).contains(&v) {
            ctx.error(format!("{} is required to be within the range from 0 to 255", name));
        }
        rgb[i] = v.clamp(0, 255) as u8;
    }
    Some(Color32::new(rgb[0], rgb[1], rgb[2], 255))
}

/// Background or cover image drawn at its own size around a centre point.
fn centered_image(
    build: &mut BuildContext<'_>,
    section: &Section<'_>,
    space: &dyn PanelSpace,
    path: &std::path::Path,
    center: DVec2,
    depth: f64,
    kind: ElementKind,
) -> Option<ElementStep> {
    let params = keyed();
    let (texture, size) = build.texture(section, path, &params)?;
    let rect = PanelRect::new(center.x - 0.5 * size.x, center.y - 0.5 * size.y, size.x, size.y);
    let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
    let (_, state) = build.quad_state(section, space, &rect, DVec2::splat(0.5), depth, material);
    Some(ElementStep::NewElement(PanelElement::new(kind, state)))
}

/// Needle or clock hand from the compatibility folder, spanning `2·radius`.
#[allow(clippy::too_many_arguments)]
fn hand(
    build: &mut BuildContext<'_>,
    section: &Section<'_>,
    space: &dyn PanelSpace,
    image: &str,
    center: DVec2,
    radius: f64,
    depth: f64,
    color: Color32,
    kind: ElementKind,
    function: String,
) -> Option<ElementStep> {
    let path = build.compatibility_image(section, image)?;
    let (texture, size) = build.texture(section, &path, &TextureParameters::default())?;
    let aspect = if size.y == 0.0 { 1.0 } else { size.x / size.y };
    let rect = PanelRect::new(
        center.x - radius * aspect,
        center.y - radius,
        2.0 * radius * aspect,
        2.0 * radius,
    );
    let (_, state) = build.quad_state(
        section,
        space,
        &rect,
        DVec2::splat(0.5),
        depth,
        Material::new(Some(texture), None, color),
    );
    let mut element = PanelElement::new(kind, state);
    element.rotation = Some(RotationBinding::needle(function));
    Some(ElementStep::NewElement(element))
}

/// LED sweep filling a disc of `radius`.
#[allow(clippy::too_many_arguments)]
fn led(
    space: &dyn PanelSpace,
    center: DVec2,
    radius: f64,
    depth: f64,
    color: Color32,
    kind: ElementKind,
    initial: f64,
    last: f64,
    function: String,
) -> ElementStep {
    let quad = space.compile_quad(&PanelRect::around(center, radius), DVec2::splat(0.5), depth);
    let state = ElementState {
        offset: quad.offset,
        mesh: Mesh::sweep_fan(Material::new(None, None, color)),
    };
    let mut element = PanelElement::new(kind, state);
    element.radial_sweep = Some(radial_sweep(&quad, initial, last, function));
    ElementStep::NewElement(element)
}

// ============================================================================
// [Panel] and [View]
// ============================================================================

#[derive(Debug, Default)]
struct PanelSection {
    background: Option<PathBuf>,
}

impl SectionSchema for PanelSection {
    const FIELDS: &'static [Field<Self>] = &[Field {
        keys: &["background", "背景"],
        set: |s, ctx, v| s.background = ctx.image(v),
    }];
}

impl PanelSection {
    /// Authored background, or `panel.bmp` next to the panel file.
    fn background_path(&self, build: &BuildContext<'_>) -> Option<PathBuf> {
        if self.background.is_some() {
            return self.background.clone();
        }
        let path = build
            .read
            .files
            .combine_path(build.read.train_dir, std::path::Path::new("panel.bmp"));
        build.read.files.file_exists(&path).then_some(path)
    }

    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, frame: &LegacyFrame, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(path) = self.background_path(build) else {
            return Vec::new();
        };
        let Some((texture, size)) = build.texture(section, &path, &keyed()) else {
            return Vec::new();
        };
        let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
        let (_, state) = build.quad_state(
            section,
            space,
            &PanelRect::new(0.0, frame.semi_height, size.x, size.y),
            DVec2::splat(0.5),
            0.0,
            material,
        );
        vec![ElementStep::NewElement(PanelElement::new(ElementKind::Background, state))]
    }
}

/// `[View]`: default view direction as tangents.
#[derive(Debug, Default)]
struct ViewSection {
    yaw: Option<f64>,
    pitch: Option<f64>,
}

impl SectionSchema for ViewSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["yaw"],
            set: |s, ctx, v| s.yaw = ctx.number("Yaw", v).or(s.yaw),
        },
        Field {
            keys: &["pitch"],
            set: |s, ctx, v| s.pitch = ctx.number("Pitch", v).or(s.pitch),
        },
    ];
}

// ============================================================================
// [PressureGauge]
// ============================================================================

/// Pressure a gauge needle follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pressure {
    BrakeCylinder,
    StraightAirPipe,
    BrakePipe,
    EqualizingReservoir,
    MainReservoir,
}

impl Pressure {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bc" | "ブレーキシリンダ" => Some(Pressure::BrakeCylinder),
            "sap" | "直通管" => Some(Pressure::StraightAirPipe),
            "bp" | "ブレーキ管" | "制動管" => Some(Pressure::BrakePipe),
            "er" | "釣り合い空気溜め" | "つりあい空気溜め" => Some(Pressure::EqualizingReservoir),
            "mr" | "元空気溜め" => Some(Pressure::MainReservoir),
            _ => None,
        }
    }

    /// Runtime variable, in pascal.
    fn variable(self) -> &'static str {
        match self {
            Pressure::BrakeCylinder => "brakecylinder",
            Pressure::StraightAirPipe => "straightairpipe",
            Pressure::BrakePipe => "brakepipe",
            Pressure::EqualizingReservoir => "equalizingreservoir",
            Pressure::MainReservoir => "mainreservoir",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PressureNeedle {
    pressure: Pressure,
    color: Color32,
}

fn parse_pressure_needle(ctx: &mut FieldContext<'_, '_>, value: &str) -> Option<PressureNeedle> {
    let args = split_arguments(value);
    let Some(pressure) = Pressure::parse(&args[0]) else {
        ctx.error(format!("Subject {} is not supported", args[0]));
        return None;
    };
    let color = if args.len() > 1 {
        parse_rgb(ctx, &args[1..])?
    } else {
        Color32::WHITE
    };
    Some(PressureNeedle { pressure, color })
}

#[derive(Debug)]
struct PressureGaugeSection {
    led: bool,
    lower_needle: Option<PressureNeedle>,
    upper_needle: Option<PressureNeedle>,
    center: DVec2,
    radius: f64,
    background: Option<PathBuf>,
    cover: Option<PathBuf>,
    unit_factor: f64,
    minimum: f64,
    maximum: f64,
    angle: f64,
}

impl Default for PressureGaugeSection {
    fn default() -> Self {
        Self {
            led: false,
            lower_needle: None,
            upper_needle: None,
            center: DVec2::ZERO,
            radius: 16.0,
            background: None,
            cover: None,
            unit_factor: KPA,
            minimum: 0.0,
            maximum: 1000.0,
            angle: 45.0f64.to_radians(),
        }
    }
}

impl SectionSchema for PressureGaugeSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["type", "形態"],
            set: |s, ctx, v| set_led(&mut s.led, ctx, v),
        },
        Field {
            keys: &["lowerneedle", "lowerhand", "下針"],
            set: |s, ctx, v| s.lower_needle = parse_pressure_needle(ctx, v).or(s.lower_needle),
        },
        Field {
            keys: &["upperneedle", "upperhand", "上針"],
            set: |s, ctx, v| s.upper_needle = parse_pressure_needle(ctx, v).or(s.upper_needle),
        },
        Field {
            keys: &["center", "中心"],
            set: |s, ctx, v| set_point(&mut s.center, ctx, v),
        },
        Field {
            keys: &["radius", "半径"],
            set: |s, ctx, v| set_positive(&mut s.radius, ctx, v),
        },
        Field {
            keys: &["background", "背景"],
            set: |s, ctx, v| s.background = ctx.image(v),
        },
        Field {
            keys: &["cover", "ふた"],
            set: |s, ctx, v| s.cover = ctx.image(v),
        },
        Field {
            keys: &["unit", "単位"],
            set: |s, ctx, v| match v.to_ascii_lowercase().as_str() {
                "kpa" => s.unit_factor = KPA,
                "kgf/cm2" | "kgf/cm^2" | "kgf/cm²" => s.unit_factor = KGF_PER_CM2,
                _ => ctx.error(format!("Unit {} is not supported", v)),
            },
        },
        Field {
            keys: &["minimum", "最小"],
            set: |s, ctx, v| set_number(&mut s.minimum, ctx, v),
        },
        Field {
            keys: &["maximum", "最大"],
            set: |s, ctx, v| set_number(&mut s.maximum, ctx, v),
        },
        Field {
            keys: &["angle", "角度"],
            set: |s, ctx, v| set_angle(&mut s.angle, ctx, v),
        },
    ];
}

impl PressureGaugeSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        if self.minimum == self.maximum {
            build.element_error(section, "Minimum and Maximum must not be equal");
            return Vec::new();
        }
        let mut steps = Vec::new();
        if let Some(background) = &self.background {
            steps.extend(centered_image(
                build,
                section,
                space,
                background,
                self.center,
                layer(3),
                ElementKind::PressureGauge,
            ));
        }

        let needles = [
            (self.lower_needle, "needle_pressuregauge_lower.png"),
            (self.upper_needle, "needle_pressuregauge_upper.png"),
        ];
        for (k, (needle, image)) in needles.into_iter().enumerate() {
            let Some(needle) = needle else { continue };
            let depth = layer(4 + k as u32);
            let (initial, last) = if self.led {
                (self.angle, 2.0 * PI - self.angle)
            } else {
                (self.angle - PI, PI - self.angle)
            };
            let function = AngleMap {
                initial,
                last,
                minimum: self.minimum * self.unit_factor,
                maximum: self.maximum * self.unit_factor,
            }
            .expression(needle.pressure.variable());

            if self.led {
                steps.push(led(
                    space,
                    self.center,
                    self.radius,
                    depth,
                    needle.color,
                    ElementKind::PressureGauge,
                    initial,
                    last,
                    function,
                ));
            } else {
                steps.extend(hand(
                    build,
                    section,
                    space,
                    image,
                    self.center,
                    self.radius,
                    depth,
                    needle.color,
                    ElementKind::PressureGauge,
                    function,
                ));
            }
        }

        if let Some(cover) = &self.cover {
            steps.extend(centered_image(
                build,
                section,
                space,
                cover,
                self.center,
                layer(6),
                ElementKind::PressureGauge,
            ));
        }
        steps
    }
}

// ============================================================================
// [Speedometer]
// ============================================================================

#[derive(Debug)]
struct SpeedometerSection {
    led: bool,
    background: Option<PathBuf>,
    cover: Option<PathBuf>,
    atc: Option<PathBuf>,
    atc_radius: Option<f64>,
    needle_color: Option<Color32>,
    center: DVec2,
    radius: f64,
    angle: f64,
    /// m/s
    maximum: f64,
}

impl Default for SpeedometerSection {
    fn default() -> Self {
        Self {
            led: false,
            background: None,
            cover: None,
            atc: None,
            atc_radius: None,
            needle_color: None,
            center: DVec2::ZERO,
            radius: 16.0,
            angle: 60.0f64.to_radians(),
            maximum: 120.0 / 3.6,
        }
    }
}

impl SectionSchema for SpeedometerSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["type", "形態"],
            set: |s, ctx, v| set_led(&mut s.led, ctx, v),
        },
        Field {
            keys: &["background", "背景"],
            set: |s, ctx, v| s.background = ctx.image(v),
        },
        Field {
            keys: &["cover", "ふた"],
            set: |s, ctx, v| s.cover = ctx.image(v),
        },
        Field {
            keys: &["atc"],
            set: |s, ctx, v| s.atc = ctx.image(v),
        },
        Field {
            keys: &["atcradius", "atc半径"],
            set: |s, ctx, v| s.atc_radius = ctx.number("Value", v).or(s.atc_radius),
        },
        Field {
            keys: &["needle", "針"],
            set: |s, ctx, v| s.needle_color = parse_rgb(ctx, &split_arguments(v)).or(s.needle_color),
        },
        Field {
            keys: &["center", "中心"],
            set: |s, ctx, v| set_point(&mut s.center, ctx, v),
        },
        Field {
            keys: &["radius", "半径"],
            set: |s, ctx, v| set_positive(&mut s.radius, ctx, v),
        },
        Field {
            keys: &["angle", "角度"],
            set: |s, ctx, v| set_angle(&mut s.angle, ctx, v),
        },
        Field {
            keys: &["maximum", "最大"],
            set: |s, ctx, v| {
                if let Some(kmph) = ctx.number("Value", v) {
                    if kmph > 0.0 {
                        s.maximum = kmph / 3.6;
                    } else {
                        ctx.error("Value is expected to be positive");
                    }
                }
            },
        },
    ];
}

impl SpeedometerSection {
    fn needle_map(&self) -> AngleMap {
        AngleMap {
            initial: self.angle - PI,
            last: PI - self.angle,
            minimum: 0.0,
            maximum: self.maximum,
        }
    }

    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let mut steps = Vec::new();
        if let Some(background) = &self.background {
            steps.extend(centered_image(
                build,
                section,
                space,
                background,
                self.center,
                layer(3),
                ElementKind::Speedometer,
            ));
        }
        if let Some(atc) = &self.atc {
            steps.extend(self.build_atc(section, space, build, atc));
        }

        if self.led {
            let (initial, last) = (self.angle, 2.0 * PI - self.angle);
            let map = AngleMap {
                initial,
                last,
                minimum: 0.0,
                maximum: self.maximum,
            };
            steps.push(led(
                space,
                self.center,
                self.radius,
                layer(5),
                self.needle_color.unwrap_or(Color32::BLACK),
                ElementKind::Speedometer,
                initial,
                last,
                map.expression("speedometer abs"),
            ));
        } else {
            steps.extend(hand(
                build,
                section,
                space,
                "needle_speedometer.png",
                self.center,
                self.radius,
                layer(5),
                self.needle_color.unwrap_or(Color32::WHITE),
                ElementKind::Speedometer,
                self.needle_map().expression("speedometer abs"),
            ));
        }

        if let Some(cover) = &self.cover {
            steps.extend(centered_image(
                build,
                section,
                space,
                cover,
                self.center,
                layer(6),
                ElementKind::Speedometer,
            ));
        }
        steps
    }

    /// ATC lamps: one element whose states sit on the dial at their speeds.
    fn build_atc(
        &self,
        section: &Section<'_>,
        space: &dyn PanelSpace,
        build: &mut BuildContext<'_>,
        atc: &std::path::Path,
    ) -> Vec<ElementStep> {
        let Some(sheet) = build.image_size(section, atc) else {
            return Vec::new();
        };
        let frames = frame_count(sheet.x, sheet.y).min(ATC_SPEEDS.len());
        let radius = self.atc_radius.unwrap_or(0.8 * self.radius);
        let (a1, a0) = self.needle_map().coefficients();
        let base = keyed();

        let mut steps = Vec::with_capacity(frames);
        for (k, kmph) in ATC_SPEEDS.iter().enumerate().take(frames) {
            let theta = a1.mul_add(kmph / 3.6, a0);
            let at = self.center + radius * DVec2::new(theta.sin(), -theta.cos());
            let params = horizontal_frame(&base, sheet.y, sheet.y, k);
            let Some((texture, _)) = build.texture(section, atc, &params) else {
                break;
            };
            let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
            let (_, state) = build.quad_state(
                section,
                space,
                &PanelRect::around(at, 0.5 * sheet.y),
                DVec2::splat(0.5),
                layer(4),
                material,
            );
            let step = if steps.is_empty() {
                ElementStep::NewElement(
                    PanelElement::new(ElementKind::Speedometer, state).with_state_function("271 pluginstate"),
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
// [DigitalIndicator]
// ============================================================================

#[derive(Debug)]
struct DigitalIndicatorSection {
    number: Option<PathBuf>,
    corner: DVec2,
    size: DVec2,
    /// Speed unit per m/s
    unit_factor: f64,
}

impl Default for DigitalIndicatorSection {
    fn default() -> Self {
        Self {
            number: None,
            corner: DVec2::ZERO,
            size: DVec2::ZERO,
            unit_factor: 3.6,
        }
    }
}

impl SectionSchema for DigitalIndicatorSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["number", "数字"],
            set: |s, ctx, v| s.number = ctx.image(v),
        },
        Field {
            keys: &["corner", "左上"],
            set: |s, ctx, v| set_point(&mut s.corner, ctx, v),
        },
        Field {
            keys: &["size", "サイズ"],
            set: |s, ctx, v| set_point(&mut s.size, ctx, v),
        },
        Field {
            keys: &["unit", "単位"],
            set: |s, ctx, v| match v.to_ascii_lowercase().as_str() {
                "km/h" | "kmph" => s.unit_factor = 3.6,
                "mph" => s.unit_factor = 2.2369362920544,
                "m/s" | "ms" => s.unit_factor = 1.0,
                _ => ctx.error(format!("Unit {} is not supported", v)),
            },
        },
    ];
}

impl DigitalIndicatorSection {
    fn digit_functions(&self) -> [String; 3] {
        let speed = format!("speedometer abs {} *", crate::subject::number(self.unit_factor));
        [
            format!("{} ~ 100 >= <> 100 quotient 10 mod 10 ?", speed),
            format!("{} ~ 10 >= <> 10 quotient 10 mod 10 ?", speed),
            format!("{} floor 10 mod", speed),
        ]
    }

    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(number) = &self.number else {
            build.element_error(section, "Number is required to be specified");
            return Vec::new();
        };
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            build.element_error(section, "Size is required to be positive");
            return Vec::new();
        }
        let Some(sheet) = build.image_size(section, number) else {
            return Vec::new();
        };
        let frames = frame_count(sheet.y, self.size.y);
        if frames == 0 {
            build.element_error(section, "Size is larger than the height of Number");
            return Vec::new();
        }

        let base = keyed();
        let mut steps = Vec::new();
        for (digit, function) in self.digit_functions().into_iter().enumerate() {
            let rect = PanelRect::new(
                self.corner.x + digit as f64 * self.size.x,
                self.corner.y,
                self.size.x,
                self.size.y,
            );
            let mut first = true;
            for k in 0..frames {
                let params = vertical_frame(&base, sheet.x, self.size.y, k);
                let Some((texture, _)) = build.texture(section, number, &params) else {
                    break;
                };
                let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
                let (_, state) = build.quad_state(section, space, &rect, DVec2::splat(0.5), layer(7), material);
                if first {
                    steps.push(ElementStep::NewElement(
                        PanelElement::new(ElementKind::DigitalIndicator, state).with_state_function(function.clone()),
                    ));
                    first = false;
                } else {
                    steps.push(ElementStep::AppendState(state));
                }
            }
        }
        steps
    }
}

// ============================================================================
// [PilotLamp]
// ============================================================================

#[derive(Debug, Default)]
struct PilotLampSection {
    turn_on: Option<PathBuf>,
    turn_off: Option<PathBuf>,
    corner: DVec2,
}

impl SectionSchema for PilotLampSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["turnon", "点灯"],
            set: |s, ctx, v| s.turn_on = ctx.image(v),
        },
        Field {
            keys: &["turnoff", "消灯"],
            set: |s, ctx, v| s.turn_off = ctx.image(v),
        },
        Field {
            keys: &["corner", "左上"],
            set: |s, ctx, v| set_point(&mut s.corner, ctx, v),
        },
    ];
}

impl PilotLampSection {
    fn state(
        &self,
        section: &Section<'_>,
        space: &dyn PanelSpace,
        build: &mut BuildContext<'_>,
        path: &std::path::Path,
    ) -> Option<ElementState> {
        let (texture, size) = build.texture(section, path, &keyed())?;
        let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
        let rect = PanelRect::new(self.corner.x, self.corner.y, size.x, size.y);
        Some(build.quad_state(section, space, &rect, DVec2::splat(0.5), layer(2), material).1)
    }

    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(turn_on) = &self.turn_on else {
            build.element_error(section, "TurnOn is required to be specified");
            return Vec::new();
        };
        let Some(on) = self.state(section, space, build, turn_on) else {
            return Vec::new();
        };
        let mut steps = vec![ElementStep::NewElement(
            PanelElement::new(ElementKind::PilotLamp, on).with_state_function("doors 0 !="),
        )];
        if let Some(turn_off) = &self.turn_off {
            if let Some(off) = self.state(section, space, build, turn_off) {
                steps.push(ElementStep::AppendState(off));
            }
        }
        steps
    }
}

// ============================================================================
// [Watch]
// ============================================================================

#[derive(Debug)]
struct WatchSection {
    background: Option<PathBuf>,
    needle_color: Color32,
    center: DVec2,
    radius: f64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            background: None,
            needle_color: Color32::BLACK,
            center: DVec2::ZERO,
            radius: 16.0,
        }
    }
}

impl SectionSchema for WatchSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["background", "背景"],
            set: |s, ctx, v| s.background = ctx.image(v),
        },
        Field {
            keys: &["needle", "針"],
            set: |s, ctx, v| {
                if let Some(c) = parse_rgb(ctx, &split_arguments(v)) {
                    s.needle_color = c;
                }
            },
        },
        Field {
            keys: &["center", "中心"],
            set: |s, ctx, v| set_point(&mut s.center, ctx, v),
        },
        Field {
            keys: &["radius", "半径"],
            set: |s, ctx, v| set_positive(&mut s.radius, ctx, v),
        },
    ];
}

impl WatchSection {
    const HANDS: [(&'static str, &'static str); 3] = [
        ("needle_hour.png", "time 0.000277777777777778 * 0.523598775598299 *"),
        ("needle_minute.png", "time 0.0166666666666667 * floor 0.10471975511966 *"),
        ("needle_second.png", "time floor 0.10471975511966 *"),
    ];

    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let mut steps = Vec::new();
        if let Some(background) = &self.background {
            steps.extend(centered_image(
                build,
                section,
                space,
                background,
                self.center,
                layer(3),
                ElementKind::Clock,
            ));
        }
        for (k, (image, function)) in Self::HANDS.into_iter().enumerate() {
            steps.extend(hand(
                build,
                section,
                space,
                image,
                self.center,
                self.radius,
                layer(4 + k as u32),
                self.needle_color,
                ElementKind::Clock,
                function.to_string(),
            ));
        }
        steps
    }
}

// ============================================================================
// [BrakeIndicator]
// ============================================================================

#[derive(Debug, Default)]
struct BrakeIndicatorSection {
    image: Option<PathBuf>,
    corner: DVec2,
    width: f64,
}

impl SectionSchema for BrakeIndicatorSection {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            keys: &["image", "画像"],
            set: |s, ctx, v| s.image = ctx.image(v),
        },
        Field {
            keys: &["corner", "左上"],
            set: |s, ctx, v| set_point(&mut s.corner, ctx, v),
        },
        Field {
            keys: &["width", "幅"],
            set: |s, ctx, v| set_positive(&mut s.width, ctx, v),
        },
    ];
}

/// State selector of the brake indicator for a brake handle.
pub fn brake_indicator_function(brake: BrakeHandle) -> String {
    match brake {
        BrakeHandle::AutomaticAir => "emergencyBrake 3 brakeNotch ?".to_string(),
        BrakeHandle::Notched {
            max_notch,
            hold_brake: true,
        } => format!(
            "emergencyBrake {} holdBrake 1 brakeNotch 0 > brakeNotch 1 + 0 ? ? ?",
            max_notch + 2
        ),
        BrakeHandle::Notched {
            max_notch,
            hold_brake: false,
        } => format!("emergencyBrake {} brakeNotch ?", max_notch + 1),
    }
}

impl BrakeIndicatorSection {
    fn build(&self, section: &Section<'_>, space: &dyn PanelSpace, build: &mut BuildContext<'_>) -> Vec<ElementStep> {
        let Some(image) = &self.image else {
            build.element_error(section, "Image is required to be specified");
            return Vec::new();
        };
        if self.width <= 0.0 {
            build.element_error(section, "Width is required to be specified");
            return Vec::new();
        }
        let Some(sheet) = build.image_size(section, image) else {
            return Vec::new();
        };
        let frames = frame_count(sheet.x, self.width);
        if frames == 0 {
            build.element_error(section, "Width is larger than the width of Image");
            return Vec::new();
        }

        let function = brake_indicator_function(build.options.train.brake);
        let rect = PanelRect::new(self.corner.x, self.corner.y, self.width, sheet.y);
        let base = keyed();
        let mut steps = Vec::with_capacity(frames);
        for k in 0..frames {
            let params = horizontal_frame(&base, self.width, sheet.y, k);
            let Some((texture, _)) = build.texture(section, image, &params) else {
                break;
            };
            let material = Material::new(Some(texture), None, Color32::WHITE).keyed(Color24::BLUE);
            let (_, state) = build.quad_state(section, space, &rect, DVec2::splat(0.5), layer(2), material);
            let step = if steps.is_empty() {
                ElementStep::NewElement(
                    PanelElement::new(ElementKind::BrakeIndicator, state).with_state_function(function.clone()),
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
// Compile
// ============================================================================

fn is_panel(name: &str) -> bool {
    matches!(name, "panel" | "パネル")
}

fn is_view(name: &str) -> bool {
    matches!(name, "view" | "視点")
}

/// Compile a tokenized `panel.cfg`.
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

    // Header sections fix the frame and the view before any instrument
    let mut panels = Vec::new();
    let mut yaw = 0.0;
    let mut pitch = 0.0;
    for section in &tokens.sections {
        let name = section.name_lower();
        if is_panel(&name) {
            panels.push(read_section::<PanelSection>(section, &mut build.read));
        } else if is_view(&name) {
            let view: ViewSection = read_section(section, &mut build.read);
            yaw = view.yaw.unwrap_or(yaw);
            pitch = view.pitch.unwrap_or(pitch);
        }
    }

    let mut frame = LegacyFrame::new(&options.viewport, options.driver);
    let background_height = panels
        .last()
        .and_then(|p| p.background_path(&build))
        .and_then(|path| build.textures.image_dimensions(&path));
    if let Some((_, h)) = background_height {
        frame = frame.with_background_height(f64::from(h));
    }
    let frame = frame;

    let camera = CameraRestriction::legacy(&frame, yaw, pitch);
    let space = LegacySpace {
        frame,
        driver: options.driver,
    };
    let mut panels = panels.into_iter();

    let (elements_added, cancelled) = run_sections(
        tokens,
        source.lines.len(),
        options.car,
        &mut *ctx.signal,
        &mut *ctx.sink,
        |section| {
            let name = section.name_lower();
            match name.as_str() {
                n if is_panel(n) => panels
                    .next()
                    .map(|p| p.build(section, &space, &frame, &mut build))
                    .unwrap_or_default(),
                n if is_view(n) => Vec::new(),
                "pressuregauge" | "pressuremeter" | "pressureindicator" | "圧力計" => {
                    read_section::<PressureGaugeSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                "speedometer" | "speedindicator" | "速度計" => {
                    read_section::<SpeedometerSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                "digitalindicator" | "デジタル速度計" => {
                    read_section::<DigitalIndicatorSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                "pilotlamp" | "知らせ灯" => {
                    read_section::<PilotLampSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                "watch" | "時計" => {
                    read_section::<WatchSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                "brakeindicator" | "ブレーキ表示灯" => {
                    read_section::<BrakeIndicatorSection>(section, &mut build.read).build(section, &space, &mut build)
                }
                _ => {
                    tracing::debug!("skipping unknown section [{}] at line {}", section.name, section.line);
                    Vec::new()
                }
            }
        },
    );

    PanelOutcome {
        camera,
        elements_added,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_brake_indicator_functions() {
        assert_eq!(
            brake_indicator_function(BrakeHandle::AutomaticAir),
            "emergencyBrake 3 brakeNotch ?"
        );
        assert_eq!(
            brake_indicator_function(BrakeHandle::Notched {
                max_notch: 8,
                hold_brake: false
            }),
            "emergencyBrake 9 brakeNotch ?"
        );
        assert_eq!(
            brake_indicator_function(BrakeHandle::Notched {
                max_notch: 7,
                hold_brake: true
            }),
            "emergencyBrake 9 holdBrake 1 brakeNotch 0 > brakeNotch 1 + 0 ? ? ?"
        );
    }

    #[test]
    fn test_pressure_names() {
        assert_eq!(Pressure::parse("BC"), Some(Pressure::BrakeCylinder));
        assert_eq!(Pressure::parse("元空気溜め"), Some(Pressure::MainReservoir));
        assert_eq!(Pressure::parse("制動管"), Some(Pressure::BrakePipe));
        assert_eq!(Pressure::parse("xyz"), None);
        assert_eq!(Pressure::EqualizingReservoir.variable(), "equalizingreservoir");
    }

    #[test]
    fn test_digit_functions_follow_unit() {
        let section = DigitalIndicatorSection {
            unit_factor: 1.0,
            ..Default::default()
        };
        let [hundreds, tens, units] = section.digit_functions();
        assert_eq!(hundreds, "speedometer abs 1 * ~ 100 >= <> 100 quotient 10 mod 10 ?");
        assert_eq!(tens, "speedometer abs 1 * ~ 10 >= <> 10 quotient 10 mod 10 ?");
        assert_eq!(units, "speedometer abs 1 * floor 10 mod");
    }

    #[test]
    fn test_speedometer_needle_map_spans_dial() {
        let speedometer = SpeedometerSection::default();
        let (a1, a0) = speedometer.needle_map().coefficients();
        assert!((a0 - (60.0f64.to_radians() - PI)).abs() < 1e-12);
        assert!((a1.mul_add(120.0 / 3.6, a0) - (PI - 60.0f64.to_radians())).abs() < 1e-12);
    }
}
