mod common;

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

use cabpanel_core::host::WrapMode;
use cabpanel_core::prelude::*;
use common::{compile_text, compile_with_signal, eval, FakeTrain};
use pretty_assertions::assert_eq;

fn train() -> FakeTrain {
    FakeTrain::default()
        .with_image("train/needle.bmp", 32, 64)
        .with_image("train/digits.bmp", 24, 160)
        .with_image("train/lamp.bmp", 20, 10)
        .with_image("train/panel.bmp", 1024, 1024)
        .with_image("train/bar.bmp", 100, 20)
}

const NEEDLE_PANEL: &str = "\
[This]
Resolution = 1024

[Needle]
Subject = kmph
Radius = 16
DaytimeImage = needle.bmp
Minimum = 0
Maximum = 160
InitialAngle = -90
LastAngle = 90
";

#[test]
fn test_needle_panel_end_to_end() {
    let compiled = compile_text("panel2.cfg", NEEDLE_PANEL, &train(), &CompileOptions::default());

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(compiled.outcome.elements_added, 1);
    assert!(!compiled.outcome.cancelled);
    assert_eq!(compiled.kinds(), vec![ElementKind::Needle]);

    let rotation = compiled.elements[0].rotation.as_ref().unwrap();
    assert!(rotation.function.starts_with("speedometer abs 3.6 *"));
    assert_eq!(rotation.damping, None);
    assert_eq!(rotation.clamp, None);
}

#[test]
fn test_needle_angle_spans_range() {
    let compiled = compile_text("panel2.cfg", NEEDLE_PANEL, &train(), &CompileOptions::default());
    let function = &compiled.elements[0].rotation.as_ref().unwrap().function;

    let at = |speed: f64| eval(function, &HashMap::from([("speedometer", speed)])).unwrap();
    assert!((at(0.0) + FRAC_PI_2).abs() < 1e-9);
    assert!((at(160.0 / 3.6) - FRAC_PI_2).abs() < 1e-9);
    assert!(at(80.0 / 3.6).abs() < 1e-9);
}

#[test]
fn test_needle_without_image_is_skipped() {
    let text = "[Needle]\nSubject = kmph\nDaytimeImage = missing.bmp";
    let compiled = compile_text("panel2.cfg", text, &train(), &CompileOptions::default());

    assert_eq!(compiled.outcome.elements_added, 0);
    assert_eq!(compiled.count(DiagnosticKind::Resource), 1);
    assert_eq!(compiled.count(DiagnosticKind::Element), 1);
}

#[test]
fn test_background_is_first_element() {
    let text = "[This]\nDaytimeImage = panel.bmp\n[PilotLamp]\nSubject = ats8\nDaytimeImage = lamp.bmp";
    let compiled = compile_text("panel2.cfg", text, &train(), &CompileOptions::default());

    assert_eq!(compiled.kinds(), vec![ElementKind::Background, ElementKind::PilotLamp]);
    assert_eq!(
        compiled.elements[1].state_function.as_deref(),
        Some("8 pluginstate 1 == --")
    );
}

#[test]
fn test_unknown_subject_is_inert() {
    let text = "[PilotLamp]\nSubject = nonsense\nDaytimeImage = lamp.bmp";
    let compiled = compile_text("panel2.cfg", text, &train(), &CompileOptions::default());

    assert_eq!(compiled.elements.len(), 1);
    assert_eq!(compiled.elements[0].state_function.as_deref(), Some("0 1 == --"));
    assert_eq!(compiled.count(DiagnosticKind::Field), 1);
    let unknown = compiled.log.entries.iter().find(|d| d.kind == DiagnosticKind::Field).unwrap();
    assert_eq!(unknown.location.line, Some(2));
    assert_eq!(unknown.location.key.as_deref(), Some("Subject"));
}

#[test]
fn test_digit_strip_has_one_state_per_frame() {
    let text = "[DigitalNumber]\nSubject = kmph\nDaytimeImage = digits.bmp\nInterval = 16";
    let compiled = compile_text("panel2.cfg", text, &train(), &CompileOptions::default());

    assert_eq!(compiled.outcome.elements_added, 1);
    let element = &compiled.elements[0];
    assert_eq!(element.kind, ElementKind::DigitalNumber);
    assert_eq!(element.states.len(), 10);
    assert_eq!(element.state_function.as_deref(), Some("speedometer abs 3.6 *"));

    let clips: Vec<u32> = compiled
        .textures
        .registered
        .iter()
        .filter_map(|(_, params, _)| params.clip.map(|c| c.top))
        .collect();
    assert_eq!(clips, (0..10).map(|k| k * 16).collect::<Vec<_>>());
}

#[test]
fn test_digit_interval_is_whole_rows() {
    let text = "[DigitalNumber]\nSubject = kmph\nDaytimeImage = digits.bmp\nInterval = 16.4";
    let compiled = compile_text("panel2.cfg", text, &train(), &CompileOptions::default());

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    let element = &compiled.elements[0];
    assert_eq!(element.states.len(), 10);
    let heights: Vec<u32> = compiled
        .textures
        .registered
        .iter()
        .filter_map(|(_, params, _)| params.clip.map(|c| c.height))
        .collect();
    assert_eq!(heights, vec![16; 10]);
}

const DIGITAL_GAUGE: &str = "\
[DigitalGauge]
Subject = ms
Location = 100, 100
Radius = 20
Minimum = 0
Maximum = 100
InitialAngle = -90
LastAngle = 90
";

#[test]
fn test_digital_gauge_sweeps_between_angles() {
    let compiled = compile_text("panel2.cfg", DIGITAL_GAUGE, &train(), &CompileOptions::default());

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(compiled.kinds(), vec![ElementKind::DigitalGauge]);
    let sweep = compiled.elements[0].radial_sweep.as_ref().unwrap();
    assert!((sweep.initial_angle - (PI - FRAC_PI_2)).abs() < 1e-9);
    assert!((sweep.last_angle - (PI + FRAC_PI_2)).abs() < 1e-9);
    assert!(sweep.clockwise);

    let centroid = sweep.vectors[..4].iter().sum::<glam::DVec3>() * 0.25;
    assert!((sweep.vectors[4] - centroid).length() < 1e-9);

    let at = |speed: f64| eval(&sweep.function, &HashMap::from([("speedometer", speed)])).unwrap();
    assert!((at(0.0) - sweep.initial_angle).abs() < 1e-9);
    assert!((at(100.0) - sweep.last_angle).abs() < 1e-9);
    assert!((at(50.0) - PI).abs() < 1e-9);
}

#[test]
fn test_digital_gauge_step_quantizes_value() {
    let text = format!("{}Step = 5\n", DIGITAL_GAUGE);
    let compiled = compile_text("panel2.cfg", &text, &train(), &CompileOptions::default());
    let function = &compiled.elements[0].radial_sweep.as_ref().unwrap().function;

    assert!(function.contains(" 0.2 * floor 5 *"), "{}", function);
    let at = |speed: f64| eval(function, &HashMap::from([("speedometer", speed)])).unwrap();
    assert!((at(7.0) - at(5.0)).abs() < 1e-9);
    assert!(at(10.0) > at(9.0));
}

#[test]
fn test_digital_gauge_reversed_sweep_is_anticlockwise() {
    let text = DIGITAL_GAUGE.replace("InitialAngle = -90", "InitialAngle = 90").replace("LastAngle = 90", "LastAngle = -90");
    let compiled = compile_text("panel2.cfg", &text, &train(), &CompileOptions::default());

    assert!(!compiled.elements[0].radial_sweep.as_ref().unwrap().clockwise);
}

#[test]
fn test_digital_gauge_rejects_degenerate_sections() {
    let equal = DIGITAL_GAUGE.replace("Maximum = 100", "Maximum = 0");
    let flat = DIGITAL_GAUGE.replace("Radius = 20", "Radius = 0");

    for text in [equal, flat] {
        let compiled = compile_text("panel2.cfg", &text, &train(), &CompileOptions::default());
        assert_eq!(compiled.count(DiagnosticKind::Element), 1, "{}", text);
        assert!(compiled.elements.is_empty());
    }
}

const LINEAR_GAUGE: &str = "\
[LinearGauge]
Subject = ms
Location = 10, 10
Minimum = 0
Maximum = 10
Width = 50
Direction = 1, 0
DaytimeImage = bar.bmp
";

#[test]
fn test_linear_gauge_scrolls_texture() {
    let compiled = compile_text("panel2.cfg", LINEAR_GAUGE, &train(), &CompileOptions::default());

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(compiled.kinds(), vec![ElementKind::LinearGauge]);
    let shift = compiled.elements[0].texture_shift.as_ref().unwrap();
    assert_eq!(shift.direction, (1, 0));
    assert_eq!(shift.function, "speedometer abs 0 - 0.05 *");

    let (_, params, _) = &compiled.textures.registered[0];
    assert_eq!(params.wrap_u, WrapMode::Repeat);
    assert_eq!(params.wrap_v, WrapMode::ClampToEdge);
}

#[test]
fn test_linear_gauge_rejects_degenerate_sections() {
    let inverted = LINEAR_GAUGE.replace("Maximum = 10", "Maximum = 0");
    let narrow = LINEAR_GAUGE.replace("Width = 50", "Width = 0");

    for text in [inverted, narrow] {
        let compiled = compile_text("panel2.cfg", &text, &train(), &CompileOptions::default());
        assert_eq!(compiled.count(DiagnosticKind::Element), 1, "{}", text);
        assert!(compiled.elements.is_empty());
    }
}

#[test]
fn test_unknown_section_changes_nothing() {
    let header = "[This]\nResolution = 1024\nLeft = 100\nRight = 924\n";
    let with_unknown = format!("{}[Speedometer2]\nResolution = 10\nLeft = 999\n", header);

    let plain = compile_text("panel2.cfg", header, &train(), &CompileOptions::default());
    let extra = compile_text("panel2.cfg", &with_unknown, &train(), &CompileOptions::default());

    assert_eq!(plain.outcome, extra.outcome);
    assert!(extra.log.is_empty());
}

#[test]
fn test_this_sections_apply_before_elements() {
    // A later [This] still calibrates an earlier element.
    let early = "[Timetable]\nLocation = 0, 0\nWidth = 100\nHeight = 100\n[This]\nResolution = 2048";
    let late = "[This]\nResolution = 2048\n[Timetable]\nLocation = 0, 0\nWidth = 100\nHeight = 100";

    let a = compile_text("panel2.cfg", early, &train(), &CompileOptions::default());
    let b = compile_text("panel2.cfg", late, &train(), &CompileOptions::default());

    assert_eq!(a.outcome.camera, b.outcome.camera);
    assert_eq!(a.elements[0].states, b.elements[0].states);
    assert!(a.elements[0].timetable);
}

#[test]
fn test_cancelled_compile_adds_nothing() {
    let flag = CancelFlag::default();
    flag.cancel();
    let mut signal = flag.clone();
    let compiled = compile_with_signal(
        "panel2.cfg",
        NEEDLE_PANEL,
        &train(),
        &CompileOptions::default(),
        &mut signal,
    );

    assert!(compiled.outcome.cancelled);
    assert_eq!(compiled.outcome.elements_added, 0);
    assert!(compiled.elements.is_empty());
}

#[test]
fn test_unsupported_version_is_reported() {
    let text = format!("Version 2.0\n{}", NEEDLE_PANEL);
    let compiled = compile_text("panel2.cfg", &text, &train(), &CompileOptions::default());

    assert_eq!(compiled.count(DiagnosticKind::Format), 1);
    assert_eq!(compiled.log.entries[0].location.line, Some(1));
    assert_eq!(compiled.outcome.elements_added, 1);
}
