mod common;

use std::collections::HashMap;
use std::f64::consts::PI;

use cabpanel_core::prelude::*;
use common::{compile_text, eval, FakeTrain};
use pretty_assertions::assert_eq;

fn train() -> FakeTrain {
    FakeTrain::default()
        .with_image("train/panel.bmp", 480, 200)
        .with_image("train/on.bmp", 12, 12)
        .with_image("train/off.bmp", 12, 12)
        .with_image("train/atc.bmp", 288, 24)
        .with_image("train/digits.bmp", 16, 176)
        .with_image("train/brake.bmp", 128, 32)
        .with_image("compat/needle_speedometer.png", 16, 64)
        .with_image("compat/needle_pressuregauge_lower.png", 16, 64)
}

fn compile(text: &str) -> common::Compiled {
    compile_text("panel.cfg", text, &train(), &CompileOptions::default())
}

#[test]
fn test_cab_with_lamp_and_speedometer() {
    let text = "\
[Panel]
Background = panel.bmp

[PilotLamp]
TurnOn = on.bmp
TurnOff = off.bmp
Corner = 10, 250

[Speedometer]
Center = 240, 340
Radius = 40
Maximum = 160
";
    let compiled = compile(text);

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(
        compiled.kinds(),
        vec![ElementKind::Background, ElementKind::PilotLamp, ElementKind::Speedometer]
    );

    let lamp = &compiled.elements[1];
    assert_eq!(lamp.states.len(), 2);
    assert_eq!(lamp.state_function.as_deref(), Some("doors 0 !="));

    let function = &compiled.elements[2].rotation.as_ref().unwrap().function;
    assert!(function.starts_with("speedometer abs "));
    let at = |speed: f64| eval(function, &HashMap::from([("speedometer", speed)])).unwrap();
    assert!((at(0.0) - (60.0f64.to_radians() - PI)).abs() < 1e-9);
    assert!((at(160.0 / 3.6) - (PI - 60.0f64.to_radians())).abs() < 1e-9);
}

#[test]
fn test_default_background_is_panel_bmp() {
    let compiled = compile("[Panel]\n");
    assert_eq!(compiled.kinds(), vec![ElementKind::Background]);
}

#[test]
fn test_japanese_sections_and_keys() {
    let compiled = compile("[速度計]\n中心 = 240, 340\n半径 = 40\n");
    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(compiled.kinds(), vec![ElementKind::Speedometer]);
}

#[test]
fn test_atc_lamps_share_one_element() {
    let compiled = compile("[Speedometer]\nAtc = atc.bmp\nCenter = 240, 340\nRadius = 40\n");

    assert_eq!(compiled.outcome.elements_added, 2);
    let atc = &compiled.elements[0];
    assert_eq!(atc.states.len(), 12);
    assert_eq!(atc.state_function.as_deref(), Some("271 pluginstate"));
    assert!(compiled.elements[1].rotation.is_some());
}

#[test]
fn test_led_pressure_gauge() {
    let text = "\
[PressureGauge]
Type = 1
LowerNeedle = bc, 255, 0, 0
Center = 100, 300
Radius = 30
Unit = kgf/cm2
Maximum = 10
";
    let compiled = compile(text);

    assert!(compiled.log.is_empty(), "{:?}", compiled.log.entries);
    assert_eq!(compiled.kinds(), vec![ElementKind::PressureGauge]);
    let sweep = compiled.elements[0].radial_sweep.as_ref().unwrap();
    assert!(sweep.function.starts_with("brakecylinder "));

    let at = |pa: f64| eval(&sweep.function, &HashMap::from([("brakecylinder", pa)])).unwrap();
    assert!((at(0.0) - PI / 4.0).abs() < 1e-9);
    assert!((at(10.0 * 98066.5) - (2.0 * PI - PI / 4.0)).abs() < 1e-9);
}

#[test]
fn test_pressure_needle_subject_must_be_known() {
    let compiled = compile("[PressureGauge]\nLowerNeedle = cylinder, 255, 0, 0\nCenter = 100, 300\n");
    assert_eq!(compiled.count(DiagnosticKind::Field), 1);
    assert!(compiled.elements.is_empty());
}

#[test]
fn test_digital_indicator_builds_three_digits() {
    let compiled = compile("[DigitalIndicator]\nNumber = digits.bmp\nCorner = 200, 300\nSize = 16, 16\nUnit = mph\n");

    assert_eq!(compiled.outcome.elements_added, 3);
    for element in &compiled.elements {
        assert_eq!(element.kind, ElementKind::DigitalIndicator);
        assert_eq!(element.states.len(), 11);
    }
    assert_eq!(
        compiled.elements[2].state_function.as_deref(),
        Some("speedometer abs 2.2369362920544 * floor 10 mod")
    );
}

#[test]
fn test_brake_indicator_follows_brake_handle() {
    let options = CompileOptions {
        train: TrainInfo {
            brake: BrakeHandle::AutomaticAir,
            ..Default::default()
        },
        ..Default::default()
    };
    let text = "[BrakeIndicator]\nImage = brake.bmp\nCorner = 0, 400\nWidth = 32\n";
    let compiled = compile_text("panel.cfg", text, &train(), &options);

    assert_eq!(compiled.outcome.elements_added, 1);
    let element = &compiled.elements[0];
    assert_eq!(element.states.len(), 4);
    assert_eq!(element.state_function.as_deref(), Some("emergencyBrake 3 brakeNotch ?"));
}

#[test]
fn test_missing_compatibility_hands_are_reported() {
    let compiled = compile("[Watch]\nCenter = 400, 300\nRadius = 20\n");
    assert!(compiled.elements.is_empty());
    assert_eq!(compiled.count(DiagnosticKind::Resource), 3);
}

#[test]
fn test_pilot_lamp_requires_turn_on() {
    let compiled = compile("[PilotLamp]\nTurnOff = off.bmp\n");
    assert!(compiled.elements.is_empty());
    assert_eq!(compiled.count(DiagnosticKind::Element), 1);
}
