//! Scalar value parsing: lenient numbers, hex colors and flags.

use serde::{Deserialize, Serialize};

/// Parse a number the way legacy panel tools did.
///
/// All whitespace is removed, then the longest prefix that is a finite decimal
/// number wins (`"12.5px"` reads as `12.5`).
pub fn parse_f64_lenient(value: &str) -> Option<f64> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let mut end = compact.len();
    while end > 0 {
        if compact.is_char_boundary(end) {
            let prefix = &compact[..end];
            if is_decimal_literal(prefix) {
                if let Ok(v) = prefix.parse::<f64>() {
                    if v.is_finite() {
                        return Some(v);
                    }
                }
            }
        }
        end -= 1;
    }
    None
}

/// Integer variant of [`parse_f64_lenient`]; fractional values are rounded.
pub fn parse_i32_lenient(value: &str) -> Option<i32> {
    let v = parse_f64_lenient(value)?.round();
    if v >= i32::MIN as f64 && v <= i32::MAX as f64 {
        Some(v as i32)
    } else {
        None
    }
}

// `str::parse::<f64>` also accepts "inf" and "NaN"
fn is_decimal_literal(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && s.bytes().any(|b| b.is_ascii_digit())
}

/// Interpret a boolean flag (`true` or `1`).
pub fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// 24-bit RGB color (used as the transparent color key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color24 {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Color24 {
    /// Default panel color key.
    pub const BLUE: Color24 = Color24 { r: 0, g: 0, b: 255 };

    /// Color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        Some(Self {
            r: u8::from_str_radix(&hex[0..2], 16).ok()?,
            g: u8::from_str_radix(&hex[2..4], 16).ok()?,
            b: u8::from_str_radix(&hex[4..6], 16).ok()?,
        })
    }
}

impl Default for Color24 {
    fn default() -> Self {
        Self::BLUE
    }
}

/// 32-bit RGBA color (element tint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color32 {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha, 255 is opaque
    pub a: u8,
}

impl Color32 {
    /// Default element tint.
    pub const WHITE: Color32 = Color32::new(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Color32 = Color32::new(0, 0, 0, 255);

    /// Color from its channels.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Self::WHITE
    }
}
