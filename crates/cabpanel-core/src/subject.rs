//! Subject names to postfix expressions.
//!
//! Panels bind instruments to simulation state by name (`kmph`, `bc`, `hour`,
//! ...). The translator rewrites each name into the postfix expression the
//! runtime evaluates every frame. An optional `D<n>` suffix selects one decimal
//! digit of the value.

use regex::Regex;
use std::sync::OnceLock;

use crate::diagnostics::{Diagnostic, SourceLocation};
use crate::host::DiagnosticSink;

/// Highest plugin state slot addressable as `ats<n>`.
const MAX_PLUGIN_STATE: usize = 255;

/// Expression of a subject that cannot be resolved.
pub const INERT: &str = "0";

fn digit_suffix_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(.*)d(\d+)$").ok()).as_ref()
}

/// Format a number for a postfix expression.
pub fn number(value: f64) -> String {
    if value == 0.0 {
        // never emit "-0"
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

/// Split a `<base>D<n>` subject into its base and the digit-selecting fragment.
pub fn split_digit_suffix(subject: &str) -> (&str, Option<String>) {
    let Some(caps) = digit_suffix_regex().and_then(|re| re.captures(subject)) else {
        return (subject, None);
    };
    let (Some(base), Some(digits)) = (caps.get(1), caps.get(2)) else {
        return (subject, None);
    };
    let Ok(n) = digits.as_str().parse::<i32>() else {
        return (subject, None);
    };
    (base.as_str(), Some(digit_selector(n)))
}

/// Fragment selecting decimal digit `n` (0 = units) of the value on the stack.
pub fn digit_selector(n: i32) -> String {
    if n == 0 {
        " floor 10 mod".to_string()
    } else {
        let scale = 10f64.powi(n);
        let inverse = 10f64.powi(-n);
        format!(
            " ~ {} >= <> {} * floor 10 mod 10 ?",
            number(scale),
            number(inverse)
        )
    }
}

/// Resolves subject names for one train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectTranslator {
    car_count: usize,
}

impl SubjectTranslator {
    /// Translator for a train with `car_count` cars.
    pub fn new(car_count: usize) -> Self {
        Self { car_count }
    }

    /// Expression of a bare subject (no digit suffix), or `None` if unknown.
    pub fn resolve(&self, subject: &str) -> Option<String> {
        let lower = subject.trim().to_ascii_lowercase();

        let fixed = match lower.as_str() {
            "acc" => Some("acceleration"),
            "atc" => Some("271 pluginstate"),
            "bc" => Some("brakecylinder 0.001 *"),
            "mr" => Some("mainreservoir 0.001 *"),
            "sap" => Some("straightairpipe 0.001 *"),
            "bp" => Some("brakepipe 0.001 *"),
            "er" => Some("equalizingreservoir 0.001 *"),
            "door" => Some("1 doors -"),
            "csc" => Some("constSpeed"),
            "power" => Some("brakeNotchLinear 0 != 0 powerNotch ?"),
            "brake" => Some("brakeNotchLinear"),
            "rev" => Some("reverserNotch ++"),
            "hour" => Some("0.000277777777777778 time * 24 mod floor"),
            "min" => Some("0.0166666666666667 time * 60 mod floor"),
            "sec" => Some("time 60 mod floor"),
            "kmph" => Some("speedometer abs 3.6 *"),
            "mph" => Some("speedometer abs 2.2369362920544 *"),
            "ms" => Some("speedometer abs"),
            "true" => Some("1"),
            "klaxon" | "primaryklaxon" | "secondaryklaxon" | "musicklaxon" | "passalarm"
            | "pilotlamp" | "stationadjustalarm" | "wiperposition" => Some(lower.as_str()),
            _ => None,
        };
        if let Some(expression) = fixed {
            return Some(expression.to_string());
        }

        if let Some(index) = lower.strip_prefix("ats") {
            let n: usize = index.parse().ok()?;
            return (n <= MAX_PLUGIN_STATE).then(|| format!("{} pluginstate", n));
        }
        if let Some(index) = lower.strip_prefix("doorl") {
            return Some(self.door_expression(index.parse().ok()?, "leftdoorsindex"));
        }
        if let Some(index) = lower.strip_prefix("doorr") {
            return Some(self.door_expression(index.parse().ok()?, "rightdoorsindex"));
        }
        None
    }

    fn door_expression(&self, car: i64, variable: &str) -> String {
        match usize::try_from(car) {
            Ok(car) if car < self.car_count => format!("{} {} ceiling", car, variable),
            _ => "2".to_string(),
        }
    }

    /// Translate a subject with an optional digit suffix.
    ///
    /// An unknown subject is reported at `location` and yields [`INERT`].
    pub fn translate(
        &self,
        subject: &str,
        location: SourceLocation,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> String {
        let (base, suffix) = split_digit_suffix(subject.trim());
        let mut expression = match self.resolve(base) {
            Some(expression) => expression,
            None => {
                diagnostics.report(Diagnostic::field(
                    format!("Invalid subject {}", subject),
                    location,
                ));
                INERT.to_string()
            }
        };
        if let Some(suffix) = suffix {
            expression.push_str(&suffix);
        }
        expression
    }
}
