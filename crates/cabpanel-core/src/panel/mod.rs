//! Panel compilation.
//!
//! [`compile_panel`] tokenizes a panel file, fixes the panel calibration and
//! camera restriction, then walks the sections in file order, building each
//! known instrument and appending the result to the element sink.

mod calibrated;
pub mod common;
mod legacy;

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::cfg::values::parse_f64_lenient;
use crate::cfg::{tokenize, PanelError, PanelSource, ReadEnv, Section, Tokenized};
use crate::diagnostics::{Diagnostic, SourceLocation};
use crate::element::{apply_steps, ElementStep};
use crate::geometry::CameraRestriction;
use crate::host::{ElementSink, LoadContext, LoadSignal};
use crate::options::CompileOptions;

/// File name of a calibrated panel.
pub const CALIBRATED_FILE: &str = "panel2.cfg";

/// File name of a legacy panel.
pub const LEGACY_FILE: &str = "panel.cfg";

/// Panel file dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelFormat {
    /// `panel2.cfg`: resolution-independent, calibrated by `[This]`
    Calibrated,
    /// `panel.cfg`: fixed 480×440 frame
    Legacy,
}

impl PanelFormat {
    /// Pick the format from the panel file name.
    pub fn from_path(path: &Path) -> Result<Self, PanelError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match name.as_str() {
            CALIBRATED_FILE => Ok(PanelFormat::Calibrated),
            LEGACY_FILE => Ok(PanelFormat::Legacy),
            _ => Err(PanelError::UnknownFormat(path.display().to_string())),
        }
    }
}

/// Find the panel file of a train folder, preferring the calibrated format.
pub fn locate_panel(train_dir: &Path) -> Result<(PathBuf, PanelFormat), PanelError> {
    for (name, format) in [
        (CALIBRATED_FILE, PanelFormat::Calibrated),
        (LEGACY_FILE, PanelFormat::Legacy),
    ] {
        if let Some(path) = find_file(train_dir, name) {
            return Ok((path, format));
        }
    }
    Err(PanelError::NoPanelFile(train_dir.display().to_string()))
}

fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .find(|p| {
            p.is_file()
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(name))
        })
}

/// Result of one compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelOutcome {
    /// Camera restriction derived from the calibration
    pub camera: CameraRestriction,
    /// New elements appended to the sink
    pub elements_added: usize,
    /// Set when the load signal stopped the compile early
    pub cancelled: bool,
}

/// Compile a panel file into elements of `options.car`.
///
/// Problems in the file are reported to `ctx.diagnostics` and never abort the
/// compile. An unrecognised file name is compiled as a calibrated panel.
pub fn compile_panel(source: &PanelSource, options: &CompileOptions, ctx: &mut LoadContext<'_>) -> PanelOutcome {
    let format = PanelFormat::from_path(&source.path).unwrap_or_else(|e| {
        tracing::warn!("{}, compiling as {}", e, CALIBRATED_FILE);
        PanelFormat::Calibrated
    });
    compile_panel_as(format, source, options, ctx)
}

/// Compile a panel file with an explicit format.
pub fn compile_panel_as(
    format: PanelFormat,
    source: &PanelSource,
    options: &CompileOptions,
    ctx: &mut LoadContext<'_>,
) -> PanelOutcome {
    let tokens = tokenize(&source.lines);
    tracing::debug!(
        "compiling {} ({:?}): {} sections, {} lines",
        source.path.display(),
        format,
        tokens.sections.len(),
        source.lines.len()
    );

    let outcome = match format {
        PanelFormat::Calibrated => calibrated::compile(source, &tokens, options, ctx),
        PanelFormat::Legacy => legacy::compile(source, &tokens, options, ctx),
    };

    if outcome.cancelled {
        tracing::info!(
            "compile of {} cancelled after {} elements",
            source.path.display(),
            outcome.elements_added
        );
    } else {
        tracing::info!(
            "compiled {}: {} elements",
            source.path.display(),
            outcome.elements_added
        );
    }
    outcome
}

/// Report lines that precede the first section.
///
/// `Version 1.0` is accepted; any other version is a format error, and any
/// other line a format warning.
pub(crate) fn check_preamble(preamble: &[(usize, &str)], env: &mut ReadEnv<'_>) {
    for &(line, text) in preamble {
        let location = SourceLocation::file(env.file_name).line(line);
        let lower = text.to_ascii_lowercase();
        let diagnostic = match lower.strip_prefix("version") {
            Some(rest) => {
                let version = rest.trim_start_matches(|c: char| c == '=' || c.is_whitespace());
                if parse_f64_lenient(version) == Some(1.0) {
                    continue;
                }
                Diagnostic::format(format!("The version {} is not supported", version), location)
            }
            None => Diagnostic::format(format!("Unexpected line before the first section: {}", text), location)
                .warning(),
        };
        env.report(diagnostic);
    }
}

/// Walk lines `span`, reporting progress and polling for cancellation every
/// eighth line. Returns `false` once cancelled.
fn walk_lines(signal: &mut dyn LoadSignal, span: Range<usize>, total: usize) -> bool {
    for i in span {
        signal.report_progress(i + 1, total);
        if i & 7 == 0 {
            signal.yield_now();
            if signal.is_cancelled() {
                return false;
            }
        }
    }
    true
}

/// Walk every section in order, building each one and applying its steps.
///
/// Returns the number of new elements and whether the walk was cancelled.
pub(crate) fn run_sections<'t>(
    tokens: &Tokenized<'t>,
    total_lines: usize,
    car: usize,
    signal: &mut dyn LoadSignal,
    sink: &mut dyn ElementSink,
    mut build: impl FnMut(&Section<'t>) -> Vec<ElementStep>,
) -> (usize, bool) {
    let first = tokens.sections.first().map_or(total_lines, |s| s.span.start);
    if !walk_lines(signal, 0..first, total_lines) {
        return (0, true);
    }

    let mut added = 0;
    for section in &tokens.sections {
        if !walk_lines(signal, section.span.clone(), total_lines) {
            return (added, true);
        }
        let steps = build(section);
        added += apply_steps(sink, car, steps);
    }
    (added, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CarSections, DiagnosticLog, DiskFiles};
    use crate::diagnostics::Severity;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            PanelFormat::from_path(Path::new("train/Panel2.cfg")).unwrap(),
            PanelFormat::Calibrated
        );
        assert_eq!(
            PanelFormat::from_path(Path::new("panel.cfg")).unwrap(),
            PanelFormat::Legacy
        );
        assert!(PanelFormat::from_path(Path::new("train.dat")).is_err());
    }

    #[test]
    fn test_locate_prefers_calibrated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("panel.cfg"), "").unwrap();
        assert_eq!(locate_panel(dir.path()).unwrap().1, PanelFormat::Legacy);

        std::fs::write(dir.path().join("PANEL2.CFG"), "").unwrap();
        let (path, format) = locate_panel(dir.path()).unwrap();
        assert_eq!(format, PanelFormat::Calibrated);
        assert!(path.ends_with("PANEL2.CFG"));
    }

    #[test]
    fn test_locate_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(locate_panel(dir.path()), Err(PanelError::NoPanelFile(_))));
    }

    #[test]
    fn test_preamble_diagnostics() {
        let mut log = DiagnosticLog::default();
        let files = DiskFiles::default();
        let mut env = ReadEnv {
            file_name: "panel2.cfg",
            train_dir: Path::new("."),
            files: &files,
            diagnostics: &mut log,
        };
        check_preamble(&[(1, "Version 1.0"), (2, "version=2.0"), (3, "hello")], &mut env);

        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].severity, Severity::Error);
        assert_eq!(log.entries[0].location.line, Some(2));
        assert_eq!(log.entries[1].severity, Severity::Warning);
    }

    struct CountingSignal {
        lines: usize,
        cancel_after: usize,
    }

    impl LoadSignal for CountingSignal {
        fn is_cancelled(&self) -> bool {
            self.lines >= self.cancel_after
        }

        fn report_progress(&mut self, _line: usize, _total: usize) {
            self.lines += 1;
        }
    }

    #[test]
    fn test_walk_stops_within_eight_lines() {
        let lines: Vec<String> = (0..100).map(|i| format!("[s{}]", i)).collect();
        let tokens = tokenize(&lines);
        let mut signal = CountingSignal {
            lines: 0,
            cancel_after: 21,
        };
        let mut sink = CarSections::new(1);
        let mut built = 0;
        let (_, cancelled) = run_sections(&tokens, lines.len(), 0, &mut signal, &mut sink, |_| {
            built += 1;
            Vec::new()
        });

        assert!(cancelled);
        assert!(signal.lines >= 21 && signal.lines <= 21 + 8);
        assert!(built < 21 + 8);
    }
}
