//! `cabpanel`: compile a train's cab panel and print the result as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cabpanel_core::host::RegisteredTexture;
use cabpanel_core::prelude::*;

#[derive(Parser)]
#[command(name = "cabpanel")]
#[command(about = "Compile train cab panel files", version = cabpanel_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a panel file, or the panel of a train folder
    Compile {
        /// Panel file or train folder
        path: PathBuf,

        /// Compile options as JSON
        #[arg(short, long)]
        options: Option<PathBuf>,

        /// Override the format picked from the file name
        #[arg(long)]
        format: Option<FormatArg>,

        /// Car that receives the elements
        #[arg(long)]
        car: Option<usize>,

        /// Exit with an error status when any error is reported
        #[arg(long)]
        strict: bool,

        /// Print only the summary line
        #[arg(long)]
        summary: bool,
    },

    /// Show which panel file a train folder uses
    Locate {
        /// Train folder
        dir: PathBuf,
    },

    /// Print the default compile options
    DefaultOptions,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Calibrated,
    Legacy,
}

impl From<FormatArg> for PanelFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Calibrated => PanelFormat::Calibrated,
            FormatArg::Legacy => PanelFormat::Legacy,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    panel: &'a Path,
    format: PanelFormat,
    outcome: &'a PanelOutcome,
    elements: &'a [PanelElement],
    textures: &'a [RegisteredTexture],
    diagnostics: &'a [Diagnostic],
}

fn resolve_panel(path: &Path) -> Result<(PathBuf, PanelFormat)> {
    if path.is_dir() {
        return Ok(locate_panel(path)?);
    }
    let format = PanelFormat::from_path(path).unwrap_or_else(|e| {
        tracing::warn!("{}, compiling as calibrated", e);
        PanelFormat::Calibrated
    });
    Ok((path.to_path_buf(), format))
}

fn compile(
    path: &Path,
    options: Option<&Path>,
    format: Option<FormatArg>,
    car: Option<usize>,
    strict: bool,
    summary: bool,
) -> Result<()> {
    let mut options = match options {
        Some(p) => CompileOptions::load(p).with_context(|| format!("loading options {}", p.display()))?,
        None => CompileOptions::default(),
    };
    if let Some(car) = car {
        options.car = car;
    }

    let (panel, detected) = resolve_panel(path)?;
    let format = format.map(PanelFormat::from).unwrap_or(detected);
    let source = PanelSource::from_file(&panel, options.encoding)?;

    let mut textures = ImageHeaderTextures::default();
    let files = DiskFiles::new(&options.compatibility_folder);
    let mut sections = CarSections::new(options.train.cars.max(options.car + 1));
    let mut log = DiagnosticLog::default();
    let mut signal = CancelFlag::default();

    let outcome = {
        let mut ctx = LoadContext {
            textures: &mut textures,
            files: &files,
            sink: &mut sections,
            diagnostics: &mut log,
            signal: &mut signal,
        };
        compile_panel_as(format, &source, &options, &mut ctx)
    };

    let errors = log.errors().count();
    if summary {
        println!(
            "{}: {} elements, {} textures, {} errors, {} diagnostics",
            panel.display(),
            outcome.elements_added,
            textures.textures().len(),
            errors,
            log.entries.len()
        );
    } else {
        let report = Report {
            panel: &panel,
            format,
            outcome: &outcome,
            elements: sections.elements(options.car),
            textures: textures.textures(),
            diagnostics: &log.entries,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if strict && errors > 0 {
        bail!("{} reported {} errors", panel.display(), errors);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compile {
            path,
            options,
            format,
            car,
            strict,
            summary,
        } => compile(&path, options.as_deref(), format, car, strict, summary),
        Commands::Locate { dir } => {
            let (path, format) = locate_panel(&dir)?;
            println!("{} ({:?})", path.display(), format);
            Ok(())
        }
        Commands::DefaultOptions => {
            println!("{}", serde_json::to_string_pretty(&CompileOptions::default())?);
            Ok(())
        }
    }
}
