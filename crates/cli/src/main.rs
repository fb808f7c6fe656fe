// Segmenter CLI - split a consolidated commission workbook into per-agency reports

mod exit_codes;
mod variant;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use segmenter_engine::log::LogSummary;
use segmenter_engine::{
    discover_zones, ReconciliationLog, RunRequest, SegmentError, Segmenter, VariantConfig, PRESET_NAMES,
};
use segmenter_io::{default_archive_name, segment_workbook, ArchiveEntry, XlsxSource};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use exit_codes::{
    segment_exit_code, EXIT_ERROR, EXIT_INPUT_REJECTED, EXIT_REVIEW_REQUIRED, EXIT_SUCCESS, EXIT_USAGE,
    EXIT_WRITE_FAILED,
};
use variant::VariantArgs;

#[derive(Parser)]
#[command(name = "segmenter")]
#[command(about = "Split a consolidated commission workbook into one report per agency")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a workbook and write the ZIP archive of agency reports
    #[command(after_help = "\
Examples:
  segmenter run consolidado.xlsx --variant lima
  segmenter run consolidado.xlsx --variant provincia --zone NORTE -o reportes/
  segmenter run consolidado.xlsx --config sur.toml --log run.log --fail-on-review")]
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Archive path, or a directory for the default timestamped name
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Also write the reconciliation log to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Exit 5 when any agency is a mismatch or an error
        #[arg(long)]
        fail_on_review: bool,

        /// Print the run as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Only print the final summary line
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate and reconcile without writing anything
    #[command(after_help = "\
Examples:
  segmenter check consolidado.xlsx --variant lima-corte-2
  segmenter check consolidado.xlsx --variant provincia --zone SUR --json")]
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Exit 5 when any agency is a mismatch or an error
        #[arg(long)]
        fail_on_review: bool,

        /// Print the run as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List the zones found in the Detail sheet
    #[command(after_help = "\
Examples:
  segmenter zones consolidado.xlsx --variant provincia")]
    Zones {
        /// Consolidated workbook (xlsx, xls, xlsb, ods)
        input: PathBuf,

        #[command(flatten)]
        variant: VariantArgs,

        /// Print zones as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// List built-in and user variants, or print one as TOML
    #[command(after_help = "\
Examples:
  segmenter variants
  segmenter variants --show provincia > sur.toml")]
    Variants {
        /// Print this variant's full configuration as TOML
        #[arg(long)]
        show: Option<String>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Consolidated workbook (xlsx, xls, xlsb, ods)
    input: PathBuf,

    #[command(flatten)]
    variant: VariantArgs,

    /// Zone to segment (required by zone variants)
    #[arg(long, short = 'z')]
    zone: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { input, output, log, fail_on_review, json, quiet } => {
            cmd_run(input, output, log, fail_on_review, json, quiet)
        }
        Commands::Check { input, fail_on_review, json } => cmd_check(input, fail_on_review, json),
        Commands::Zones { input, variant, json } => cmd_zones(input, variant, json),
        Commands::Variants { show } => cmd_variants(show),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Diagnostics go to stderr, filtered by `SEGMENTER_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SEGMENTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self { code: EXIT_WRITE_FAILED, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its exit code.
    pub fn segment(err: &SegmentError) -> Self {
        let hint = match err {
            SegmentError::MissingHeaders { .. } => {
                Some("headers must be on the first row of the sheet (rows 1 and 2 for Corte 2)".to_string())
            }
            SegmentError::ZoneRequired | SegmentError::EmptyZone { .. } => {
                Some("list the zones with `segmenter zones <input> --variant <name>`".to_string())
            }
            SegmentError::MissingSheet { .. } => Some("check the variant's sheet names".to_string()),
            _ => None,
        };
        Self { code: segment_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// run / check
// ============================================================================

#[derive(Serialize)]
struct RunJson<'a> {
    variant: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    zone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<String>,
    entries: &'a [ArchiveEntry],
    summary: LogSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    log: &'a ReconciliationLog,
}

impl InputArgs {
    fn prepare(&self) -> Result<(Segmenter, XlsxSource, RunRequest), CliError> {
        let variant = self.variant.resolve()?;
        if variant.zone_filter && self.zone.is_none() {
            return Err(CliError::args(format!("variant '{}' needs --zone", variant.name))
                .with_hint(format!("segmenter zones {} --variant {}", self.input.display(), variant.name)));
        }
        let segmenter = Segmenter::new(variant).map_err(|e| CliError::segment(&e))?;
        let source = XlsxSource::open(&self.input).map_err(|e| CliError::segment(&e))?;
        Ok((segmenter, source, RunRequest { zone: self.zone.clone() }))
    }
}

fn cmd_run(
    input: InputArgs,
    output: Option<PathBuf>,
    log_file: Option<PathBuf>,
    fail_on_review: bool,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let (segmenter, mut source, request) = input.prepare()?;
    let out = segment_workbook(&mut source, &segmenter, &request);
    let variant = segmenter.variant();

    if let Some(ref path) = log_file {
        std::fs::write(path, out.log.render())
            .map_err(|e| CliError::write(format!("cannot write log {}: {e}", path.display())))?;
    }

    let written = match &out.archive {
        Ok(archive) => {
            let path = archive_path(output.as_deref(), variant, request.zone.as_deref());
            std::fs::write(&path, &archive.bytes)
                .map_err(|e| CliError::write(format!("cannot write archive {}: {e}", path.display())))?;
            Some(path)
        }
        Err(_) => None,
    };

    if json {
        let entries = out.archive.as_ref().map(|a| a.entries.as_slice()).unwrap_or(&[]);
        print_json(&RunJson {
            variant: &variant.name,
            zone: request.zone.as_deref(),
            archive: written.as_ref().map(|p| p.display().to_string()),
            entries,
            summary: out.log.summary(),
            error: out.archive.as_ref().err().map(|e| e.to_string()),
            log: &out.log,
        })?;
    } else if !quiet {
        eprint!("{}", out.log.render());
    }

    if let Err(e) = &out.archive {
        return Err(CliError::segment(e));
    }
    if let Some(path) = written {
        eprintln!("wrote {}", path.display());
    }
    finish(&out.log, fail_on_review)
}

fn cmd_check(input: InputArgs, fail_on_review: bool, json: bool) -> Result<(), CliError> {
    let (segmenter, mut source, request) = input.prepare()?;
    let report = segmenter.run(&mut source, &request);

    if json {
        print_json(&RunJson {
            variant: &segmenter.variant().name,
            zone: request.zone.as_deref(),
            archive: None,
            entries: &[],
            summary: report.log.summary(),
            error: report.result.as_ref().err().map(|e| e.to_string()),
            log: &report.log,
        })?;
    } else {
        eprint!("{}", report.log.render());
    }

    if let Err(e) = &report.result {
        return Err(CliError::segment(e));
    }
    finish(&report.log, fail_on_review)
}

/// Human summary, then the review gate.
fn finish(log: &ReconciliationLog, fail_on_review: bool) -> Result<(), CliError> {
    let s = log.summary();
    eprintln!(
        "{} agencies: {} matched, {} mismatched, {} errors, {} warnings",
        s.agencies, s.matched, s.mismatched, s.errors, s.warnings
    );
    if fail_on_review && log.needs_review() {
        return Err(CliError {
            code: EXIT_REVIEW_REQUIRED,
            message: "review required".into(),
            hint: Some("see MISMATCH and ERROR lines above".into()),
        });
    }
    Ok(())
}

/// `output` as given, or the default archive name inside it when it is a
/// directory, or the default name in the working directory.
fn archive_path(output: Option<&Path>, variant: &VariantConfig, zone: Option<&str>) -> PathBuf {
    let default_name = || default_archive_name(variant, zone, chrono::Local::now().naive_local());
    match output {
        Some(p) if p.is_dir() => p.join(default_name()),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_name()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// zones
// ============================================================================

fn cmd_zones(input: PathBuf, variant: VariantArgs, json: bool) -> Result<(), CliError> {
    let variant = variant.resolve()?;
    let mut source = XlsxSource::open(&input).map_err(|e| CliError::segment(&e))?;
    let zones = discover_zones(&mut source, &variant).map_err(|e| CliError::segment(&e))?;

    if zones.is_empty() {
        return Err(CliError {
            code: EXIT_INPUT_REJECTED,
            message: format!(
                "no zones found in column '{}' of sheet '{}'",
                variant.columns.zone, variant.detail_sheet
            ),
            hint: None,
        });
    }

    if json {
        print_json(&zones)?;
    } else {
        for zone in &zones {
            println!("{zone}");
        }
    }
    Ok(())
}

// ============================================================================
// variants
// ============================================================================

fn cmd_variants(show: Option<String>) -> Result<(), CliError> {
    if let Some(name) = show {
        let args = VariantArgs { variant: Some(name), config: None };
        let text = args.resolve()?.to_toml().map_err(|e| CliError::segment(&e))?;
        print!("{text}");
        return Ok(());
    }

    for name in PRESET_NAMES {
        if let Some(v) = VariantConfig::preset(name) {
            println!("{:<20} {}", v.name, describe(&v));
        }
    }
    for name in variant::list_user_variants() {
        println!("{name:<20} (user)");
    }
    if let Some(dir) = variant::user_variant_dir() {
        eprintln!("user variants: {}", dir.display());
    }
    Ok(())
}

fn describe(v: &VariantConfig) -> String {
    let mut parts = vec![format!("summary '{}'", v.summary_sheet)];
    if v.schema.header_rows() == 2 {
        parts.push("two header rows".into());
    }
    if v.zone_filter {
        parts.push("needs --zone".into());
    }
    if v.suffix_stripping {
        parts.push("strips departments".into());
    }
    parts.join(", ")
}
