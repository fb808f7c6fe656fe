//! Variant lookup: built-in presets, user variant files, or an explicit TOML.

use std::path::{Path, PathBuf};

use clap::Args;
use segmenter_engine::{VariantConfig, PRESET_NAMES};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_USAGE};
use crate::CliError;

#[derive(Args, Debug, Clone)]
pub struct VariantArgs {
    /// Built-in or user variant name (lima, provincia, lima-corte-2, provincia-corte-2)
    #[arg(long, short = 'p', env = "SEGMENTER_VARIANT", required_unless_present = "config")]
    pub variant: Option<String>,

    /// Variant TOML file (instead of --variant)
    #[arg(long, conflicts_with = "variant")]
    pub config: Option<PathBuf>,
}

impl VariantArgs {
    pub fn resolve(&self) -> Result<VariantConfig, CliError> {
        match (&self.config, &self.variant) {
            (Some(path), _) => load_variant_file(path),
            (None, Some(name)) => resolve_named(name),
            (None, None) => Err(CliError::args("no variant given")
                .with_hint(format!("use --variant with one of: {}", PRESET_NAMES.join(", ")))),
        }
    }
}

/// `<config dir>/segmenter/variants`, where user-defined variants live.
pub fn user_variant_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("segmenter").join("variants"))
}

fn resolve_named(name: &str) -> Result<VariantConfig, CliError> {
    if let Some(preset) = VariantConfig::preset(name) {
        return Ok(preset);
    }
    if let Some(path) = user_variant_dir().map(|d| d.join(format!("{name}.toml"))) {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "using user variant");
            return load_variant_file(&path);
        }
    }
    Err(CliError::args(format!("unknown variant '{name}'")).with_hint(format!(
        "built-in variants: {} (see `segmenter variants`)",
        PRESET_NAMES.join(", ")
    )))
}

pub fn load_variant_file(path: &Path) -> Result<VariantConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("cannot read {}: {e}", path.display()),
        hint: None,
    })?;
    VariantConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

/// Variant names found in the user variant directory, sorted.
pub fn list_user_variants() -> Vec<String> {
    let Some(dir) = user_variant_dir() else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
