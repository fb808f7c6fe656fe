//! ZIP bundle of the per-agency workbooks.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::NaiveDateTime;
use segmenter_engine::{OutputArtifact, ReconciliationLog, SegmentError, VariantConfig};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::render::render_artifact;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub agency: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub entries: Vec<ArchiveEntry>,
}

/// Render every artifact and pack the results, one deflated entry each.
///
/// A render failure is logged as an ERROR line for that agency and the rest
/// are still archived. Entry names that collide (ignoring case) get a
/// ` (2)`, ` (3)`, … suffix and a WARN line.
pub fn build_archive(artifacts: &[OutputArtifact], log: &mut ReconciliationLog) -> Result<Archive, SegmentError> {
    let archive_err = |e: zip::result::ZipError| SegmentError::Archive(e.to_string());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let bytes = match render_artifact(artifact) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(agency = %artifact.agency, error = %e, "render failed");
                log.error(&artifact.agency, e.to_string());
                continue;
            }
        };

        let name = unique_entry_name(&artifact.entry_name, &mut used);
        if name != artifact.entry_name {
            log.warn(format!(
                "{} | entry '{}' already used, written as '{name}'",
                artifact.agency, artifact.entry_name
            ));
        }

        zip.start_file(name.as_str(), options).map_err(archive_err)?;
        zip.write_all(&bytes)
            .map_err(|e| SegmentError::Archive(e.to_string()))?;
        tracing::debug!(entry = %name, size = bytes.len(), "entry written");
        entries.push(ArchiveEntry { name, agency: artifact.agency.clone(), size: bytes.len() });
    }

    let bytes = zip.finish().map_err(archive_err)?.into_inner();
    Ok(Archive { bytes, entries })
}

/// `name` if unused, else `stem (n).xlsx` for the first free `n >= 2`.
fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// `Reportes_<Label>[_<Zone>]_<YYYYmmdd_HHMMSS>.zip`, spaces as underscores.
pub fn default_archive_name(variant: &VariantConfig, zone: Option<&str>, now: NaiveDateTime) -> String {
    let mut name = format!("Reportes_{}", variant.label.trim());
    if let Some(zone) = zone.map(str::trim).filter(|z| !z.is_empty()) {
        name.push('_');
        name.push_str(zone);
    }
    name.push_str(&now.format("_%Y%m%d_%H%M%S.zip").to_string());
    name.replace(' ', "_")
}
