//! The segmentation run: validate, load, enumerate agencies, then filter,
//! reconcile and emit one artifact per agency.

use std::collections::HashSet;
use std::fmt;

use crate::alias::{resolve_rows, AliasMap};
use crate::artifact::{OutputArtifact, PresentationHints};
use crate::config::{HeaderSchema, VariantConfig};
use crate::department::DepartmentVocabulary;
use crate::error::SegmentError;
use crate::log::{AgencyOutcome, ReconciliationLog};
use crate::normalize::{normalize, sanitize_file_stem, AgencyKey};
use crate::source::TabularSource;
use crate::table::RawTable;
use crate::validate::require_headers;

/// Run stages, in order. A run can only fail while validating or loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Loading,
    EnumeratingAgencies,
    Filtering,
    Reconciling,
    Flattening,
    Emitting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => write!(f, "validating"),
            Self::Loading => write!(f, "loading"),
            Self::EnumeratingAgencies => write!(f, "enumerating_agencies"),
            Self::Filtering => write!(f, "filtering"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Flattening => write!(f, "flattening"),
            Self::Emitting => write!(f, "emitting"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Restrict the Detail sheet to this zone.
    pub zone: Option<String>,
}

impl RunRequest {
    pub fn for_zone(zone: impl Into<String>) -> Self {
        Self { zone: Some(zone.into()) }
    }
}

/// Everything a run produced. The log is always present; artifacts only when
/// no fatal precondition failed. The log stays open so archiving can append
/// to it.
#[derive(Debug)]
pub struct RunReport {
    pub log: ReconciliationLog,
    pub result: Result<Vec<OutputArtifact>, SegmentError>,
    /// Stage at which the run aborted.
    pub failed_at: Option<Stage>,
}

impl RunReport {
    pub fn artifacts(&self) -> &[OutputArtifact] {
        self.result.as_deref().unwrap_or(&[])
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Tables and lookups shared by every agency of one run.
struct Loaded {
    summary: RawTable,
    summary_keys: Vec<AgencyKey>,
    altas_col: Option<usize>,
    /// Detail rows after the zone filter, cut to the output columns.
    detail: RawTable,
    normalized_advisors: Vec<String>,
}

pub struct Segmenter {
    variant: VariantConfig,
    aliases: AliasMap,
}

impl Segmenter {
    pub fn new(variant: VariantConfig) -> Result<Self, SegmentError> {
        variant.validate()?;
        let aliases = variant.alias_map()?;
        Ok(Self { variant, aliases })
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.variant
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn run(&self, source: &mut dyn TabularSource, request: &RunRequest) -> RunReport {
        let mut log = ReconciliationLog::new();
        let zone = request
            .zone
            .as_deref()
            .map(str::trim)
            .filter(|z| !z.is_empty());

        match zone {
            Some(z) => log.info(format!("--- START: {} | ZONE: {z} ---", self.variant.name)),
            None => log.info(format!("--- START: {} ---", self.variant.name)),
        }
        tracing::info!(variant = %self.variant.name, zone = ?zone, "segmentation started");

        match self.run_stages(source, zone, &mut log) {
            Ok(artifacts) => {
                tracing::info!(artifacts = artifacts.len(), "segmentation finished");
                RunReport { log, result: Ok(artifacts), failed_at: None }
            }
            Err((stage, err)) => {
                tracing::warn!(%stage, error = %err, "segmentation aborted");
                log.alert(err.to_string());
                RunReport { log, result: Err(err), failed_at: Some(stage) }
            }
        }
    }

    fn run_stages(
        &self,
        source: &mut dyn TabularSource,
        zone: Option<&str>,
        log: &mut ReconciliationLog,
    ) -> Result<Vec<OutputArtifact>, (Stage, SegmentError)> {
        let at = |stage: Stage| move |e: SegmentError| (stage, e);

        self.validate_headers(source, zone).map_err(at(Stage::Validating))?;
        log.info("Header validation passed");

        let loaded = self.load(source, zone, log).map_err(at(Stage::Loading))?;
        // An empty zone selection is part of loading the zone's rows.
        let agencies = self.enumerate_agencies(&loaded, zone).map_err(at(Stage::Loading))?;
        log.info(format!("Generating reports for {} agencies", agencies.len()));

        Ok(agencies
            .iter()
            .filter_map(|agency| self.process_agency(agency, &loaded, log))
            .collect())
    }

    fn validate_headers(
        &self,
        source: &mut dyn TabularSource,
        zone: Option<&str>,
    ) -> Result<(), SegmentError> {
        if self.variant.zone_filter && zone.is_none() {
            return Err(SegmentError::ZoneRequired);
        }
        tracing::debug!(stage = %Stage::Validating, "checking headers");
        require_headers(source, &self.variant.summary_sheet, &self.variant.summary_requirement())?;
        require_headers(source, &self.variant.detail_sheet, &self.variant.detail_requirement())
    }

    fn load(
        &self,
        source: &mut dyn TabularSource,
        zone: Option<&str>,
        log: &mut ReconciliationLog,
    ) -> Result<Loaded, SegmentError> {
        let v = &self.variant;
        let cols = &v.columns;
        tracing::debug!(stage = %Stage::Loading, "reading sheets");

        // Summary. Two-level columns are located by inner label, then flattened.
        let (summary, agency_col, altas_col) = match v.schema {
            HeaderSchema::SingleLevel => {
                let t = source.single_level(&v.summary_sheet)?;
                let agency = t.column_index(&cols.agency);
                let altas = t.column_index(&cols.altas);
                (t, agency, altas)
            }
            HeaderSchema::TwoLevel => {
                let t = source.multi_level(&v.summary_sheet)?;
                let agency = t.column_index_by_inner(&cols.agency);
                let altas = t.column_index_by_inner(&cols.altas);
                tracing::debug!(stage = %Stage::Flattening, columns = t.columns().len(), "flattening summary header");
                (t.flatten(), agency, altas)
            }
        };
        let agency_col = agency_col.ok_or_else(|| SegmentError::MissingColumn {
            sheet: v.summary_sheet.clone(),
            column: cols.agency.clone(),
        })?;
        if altas_col.is_none() {
            log.info(format!(
                "Column '{}' not found in '{}'; reconciliation skipped",
                cols.altas, v.summary_sheet
            ));
        }

        // Detail.
        let mut detail = source.single_level(&v.detail_sheet)?;
        let missing_column = |column: &str| SegmentError::MissingColumn {
            sheet: v.detail_sheet.clone(),
            column: column.to_string(),
        };
        let advisor_col = detail
            .column_index(&cols.advisor)
            .ok_or_else(|| missing_column(&cols.advisor))?;
        if detail.column_index(&cols.boundary).is_none() {
            return Err(SegmentError::MissingBoundaryColumn {
                sheet: v.detail_sheet.clone(),
                column: cols.boundary.clone(),
            });
        }

        if let Some(zone) = zone {
            let zone_col = detail
                .column_index(&cols.zone)
                .ok_or_else(|| missing_column(&cols.zone))?;
            let wanted = zone.to_uppercase();
            detail = detail.filter_rows(|row| row[zone_col].to_text().trim().to_uppercase() == wanted);
            if detail.is_empty() {
                return Err(SegmentError::EmptyZone { zone: zone.to_string() });
            }
            log.info(format!("{} Detail rows in zone {zone}", detail.len()));
        }

        let vocabulary = if v.suffix_stripping {
            let dept_col = detail
                .column_index(&cols.department)
                .ok_or_else(|| missing_column(&cols.department))?;
            DepartmentVocabulary::from_cells(detail.column_values(dept_col))
        } else {
            DepartmentVocabulary::default()
        };
        tracing::debug!(departments = vocabulary.len(), "department vocabulary built");

        let summary_keys = summary
            .column_values(agency_col)
            .map(|cell| {
                let raw = cell.to_text();
                if v.suffix_stripping {
                    AgencyKey::new(&vocabulary.strip(&raw))
                } else {
                    AgencyKey::new(&raw)
                }
            })
            .collect();

        let normalized_advisors = detail
            .column_values(advisor_col)
            .map(|c| normalize(&c.to_text()))
            .collect();

        let detail = detail
            .truncate_through(&cols.boundary, &v.extra_detail_columns)
            .ok_or_else(|| SegmentError::MissingBoundaryColumn {
                sheet: v.detail_sheet.clone(),
                column: cols.boundary.clone(),
            })?;

        Ok(Loaded { summary, summary_keys, altas_col, detail, normalized_advisors })
    }

    /// Agencies to process, in output order.
    fn enumerate_agencies(&self, loaded: &Loaded, zone: Option<&str>) -> Result<Vec<AgencyKey>, SegmentError> {
        let mut seen = HashSet::new();
        let candidates: Vec<AgencyKey> = if self.variant.agencies.is_empty() {
            loaded.summary_keys.clone()
        } else {
            // Prefer the Summary's spelling for display when the agency is there.
            self.variant
                .agencies
                .iter()
                .map(|name| {
                    let key = AgencyKey::new(name);
                    loaded
                        .summary_keys
                        .iter()
                        .find(|k| **k == key)
                        .cloned()
                        .unwrap_or(key)
                })
                .collect()
        };
        let mut agencies: Vec<AgencyKey> = candidates
            .into_iter()
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        if let Some(zone) = zone {
            let advisors: HashSet<&str> = loaded
                .normalized_advisors
                .iter()
                .map(String::as_str)
                .filter(|a| !a.is_empty())
                .collect();
            agencies.retain(|key| match self.aliases.aliases(key) {
                Some(set) => set.iter().any(|a| advisors.contains(a.as_str())),
                None => advisors.contains(key.normalized()),
            });
            if agencies.is_empty() {
                return Err(SegmentError::NoAgenciesForZone { zone: zone.to_string() });
            }
        }

        tracing::debug!(stage = %Stage::EnumeratingAgencies, count = agencies.len(), "agencies enumerated");
        Ok(agencies)
    }

    /// Filter, reconcile and emit one agency. `None` when the agency has no
    /// Summary rows.
    fn process_agency(
        &self,
        agency: &AgencyKey,
        loaded: &Loaded,
        log: &mut ReconciliationLog,
    ) -> Option<OutputArtifact> {
        let name = agency.display();
        let summary_rows: Vec<usize> = loaded
            .summary_keys
            .iter()
            .enumerate()
            .filter(|(_, k)| *k == agency)
            .map(|(i, _)| i)
            .collect();
        if summary_rows.is_empty() {
            tracing::warn!(agency = name, "no Summary rows");
            log.warn(format!("{name} | no rows in '{}', skipped", self.variant.summary_sheet));
            return None;
        }
        let detail_rows = resolve_rows(agency, &self.aliases, &loaded.normalized_advisors);
        tracing::debug!(
            stage = %Stage::Filtering,
            agency = name,
            summary_rows = summary_rows.len(),
            detail_rows = detail_rows.len(),
            "agency filtered"
        );

        log.record(self.reconcile(name, &loaded.summary, loaded.altas_col, &summary_rows, detail_rows.len()));

        tracing::debug!(stage = %Stage::Emitting, agency = name, "artifact emitted");
        let report = loaded.summary.select_rows(&summary_rows);
        let hints = PresentationHints::resolve(&self.variant.hints, &report);
        Some(OutputArtifact {
            agency: name.to_string(),
            entry_name: format!("{}{}.xlsx", self.variant.output.entry_prefix, sanitize_file_stem(name)),
            report_sheet: self.variant.output.report_sheet.clone(),
            detail_sheet: self.variant.output.detail_sheet.clone(),
            report,
            detail: loaded.detail.select_rows(&detail_rows),
            hints,
        })
    }

    fn reconcile(
        &self,
        agency: &str,
        summary: &RawTable,
        altas_col: Option<usize>,
        summary_rows: &[usize],
        observed: usize,
    ) -> AgencyOutcome {
        let Some(col) = altas_col else {
            return AgencyOutcome::error(agency, observed, format!("{} column not found", self.variant.columns.altas));
        };

        let mut expected: i64 = 0;
        for &row in summary_rows {
            let cell = summary.value(row, col);
            if cell.is_empty() {
                return AgencyOutcome::error(agency, observed, format!("{} value is empty", self.variant.columns.altas));
            }
            match cell.as_count() {
                Some(n) => match expected.checked_add(n) {
                    Some(sum) => expected = sum,
                    None => {
                        return AgencyOutcome::error(
                            agency,
                            observed,
                            format!("{} total is out of range", self.variant.columns.altas),
                        )
                    }
                },
                None => {
                    return AgencyOutcome::error(
                        agency,
                        observed,
                        format!("{} value '{}' is not a whole number", self.variant.columns.altas, cell.to_text()),
                    )
                }
            }
        }
        tracing::debug!(stage = %Stage::Reconciling, agency, expected, observed, "reconciled");
        AgencyOutcome::reconciled(agency, expected, observed)
    }
}

/// Distinct zones in the Detail sheet, first-seen order. Case-insensitive
/// duplicates keep the first spelling.
pub fn discover_zones(source: &mut dyn TabularSource, variant: &VariantConfig) -> Result<Vec<String>, SegmentError> {
    let detail = source.single_level(&variant.detail_sheet)?;
    let zone_col = detail
        .column_index(&variant.columns.zone)
        .ok_or_else(|| SegmentError::MissingColumn {
            sheet: variant.detail_sheet.clone(),
            column: variant.columns.zone.clone(),
        })?;

    let mut seen = HashSet::new();
    Ok(detail
        .column_values(zone_col)
        .map(|c| c.to_text().trim().to_string())
        .filter(|z| !z.is_empty() && seen.insert(z.to_uppercase()))
        .collect())
}
