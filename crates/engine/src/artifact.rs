//! Per-agency output produced by the engine and consumed by the renderer.

use serde::Serialize;

use crate::config::HintConfig;
use crate::table::{normalize_column_name, RawTable};

/// Fill colour group for a report header cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderBand {
    Penalty,
    Clawback,
    Standard,
}

impl HeaderBand {
    pub fn classify(column: &str) -> Self {
        if column.starts_with("PENALIDAD 1 -") {
            Self::Penalty
        } else if column.starts_with("CLAWBACK 1 -") {
            Self::Clawback
        } else {
            Self::Standard
        }
    }
}

/// Report-sheet formatting resolved to column indices. Columns named in the
/// variant but absent from the table are dropped here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresentationHints {
    pub percent_columns: Vec<usize>,
    pub currency_columns: Vec<usize>,
    /// One band per report column; empty when bands are off.
    pub header_bands: Vec<HeaderBand>,
}

impl PresentationHints {
    pub fn resolve(config: &HintConfig, report: &RawTable) -> Self {
        let wanted = |names: &[String]| -> Vec<String> {
            names.iter().map(|n| normalize_column_name(n)).collect()
        };
        let percent = wanted(&config.percent_columns);
        let currency = wanted(&config.currency_columns);

        let mut hints = Self::default();
        for (i, col) in report.columns().iter().enumerate() {
            if percent.contains(col) || (config.percent_suffix && col.ends_with('%')) {
                hints.percent_columns.push(i);
            } else if currency.contains(col) {
                hints.currency_columns.push(i);
            }
        }
        if config.header_bands {
            hints.header_bands = report.columns().iter().map(|c| HeaderBand::classify(c)).collect();
        }
        hints
    }

    pub fn is_hinted(&self, col: usize) -> bool {
        self.percent_columns.contains(&col) || self.currency_columns.contains(&col)
    }
}

/// One agency's workbook contents. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub agency: String,
    /// Archive entry name, `.xlsx` included.
    pub entry_name: String,
    pub report_sheet: String,
    pub detail_sheet: String,
    pub report: RawTable,
    pub detail: RawTable,
    pub hints: PresentationHints,
}
