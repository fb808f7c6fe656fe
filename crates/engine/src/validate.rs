//! Pre-load header checks. Only the header rows are read.

use crate::error::SegmentError;
use crate::log::ReconciliationLog;
use crate::source::TabularSource;

/// Columns a sheet must carry before it is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRequirement {
    /// All names must appear on physical row 1.
    SingleRow(Vec<String>),
    /// `row1` names on physical row 1 and `row2` names on physical row 2.
    TwoRow { row1: Vec<String>, row2: Vec<String> },
}

impl HeaderRequirement {
    pub fn rows_needed(&self) -> usize {
        match self {
            Self::SingleRow(_) => 1,
            Self::TwoRow { .. } => 2,
        }
    }
}

/// Required names absent from `present`, compared trimmed and case-insensitively.
pub fn missing_headers(required: &[String], present: &[String]) -> Vec<String> {
    let present: Vec<String> = present.iter().map(|p| p.trim().to_uppercase()).collect();
    required
        .iter()
        .filter(|r| !present.contains(&r.trim().to_uppercase()))
        .cloned()
        .collect()
}

/// Every missing name, row 1 first.
pub fn check_requirement(requirement: &HeaderRequirement, header_rows: &[Vec<String>]) -> Vec<String> {
    let row = |i: usize| header_rows.get(i).map(Vec::as_slice).unwrap_or(&[]);
    match requirement {
        HeaderRequirement::SingleRow(cols) => missing_headers(cols, row(0)),
        HeaderRequirement::TwoRow { row1, row2 } => {
            let mut missing = missing_headers(row1, row(0));
            missing.extend(missing_headers(row2, row(1)));
            missing
        }
    }
}

/// Read the header rows of `sheet` and fail with every missing name.
pub fn require_headers(
    source: &mut dyn TabularSource,
    sheet: &str,
    requirement: &HeaderRequirement,
) -> Result<(), SegmentError> {
    let rows = source.header_rows(sheet, requirement.rows_needed())?;
    let missing = check_requirement(requirement, &rows);
    if missing.is_empty() {
        return Ok(());
    }
    tracing::warn!(sheet, ?missing, "required headers missing");
    Err(SegmentError::MissingHeaders { sheet: sheet.to_string(), missing })
}

/// Check `sheet` against `requirement`. Never fails: problems become one
/// ALERT line and a `false` return.
pub fn validate(
    source: &mut dyn TabularSource,
    sheet: &str,
    requirement: &HeaderRequirement,
    log: &mut ReconciliationLog,
) -> bool {
    match require_headers(source, sheet, requirement) {
        Ok(()) => true,
        Err(e) => {
            log.alert(e.to_string());
            false
        }
    }
}
