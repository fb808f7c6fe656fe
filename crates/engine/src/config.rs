use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alias::AliasMap;
use crate::error::SegmentError;
use crate::validate::HeaderRequirement;

/// Names of the built-in variants, in menu order.
pub const PRESET_NAMES: [&str; 4] = ["lima", "provincia", "lima-corte-2", "provincia-corte-2"];

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Everything that distinguishes one report layout from another. The engine
/// is the same for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    /// Human label, used in archive names ("Lima", "Provincia_Corte_2").
    pub label: String,
    #[serde(default = "default_summary_sheet")]
    pub summary_sheet: String,
    #[serde(default = "default_detail_sheet")]
    pub detail_sheet: String,
    #[serde(default)]
    pub schema: HeaderSchema,
    /// Strip a trailing department from Summary agency names.
    #[serde(default)]
    pub suffix_stripping: bool,
    /// Restrict the Detail sheet to one zone before segmenting.
    #[serde(default)]
    pub zone_filter: bool,
    #[serde(default)]
    pub columns: ColumnNames,
    /// Detail columns after the boundary that are still exported.
    #[serde(default)]
    pub extra_detail_columns: Vec<String>,
    #[serde(default)]
    pub required: RequiredHeaders,
    #[serde(default)]
    pub output: OutputNaming,
    /// Explicit agency list. Empty means "every agency in the Summary sheet".
    #[serde(default)]
    pub agencies: Vec<String>,
    #[serde(default)]
    pub hints: HintConfig,
    /// Canonical agency → advisor names used for it in the Detail sheet.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSchema {
    #[default]
    SingleLevel,
    TwoLevel,
}

impl HeaderSchema {
    pub fn header_rows(&self) -> usize {
        match self {
            Self::SingleLevel => 1,
            Self::TwoLevel => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub agency: String,
    pub altas: String,
    pub advisor: String,
    pub zone: String,
    pub department: String,
    /// Last Detail column that belongs in the output.
    pub boundary: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            agency: "AGENCIA".into(),
            altas: "ALTAS".into(),
            advisor: "ASESOR".into(),
            zone: "ZONA".into(),
            department: "DEPARTAMENTO".into(),
            boundary: "RECIBO1_PAGADO".into(),
        }
    }
}

/// Columns checked before loading. `summary_row1` only applies to two-level
/// Summary sheets; `summary` is then checked against row 2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredHeaders {
    pub summary: Vec<String>,
    pub summary_row1: Vec<String>,
    pub detail: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNaming {
    /// Prepended to the sanitized agency name to form the archive entry.
    pub entry_prefix: String,
    pub report_sheet: String,
    pub detail_sheet: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            entry_prefix: "Reporte ".into(),
            report_sheet: "Reporte Agencia".into(),
            detail_sheet: "BASE".into(),
        }
    }
}

/// Presentation-only formatting applied when the report sheet is rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    /// Columns rendered as `0.00%`.
    pub percent_columns: Vec<String>,
    /// Also treat every column whose name ends in `%` as a percentage.
    pub percent_suffix: bool,
    /// Columns rendered as `#,##0.00`.
    pub currency_columns: Vec<String>,
    /// Coloured header cells for the PENALIDAD / CLAWBACK groups.
    pub header_bands: bool,
}

fn default_summary_sheet() -> String {
    "Reporte CORTE 1".into()
}

fn default_detail_sheet() -> String {
    "BASE".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// Characters Excel rejects in a worksheet name.
const FORBIDDEN_IN_SHEET: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Characters that would split or break a ZIP entry name.
const FORBIDDEN_IN_ENTRY: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Why Excel would refuse `name` as a worksheet name, if it would.
fn sheet_name_problem(name: &str) -> Option<String> {
    if name.chars().count() > 31 {
        return Some("is longer than 31 characters".into());
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_IN_SHEET.contains(c)) {
        return Some(format!("must not contain '{c}'"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Some("must not start or end with an apostrophe".into());
    }
    if name.eq_ignore_ascii_case("History") {
        return Some("is reserved by Excel".into());
    }
    None
}

impl VariantConfig {
    pub fn from_toml(input: &str) -> Result<Self, SegmentError> {
        let config: VariantConfig =
            toml::from_str(input).map_err(|e| SegmentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, SegmentError> {
        toml::to_string_pretty(self).map_err(|e| SegmentError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), SegmentError> {
        let invalid = |msg: String| Err(SegmentError::Config(format!("variant '{}': {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(SegmentError::Config("variant name must not be empty".into()));
        }
        for (field, value) in [
            ("summary_sheet", &self.summary_sheet),
            ("detail_sheet", &self.detail_sheet),
            ("columns.agency", &self.columns.agency),
            ("columns.advisor", &self.columns.advisor),
            ("columns.boundary", &self.columns.boundary),
            ("output.report_sheet", &self.output.report_sheet),
            ("output.detail_sheet", &self.output.detail_sheet),
        ] {
            if value.trim().is_empty() {
                return invalid(format!("{field} must not be empty"));
            }
        }

        for (field, value) in [
            ("output.report_sheet", &self.output.report_sheet),
            ("output.detail_sheet", &self.output.detail_sheet),
        ] {
            if let Some(problem) = sheet_name_problem(value) {
                return invalid(format!("{field} '{value}' {problem}"));
            }
        }
        if let Some(c) = self.output.entry_prefix.chars().find(|c| FORBIDDEN_IN_ENTRY.contains(c)) {
            return invalid(format!("output.entry_prefix must not contain '{c}'"));
        }

        if self.output.report_sheet.eq_ignore_ascii_case(&self.output.detail_sheet) {
            return invalid("output sheets must have different names".into());
        }

        if self.schema == HeaderSchema::SingleLevel && !self.required.summary_row1.is_empty() {
            return invalid("required.summary_row1 needs schema = \"two_level\"".into());
        }

        let detail_requires = |col: &str| {
            self.required.detail.iter().any(|c| c.trim().eq_ignore_ascii_case(col.trim()))
        };
        if self.zone_filter && !detail_requires(&self.columns.zone) {
            return invalid(format!(
                "zone_filter needs '{}' in required.detail",
                self.columns.zone
            ));
        }
        if self.suffix_stripping && !detail_requires(&self.columns.department) {
            return invalid(format!(
                "suffix_stripping needs '{}' in required.detail",
                self.columns.department
            ));
        }

        self.alias_map().map(|_| ())
    }

    /// Validated alias map for this variant.
    pub fn alias_map(&self) -> Result<AliasMap, SegmentError> {
        AliasMap::from_entries(&self.aliases)
    }

    pub fn summary_requirement(&self) -> HeaderRequirement {
        match self.schema {
            HeaderSchema::SingleLevel => HeaderRequirement::SingleRow(self.required.summary.clone()),
            HeaderSchema::TwoLevel => HeaderRequirement::TwoRow {
                row1: self.required.summary_row1.clone(),
                row2: self.required.summary.clone(),
            },
        }
    }

    pub fn detail_requirement(&self) -> HeaderRequirement {
        HeaderRequirement::SingleRow(self.required.detail.clone())
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "lima" => Some(Self::lima()),
            "provincia" => Some(Self::provincia()),
            "lima-corte-2" => Some(Self::lima_corte_2()),
            "provincia-corte-2" => Some(Self::provincia_corte_2()),
            _ => None,
        }
    }

    pub fn presets() -> Vec<Self> {
        PRESET_NAMES.iter().filter_map(|n| Self::preset(n)).collect()
    }

    fn base(name: &str, label: &str) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            summary_sheet: default_summary_sheet(),
            detail_sheet: default_detail_sheet(),
            schema: HeaderSchema::SingleLevel,
            suffix_stripping: false,
            zone_filter: false,
            columns: ColumnNames::default(),
            extra_detail_columns: Vec::new(),
            required: RequiredHeaders::default(),
            output: OutputNaming::default(),
            agencies: Vec::new(),
            hints: HintConfig::default(),
            aliases: BTreeMap::new(),
        }
    }

    fn lima() -> Self {
        let mut v = Self::base("lima", "Lima_Segmentados");
        v.required.summary = strings(&["AGENCIA", "RUC", "ALTAS", "TOTAL A PAGAR"]);
        v.required.detail = strings(&["COD_PEDIDO", "DNI_CLIENTE", "ASESOR"]);
        v.hints.percent_columns = strings(&["CUMPLIMIENTO ALTAS %"]);
        v.hints.currency_columns = strings(&["TOTAL A PAGAR"]);
        v.aliases = exportel_aliases();
        v
    }

    fn provincia() -> Self {
        let mut v = Self::base("provincia", "Provincia");
        v.suffix_stripping = true;
        v.zone_filter = true;
        v.extra_detail_columns = strings(&["ZONA"]);
        v.required.summary = strings(&["AGENCIA", "RUC", "ALTAS"]);
        v.required.detail = strings(&["COD_PEDIDO", "ASESOR", "ZONA", "DEPARTAMENTO"]);
        v.aliases = exportel_aliases();
        v
    }

    fn lima_corte_2() -> Self {
        let mut v = Self::base("lima-corte-2", "Lima_Corte_2_Segmentados");
        v.summary_sheet = "Reporte CORTE 2".into();
        v.schema = HeaderSchema::TwoLevel;
        v.required.summary_row1 = strings(&["PENALIDAD 1", "CLAWBACK 1"]);
        v.required.summary = strings(&["RUC", "AGENCIA", "ALTAS", "TOTAL A PAGAR CORTE 2"]);
        v.required.detail = strings(&["ASESOR", "COD_PEDIDO"]);
        v.output.entry_prefix = "Reporte Corte 2 ".into();
        v.output.report_sheet = "Reporte CORTE 2".into();
        v.hints = corte_2_hints();
        v
    }

    fn provincia_corte_2() -> Self {
        let mut v = Self::base("provincia-corte-2", "Provincia_Corte_2");
        v.summary_sheet = "Reporte CORTE 2".into();
        v.schema = HeaderSchema::TwoLevel;
        v.suffix_stripping = true;
        v.required.summary_row1 = strings(&["PENALIDAD 1", "CLAWBACK 1"]);
        v.required.summary = strings(&["RUC", "AGENCIA", "ALTAS", "TOTAL A PAGAR CORTE 2"]);
        v.required.detail = strings(&["ASESOR", "DEPARTAMENTO"]);
        v.output.entry_prefix = "Reporte Provincia Corte 2 ".into();
        v.output.report_sheet = "Reporte CORTE 2".into();
        v.hints = corte_2_hints();
        v.aliases = exportel_aliases();
        v
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn exportel_aliases() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(
        "EXPORTEL SAC".to_string(),
        strings(&["EXPORTEL SAC", "EXPORTEL PROVINCIA"]),
    )])
}

fn corte_2_hints() -> HintConfig {
    HintConfig {
        percent_columns: strings(&["CUMPLIMIENTO ALTAS %", "CLAWBACK 1 - CUMPLIMIENTO CORTE 2 %"]),
        percent_suffix: false,
        currency_columns: Vec::new(),
        header_bands: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
