use std::fmt;

/// Fatal failures. Any of these aborts the run with zero output; everything
/// recoverable goes into the reconciliation log instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentError {
    /// Variant config parse / validation error (bad TOML, overlapping aliases, etc.).
    Config(String),
    /// The input could not be opened as a workbook.
    Unreadable(String),
    /// A required sheet is not in the workbook.
    MissingSheet { sheet: String },
    /// Header validation failed.
    MissingHeaders { sheet: String, missing: Vec<String> },
    /// A column the engine needs is absent after loading.
    MissingColumn { sheet: String, column: String },
    /// The Detail boundary column is absent; the output schema is undefined.
    MissingBoundaryColumn { sheet: String, column: String },
    /// The variant filters by zone but no zone was requested.
    ZoneRequired,
    /// No Detail rows carry the requested zone.
    EmptyZone { zone: String },
    /// No Summary agency has advisors in the requested zone.
    NoAgenciesForZone { zone: String },
    /// An agency workbook could not be rendered.
    Render { agency: String, message: String },
    /// The ZIP container could not be written.
    Archive(String),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Unreadable(msg) => write!(f, "cannot read workbook: {msg}"),
            Self::MissingSheet { sheet } => write!(f, "sheet '{sheet}' not found"),
            Self::MissingHeaders { sheet, missing } => {
                write!(f, "sheet '{sheet}': expected headers not found: {}", missing.join(", "))
            }
            Self::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}': missing column '{column}'")
            }
            Self::MissingBoundaryColumn { sheet, column } => {
                write!(f, "sheet '{sheet}': boundary column '{column}' not found")
            }
            Self::ZoneRequired => write!(f, "this variant requires a zone"),
            Self::EmptyZone { zone } => write!(f, "no Detail rows found for zone '{zone}'"),
            Self::NoAgenciesForZone { zone } => {
                write!(f, "no Summary agencies have Detail rows in zone '{zone}'")
            }
            Self::Render { agency, message } => {
                write!(f, "cannot render workbook for '{agency}': {message}")
            }
            Self::Archive(msg) => write!(f, "cannot write archive: {msg}"),
        }
    }
}

impl std::error::Error for SegmentError {}
