//! `segmenter-engine` - splits a consolidated commission workbook into one
//! report per agency and reconciles ALTAS against Detail rows.
//!
//! Pure engine crate: reads sheets through [`TabularSource`], returns
//! artifacts plus a reconciliation log. No file IO.

pub mod alias;
pub mod artifact;
pub mod config;
pub mod department;
pub mod error;
pub mod log;
pub mod normalize;
pub mod segment;
pub mod source;
pub mod table;
pub mod validate;

pub use alias::AliasMap;
pub use artifact::{HeaderBand, OutputArtifact, PresentationHints};
pub use config::{HeaderSchema, VariantConfig, PRESET_NAMES};
pub use error::SegmentError;
pub use log::{AgencyOutcome, LineLevel, OutcomeKind, ReconciliationLog};
pub use normalize::{normalize, sanitize_file_stem, AgencyKey};
pub use segment::{discover_zones, RunReport, RunRequest, Segmenter, Stage};
pub use source::{MemorySource, TabularSource};
pub use table::{Cell, MergedRegion, MultiLevelTable, RawTable, SheetGrid};
