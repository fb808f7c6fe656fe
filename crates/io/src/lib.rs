//! `segmenter-io` - workbook reading, per-agency xlsx rendering and the
//! ZIP archive.

pub mod archive;
pub mod pipeline;
pub mod render;
pub mod source;

pub use archive::{build_archive, default_archive_name, Archive, ArchiveEntry};
pub use pipeline::{segment_workbook, SegmentedWorkbook};
pub use render::render_artifact;
pub use source::XlsxSource;
