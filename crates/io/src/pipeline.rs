//! Workbook in, archive plus log out.

use segmenter_engine::{ReconciliationLog, RunRequest, SegmentError, Segmenter, Stage, TabularSource};

use crate::archive::{build_archive, Archive};

/// Result of segmenting one workbook end to end.
#[derive(Debug)]
pub struct SegmentedWorkbook {
    pub log: ReconciliationLog,
    pub archive: Result<Archive, SegmentError>,
    /// Set when the engine aborted before producing artifacts.
    pub failed_at: Option<Stage>,
}

impl SegmentedWorkbook {
    pub fn is_failed(&self) -> bool {
        self.archive.is_err()
    }
}

/// Run the engine and archive its artifacts. A fatal engine error produces
/// no archive.
pub fn segment_workbook(
    source: &mut dyn TabularSource,
    segmenter: &Segmenter,
    request: &RunRequest,
) -> SegmentedWorkbook {
    let report = segmenter.run(source, request);
    let mut log = report.log;

    let archive = match report.result {
        Ok(artifacts) => {
            let archive = build_archive(&artifacts, &mut log);
            match &archive {
                Ok(a) => {
                    log.info(format!("{} workbooks archived", a.entries.len()));
                    log.info("--- END ---");
                }
                Err(e) => log.alert(e.to_string()),
            }
            archive
        }
        Err(e) => Err(e),
    };

    SegmentedWorkbook { log, archive, failed_at: report.failed_at }
}
