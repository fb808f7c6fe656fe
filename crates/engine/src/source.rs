//! Where sheets come from. The engine only sees this trait.

use crate::error::SegmentError;
use crate::table::{Cell, MergedRegion, MultiLevelTable, RawTable, SheetGrid};

/// Read-only access to the sheets of one workbook.
///
/// Implementors load a sheet's grid on first request and may cache it, hence
/// `&mut self`.
pub trait TabularSource {
    fn sheet_names(&self) -> Vec<String>;

    /// Physical grid of `name`, row 1 at index 0.
    fn sheet(&mut self, name: &str) -> Result<&SheetGrid, SegmentError>;

    fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|s| s == name)
    }

    /// First `count` physical rows as trimmed strings.
    fn header_rows(&mut self, name: &str, count: usize) -> Result<Vec<Vec<String>>, SegmentError> {
        Ok(self.sheet(name)?.header_rows(count))
    }

    /// Single header row on physical row 1.
    fn single_level(&mut self, name: &str) -> Result<RawTable, SegmentError> {
        Ok(RawTable::from_grid(self.sheet(name)?))
    }

    /// Header on physical rows 1 and 2.
    fn multi_level(&mut self, name: &str) -> Result<MultiLevelTable, SegmentError> {
        Ok(MultiLevelTable::from_grid(self.sheet(name)?))
    }
}

/// In-memory workbook. Sheet order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: Vec<(String, SheetGrid)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, name: &str, rows: Vec<Vec<Cell>>) -> Self {
        self.with_grid(name, SheetGrid::new(rows))
    }

    pub fn with_merged_sheet(
        self,
        name: &str,
        rows: Vec<Vec<Cell>>,
        merges: Vec<MergedRegion>,
    ) -> Self {
        self.with_grid(name, SheetGrid::new(rows).with_merges(merges))
    }

    pub fn with_grid(mut self, name: &str, grid: SheetGrid) -> Self {
        self.sheets.retain(|(n, _)| n != name);
        self.sheets.push((name.to_string(), grid));
        self
    }
}

impl TabularSource for MemorySource {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn sheet(&mut self, name: &str) -> Result<&SheetGrid, SegmentError> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| g)
            .ok_or_else(|| SegmentError::MissingSheet { sheet: name.to_string() })
    }
}
