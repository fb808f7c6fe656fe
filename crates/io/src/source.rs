//! Workbook reader over calamine. Opens xlsx, xls, xlsb and ods.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx, XlsxError};
use segmenter_engine::source::TabularSource;
use segmenter_engine::table::{Cell, MergedRegion, SheetGrid};
use segmenter_engine::SegmentError;

/// A workbook held in memory. Sheets are decoded on first access and cached.
pub struct XlsxSource {
    workbook: Sheets<Cursor<Vec<u8>>>,
    names: Vec<String>,
    grids: HashMap<String, SheetGrid>,
}

impl XlsxSource {
    /// Open an uploaded workbook from its bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SegmentError> {
        if bytes.is_empty() {
            return Err(SegmentError::Unreadable("input is empty".into()));
        }
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| SegmentError::Unreadable(e.to_string()))?;
        let names = workbook.sheet_names().to_vec();
        tracing::debug!(sheets = ?names, "workbook opened");
        Ok(Self { workbook, names, grids: HashMap::new() })
    }

    pub fn open(path: &Path) -> Result<Self, SegmentError> {
        let bytes = std::fs::read(path)
            .map_err(|e| SegmentError::Unreadable(format!("{}: {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    fn load_grid(&mut self, name: &str) -> Result<SheetGrid, SegmentError> {
        if !self.names.iter().any(|n| n == name) {
            return Err(SegmentError::MissingSheet { sheet: name.to_string() });
        }
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|e| SegmentError::Unreadable(format!("sheet '{name}': {e}")))?;

        // The used range may start below row 1 or right of column A; pad so
        // that index 0 is always physical row 1 / column A.
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
        for data_row in range.rows() {
            let mut row = vec![Cell::Empty; start_col as usize];
            row.extend(data_row.iter().map(to_cell));
            rows.push(row);
        }

        let merges = self.merged_regions(name);
        tracing::debug!(sheet = name, rows = rows.len(), merges = merges.len(), "sheet decoded");
        Ok(SheetGrid::new(rows).with_merges(merges))
    }

    /// Merged regions are only available for xlsx.
    fn merged_regions(&mut self, name: &str) -> Vec<MergedRegion> {
        let dims = match &mut self.workbook {
            Sheets::Xlsx(xlsx) => match xlsx.worksheet_merge_cells(name) {
                Some(Ok(dims)) => dims,
                Some(Err(e)) => {
                    tracing::warn!(sheet = name, error = %e, "cannot read merged cells");
                    Vec::new()
                }
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        dims.into_iter()
            .map(|d| MergedRegion {
                first_row: d.start.0 as usize,
                first_col: d.start.1 as usize,
                last_row: d.end.0 as usize,
                last_col: d.end.1 as usize,
            })
            .collect()
    }
}

impl TabularSource for XlsxSource {
    fn sheet_names(&self) -> Vec<String> {
        self.names.clone()
    }

    /// For xlsx, streams cells and stops after the header rows, so a bad
    /// header is rejected without decoding the whole sheet.
    fn header_rows(&mut self, name: &str, count: usize) -> Result<Vec<Vec<String>>, SegmentError> {
        if let Some(grid) = self.grids.get(name) {
            return Ok(grid.header_rows(count));
        }
        if !self.names.iter().any(|n| n == name) {
            return Err(SegmentError::MissingSheet { sheet: name.to_string() });
        }
        if let Sheets::Xlsx(xlsx) = &mut self.workbook {
            return read_xlsx_header(xlsx, name, count);
        }
        Ok(self.sheet(name)?.header_rows(count))
    }

    fn sheet(&mut self, name: &str) -> Result<&SheetGrid, SegmentError> {
        if !self.grids.contains_key(name) {
            let grid = self.load_grid(name)?;
            self.grids.insert(name.to_string(), grid);
        }
        self.grids
            .get(name)
            .ok_or_else(|| SegmentError::MissingSheet { sheet: name.to_string() })
    }
}

fn read_xlsx_header(
    xlsx: &mut Xlsx<Cursor<Vec<u8>>>,
    name: &str,
    count: usize,
) -> Result<Vec<Vec<String>>, SegmentError> {
    let unreadable = |e: XlsxError| SegmentError::Unreadable(format!("sheet '{name}': {e}"));
    let mut reader = xlsx.worksheet_cells_reader(name).map_err(unreadable)?;
    let mut rows = vec![Vec::new(); count];

    // Cells arrive in row order.
    while let Some(cell) = reader.next_cell().map_err(unreadable)? {
        let (row, col) = cell.get_position();
        let (row, col) = (row as usize, col as usize);
        if row >= count {
            break;
        }
        let text = to_cell(&Data::from(cell.get_value().clone())).to_text().trim().to_string();
        let line: &mut Vec<String> = &mut rows[row];
        if line.len() <= col {
            line.resize(col + 1, String::new());
        }
        line[col] = text;
    }
    tracing::debug!(sheet = name, rows = count, "header rows streamed");
    Ok(rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Dates keep their serial number.
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}
