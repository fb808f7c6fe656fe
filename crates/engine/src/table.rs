//! In-memory tables loaded from the Summary and Detail sheets.
//!
//! Column names are trimmed and uppercased on ingestion. The original casing
//! is not kept anywhere.

use std::collections::HashMap;

/// One scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell, or `Empty` for blank strings.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Display text. Integral numbers print without decimals.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
        }
    }

    /// Numeric value of a number cell or of text that parses as one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Whole-number value, used for count fields such as ALTAS.
    pub fn as_count(&self) -> Option<i64> {
        let n = self.as_number()?;
        if n.fract() == 0.0 && n.abs() < 1e15 {
            Some(n as i64)
        } else {
            None
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

/// Merged cell region, zero-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergedRegion {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

/// A worksheet as read from the source: physical rows starting at row 1,
/// physical columns starting at column A.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    pub rows: Vec<Vec<Cell>>,
    pub merges: Vec<MergedRegion>,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows, merges: Vec::new() }
    }

    pub fn with_merges(mut self, merges: Vec<MergedRegion>) -> Self {
        self.merges = merges;
        self
    }

    /// First `count` physical rows as trimmed strings. Missing rows come back empty.
    pub fn header_rows(&self, count: usize) -> Vec<Vec<String>> {
        (0..count)
            .map(|r| {
                self.rows
                    .get(r)
                    .map(|row| row.iter().map(|c| c.to_text().trim().to_string()).collect())
                    .unwrap_or_default()
            })
            .collect()
    }

    fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&Cell::Empty)
    }
}

/// Canonical column name: trimmed, uppercased, inner newlines as spaces.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace(['\r', '\n'], " ").to_uppercase()
}

/// Rename empty headers to `UNNAMED: <i>` and suffix repeats with `.1`, `.2`, …
fn dedupe_columns(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = if name.is_empty() { format!("UNNAMED: {i}") } else { name };
            let count = seen.entry(name.clone()).or_insert(0);
            let out = if *count == 0 { name } else { format!("{name}.{count}") };
            *count += 1;
            out
        })
        .collect()
}

fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_empty)
}

/// Table with a single header row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, normalizing column names and padding/cutting rows to width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let columns = dedupe_columns(columns.iter().map(|c| normalize_column_name(c)).collect());
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Header on physical row 1, data below. Blank data rows are dropped.
    pub fn from_grid(grid: &SheetGrid) -> Self {
        let width = grid.width();
        let columns = (0..width).map(|c| grid.cell(0, c).to_text()).collect();
        let rows = grid
            .rows
            .iter()
            .skip(1)
            .filter(|row| !is_blank_row(row))
            .cloned()
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, compared after name normalization.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_column_name(name);
        self.columns.iter().position(|c| *c == wanted)
    }

    pub fn value(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&Cell::Empty)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&Cell::Empty))
    }

    /// New table with the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> RawTable {
        RawTable {
            columns: self.columns.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }

    /// New table with the rows for which `keep` is true.
    pub fn filter_rows(&self, keep: impl Fn(&[Cell]) -> bool) -> RawTable {
        RawTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Columns up to and including `boundary`, then any `extra` columns that sit
    /// after it, in source order. `None` when the boundary column is absent.
    pub fn truncate_through(&self, boundary: &str, extra: &[String]) -> Option<RawTable> {
        let end = self.column_index(boundary)?;
        let extra: Vec<String> = extra.iter().map(|e| normalize_column_name(e)).collect();
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| i <= end || extra.contains(&self.columns[i]))
            .collect();

        Some(RawTable {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}

/// One column's two-level identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub outer: String,
    pub inner: String,
}

impl HeaderPair {
    pub fn new(outer: &str, inner: &str) -> Self {
        Self {
            outer: normalize_column_name(outer),
            inner: normalize_column_name(inner),
        }
    }

    pub fn flatten(&self) -> String {
        flatten_header(&self.outer, &self.inner)
    }
}

/// Single label for a two-level header: the inner label alone when the outer
/// one is blank, "unnamed", or a repeat of the inner; otherwise `outer - inner`.
pub fn flatten_header(outer: &str, inner: &str) -> String {
    let outer = outer.trim();
    let inner = inner.trim().replace(['\r', '\n'], " ");
    if outer.is_empty() || outer.to_lowercase().contains("unnamed") || outer == inner {
        inner
    } else {
        format!("{outer} - {inner}")
    }
}

/// Table whose header spans physical rows 1 and 2.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLevelTable {
    columns: Vec<HeaderPair>,
    rows: Vec<Vec<Cell>>,
}

impl MultiLevelTable {
    pub fn new(columns: Vec<HeaderPair>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Outer labels on row 1, inner labels on row 2, data below.
    ///
    /// A blank outer cell inside a merged region on row 1 takes the label of
    /// the region's first cell; other blank outer cells stay blank.
    pub fn from_grid(grid: &SheetGrid) -> Self {
        let width = grid.width();
        let columns = (0..width)
            .map(|c| {
                let mut outer = grid.cell(0, c).to_text();
                if outer.trim().is_empty() {
                    if let Some(region) = grid.merges.iter().find(|m| m.contains(0, c)) {
                        outer = grid.cell(region.first_row, region.first_col).to_text();
                    }
                }
                HeaderPair::new(&outer, &grid.cell(1, c).to_text())
            })
            .collect();
        let rows = grid
            .rows
            .iter()
            .skip(2)
            .filter(|row| !is_blank_row(row))
            .cloned()
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[HeaderPair] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column whose inner label matches `inner`.
    pub fn column_index_by_inner(&self, inner: &str) -> Option<usize> {
        let wanted = normalize_column_name(inner);
        self.columns.iter().position(|p| p.inner == wanted)
    }

    /// Flatten to a single header row. Column order is unchanged, so indices
    /// found on the two-level table stay valid.
    pub fn flatten(&self) -> RawTable {
        RawTable::new(
            self.columns.iter().map(HeaderPair::flatten).collect(),
            self.rows.clone(),
        )
    }
}
