//! One agency workbook: report sheet plus detail sheet.

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use segmenter_engine::artifact::{HeaderBand, OutputArtifact, PresentationHints};
use segmenter_engine::table::{Cell, RawTable};
use segmenter_engine::SegmentError;

/// Width applied to columns that carry a number format.
pub const HINTED_COLUMN_WIDTH: f64 = 18.0;

const PENALTY_FILL: u32 = 0x0070C0;
const CLAWBACK_FILL: u32 = 0x002060;
const STANDARD_FILL: u32 = 0xFFC000;

/// Render an artifact to xlsx bytes.
pub fn render_artifact(artifact: &OutputArtifact) -> Result<Vec<u8>, SegmentError> {
    let err = |e: XlsxError| SegmentError::Render {
        agency: artifact.agency.clone(),
        message: e.to_string(),
    };

    let mut workbook = Workbook::new();

    let report = workbook.add_worksheet().set_name(&artifact.report_sheet).map_err(err)?;
    write_table(report, &artifact.report, &artifact.hints).map_err(err)?;

    let detail = workbook.add_worksheet().set_name(&artifact.detail_sheet).map_err(err)?;
    write_table(detail, &artifact.detail, &PresentationHints::default()).map_err(err)?;

    workbook.save_to_buffer().map_err(err)
}

struct Formats {
    header: Format,
    penalty: Format,
    clawback: Format,
    standard: Format,
    percent: Format,
    currency: Format,
}

impl Formats {
    fn new() -> Self {
        let band = |font: Color, fill: u32| {
            Format::new()
                .set_bold()
                .set_border(FormatBorder::Thin)
                .set_font_color(font)
                .set_background_color(Color::RGB(fill))
        };
        Self {
            header: Format::new().set_bold().set_border(FormatBorder::Thin),
            penalty: band(Color::White, PENALTY_FILL),
            clawback: band(Color::White, CLAWBACK_FILL),
            standard: band(Color::Black, STANDARD_FILL),
            percent: Format::new().set_num_format("0.00%"),
            currency: Format::new().set_num_format("#,##0.00"),
        }
    }

    fn header_for(&self, band: Option<&HeaderBand>) -> &Format {
        match band {
            Some(HeaderBand::Penalty) => &self.penalty,
            Some(HeaderBand::Clawback) => &self.clawback,
            Some(HeaderBand::Standard) => &self.standard,
            None => &self.header,
        }
    }
}

fn write_table(ws: &mut Worksheet, table: &RawTable, hints: &PresentationHints) -> Result<(), XlsxError> {
    let formats = Formats::new();

    for (c, name) in table.columns().iter().enumerate() {
        let col = c as u16;
        ws.write_string_with_format(0, col, name, formats.header_for(hints.header_bands.get(c)))?;
        if hints.is_hinted(c) {
            ws.set_column_width(col, HINTED_COLUMN_WIDTH)?;
        }
    }

    for (r, row) in table.rows().iter().enumerate() {
        let xr = r as u32 + 1;
        for (c, cell) in row.iter().enumerate() {
            let col = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    ws.write_string(xr, col, s)?;
                }
                Cell::Number(n) => {
                    if hints.percent_columns.contains(&c) {
                        ws.write_number_with_format(xr, col, *n, &formats.percent)?;
                    } else if hints.currency_columns.contains(&c) {
                        ws.write_number_with_format(xr, col, *n, &formats.currency)?;
                    } else {
                        ws.write_number(xr, col, *n)?;
                    }
                }
            }
        }
    }
    Ok(())
}
