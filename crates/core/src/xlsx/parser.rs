//! Workbook parsing on top of umya-spreadsheet.
//!
//! Extracts cell values as presented to the user, the merge map, per-cell
//! styles, and sheet geometry (column widths, row heights).

use super::{Cell, CellStyle, Merge, Sheet, Workbook, DEFAULT_FONT_SIZE_PT};
use crate::error::{ConvertError, Result};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Excel column-width units to approximate pixels.
const PX_PER_WIDTH_UNIT: f64 = 7.0;

/// Parser for XLSX workbooks.
#[derive(Debug, Default)]
pub struct XlsxParser;

impl XlsxParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a workbook from a file path.
    pub fn parse_path(&self, path: &Path) -> Result<Workbook> {
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| ConvertError::parse(format!("reading workbook: {e}")))?;
        Ok(build_workbook(&book))
    }

    /// Parse a workbook from bytes.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<Workbook> {
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(data), true)
            .map_err(|e| ConvertError::parse(format!("reading workbook: {e}")))?;
        Ok(build_workbook(&book))
    }
}

fn build_workbook(book: &Spreadsheet) -> Workbook {
    Workbook {
        sheets: book
            .get_sheet_collection()
            .iter()
            .map(build_sheet)
            .collect(),
    }
}

fn build_sheet(sheet: &Worksheet) -> Sheet {
    let max_col = sheet.get_highest_column();
    let max_row = sheet.get_highest_row();

    let merge_ranges: Vec<String> = sheet
        .get_merge_cells()
        .iter()
        .map(|mc| mc.get_range())
        .collect();
    let merge_map = build_merge_map(&merge_ranges);

    let mut column_widths = HashMap::new();
    for col_idx in 1..=max_col {
        if let Some(dim) = sheet.get_column_dimension_by_number(&col_idx) {
            let width = *dim.get_width();
            if width > 0.0 {
                column_widths.insert((col_idx - 1) as usize, width * PX_PER_WIDTH_UNIT);
            }
        }
    }

    let mut row_heights = HashMap::new();
    for row_idx in 1..=max_row {
        if let Some(dim) = sheet.get_row_dimension(&row_idx) {
            let height = *dim.get_height();
            if height > 0.0 {
                row_heights.insert((row_idx - 1) as usize, height);
            }
        }
    }

    let mut rows = Vec::with_capacity(max_row as usize);
    for row_idx in 1..=max_row {
        let mut row = Vec::with_capacity(max_col as usize);
        for col_idx in 1..=max_col {
            let (value, style) = match sheet.get_cell((col_idx, row_idx)) {
                Some(cell) => (
                    cell.get_value().to_string(),
                    extract_style(cell.get_style()),
                ),
                None => (String::new(), CellStyle::default()),
            };
            let position = ((row_idx - 1) as usize, (col_idx - 1) as usize);
            row.push(Cell {
                value,
                row: position.0,
                col: position.1,
                style,
                merge: merge_map.get(&position).copied().unwrap_or(Merge::None),
            });
        }
        rows.push(row);
    }

    Sheet {
        name: sheet.get_name().to_string(),
        rows,
        max_columns: max_col as usize,
        max_rows: max_row as usize,
        column_widths,
        row_heights,
    }
}

/// Build the merge map from `A1:B2`-style range strings: one `Anchor` at each
/// range's top-left, `Covered` everywhere else in the rectangle.
fn build_merge_map(ranges: &[String]) -> HashMap<(usize, usize), Merge> {
    let mut map = HashMap::new();
    for range in ranges {
        let Some((start_row, start_col, end_row, end_col)) = parse_cell_range(range) else {
            continue;
        };
        map.insert(
            (start_row, start_col),
            Merge::Anchor {
                across: end_col.saturating_sub(start_col),
                down: end_row.saturating_sub(start_row),
            },
        );
        for row in start_row..=end_row {
            for col in start_col..=end_col {
                if (row, col) != (start_row, start_col) {
                    map.insert((row, col), Merge::Covered);
                }
            }
        }
    }
    map
}

fn extract_style(style: &umya_spreadsheet::Style) -> CellStyle {
    let mut out = CellStyle::default();

    if let Some(font) = style.get_font() {
        out.bold = *font.get_bold();
        out.italic = *font.get_italic();
        let size = *font.get_size();
        if size > 0.0 {
            out.font_size_pt = size;
        } else {
            out.font_size_pt = DEFAULT_FONT_SIZE_PT;
        }
        out.font_color = hex6(font.get_color().get_argb());
    }

    if let Some(color) = style
        .get_fill()
        .and_then(|f| f.get_pattern_fill())
        .and_then(|pf| pf.get_foreground_color())
    {
        out.background_color = hex6(color.get_argb());
    }

    if let Some(alignment) = style.get_alignment() {
        let horizontal = format!("{:?}", alignment.get_horizontal()).to_lowercase();
        out.horizontal_alignment = match horizontal.as_str() {
            "left" | "center" | "right" => horizontal,
            _ => String::new(),
        };
    }

    if let Some(borders) = style.get_borders() {
        let sides = [
            borders.get_left(),
            borders.get_right(),
            borders.get_top(),
            borders.get_bottom(),
        ];
        for side in sides {
            let name = side.get_border_style();
            if !name.is_empty() && name != "none" {
                out.border_style = map_border_style(name).to_string();
                break;
            }
        }
    }

    out
}

/// Map a named border style to its CSS rendering. Thin, medium, and thick
/// lines all render solid; anything unrecognised but present renders solid.
fn map_border_style(name: &str) -> &'static str {
    match name {
        "dashed" => "dashed",
        "dotted" => "dotted",
        "double" => "double",
        _ => "solid",
    }
}

/// Last six hex digits of an ARGB string, or empty when absent.
fn hex6(argb: &str) -> String {
    if argb.len() >= 6 {
        argb[argb.len() - 6..].to_string()
    } else {
        String::new()
    }
}

/// Parse an `A1:B2` range to `(start_row, start_col, end_row, end_col)`,
/// zero-indexed.
fn parse_cell_range(range: &str) -> Option<(usize, usize, usize, usize)> {
    let (start, end) = range.split_once(':')?;
    let (start_col, start_row) = parse_cell_ref(start)?;
    let (end_col, end_row) = parse_cell_ref(end)?;
    Some((start_row, start_col, end_row, end_col))
}

/// Parse an `A1`-style reference to `(col, row)`, zero-indexed.
fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let cell_ref = cell_ref.trim();
    let mut col = 0usize;
    let mut row_digits = String::new();

    for c in cell_ref.chars() {
        if c.is_ascii_alphabetic() {
            col = col * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
        } else if c.is_ascii_digit() {
            row_digits.push(c);
        }
    }

    let row: usize = row_digits.parse().ok()?;
    if col == 0 || row == 0 {
        return None;
    }
    Some((col - 1, row - 1))
}
