//! Deterministic HTML rendering of a [`Workbook`]: one table per sheet,
//! respecting merges and geometry.

use super::{CellStyle, Merge, Sheet, Workbook, DEFAULT_FONT_SIZE_PT};
use crate::escape::escape_html;
use std::fmt::Write;

const STYLESHEET: &str = "\
body {
    font-family: 'Segoe UI', Arial, sans-serif;
    margin: 24px;
    color: #333;
}
h2 { font-size: 1.2em; margin: 16px 0 8px 0; }
table { border-collapse: collapse; table-layout: fixed; margin-bottom: 24px; }
td { padding: 2px 4px; vertical-align: bottom; overflow: hidden; }
";

/// Render the workbook to a complete HTML document.
pub fn render_html(workbook: &Workbook) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\n");
    out.push_str(STYLESHEET);
    out.push_str("</style>\n</head>\n<body>\n");

    for sheet in &workbook.sheets {
        render_sheet(&mut out, sheet);
    }

    out.push_str("</body></html>");
    out
}

fn render_sheet(out: &mut String, sheet: &Sheet) {
    let _ = writeln!(out, "<h2>{}</h2>", escape_html(&sheet.name));
    out.push_str("<table>\n<colgroup>\n");
    for col in 0..sheet.max_columns {
        match sheet.column_widths.get(&col) {
            Some(width) => {
                let _ = writeln!(out, "<col style=\"width:{:.0}px\">", width);
            }
            None => out.push_str("<col>\n"),
        }
    }
    out.push_str("</colgroup>\n");

    for (row_index, row) in sheet.rows.iter().enumerate() {
        match sheet.row_heights.get(&row_index) {
            Some(height) => {
                let _ = writeln!(out, "<tr style=\"height:{:.0}px\">", height);
            }
            None => out.push_str("<tr>\n"),
        }

        for col in 0..sheet.max_columns {
            let Some(cell) = row.get(col) else {
                // Pad short rows so every row spans the full grid.
                out.push_str("<td></td>\n");
                continue;
            };

            match cell.merge {
                Merge::Covered => continue,
                Merge::Anchor { across, down } => {
                    out.push_str("<td");
                    if across > 0 {
                        let _ = write!(out, " colspan=\"{}\"", across + 1);
                    }
                    if down > 0 {
                        let _ = write!(out, " rowspan=\"{}\"", down + 1);
                    }
                }
                Merge::None => out.push_str("<td"),
            }

            let style = style_attr(&cell.style);
            if !style.is_empty() {
                let _ = write!(out, " style=\"{}\"", style);
            }
            let _ = writeln!(out, ">{}</td>", escape_html(&cell.value));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

/// Inline style declaration for a cell, empty when everything is default.
fn style_attr(style: &CellStyle) -> String {
    if style.is_default() {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();
    if style.bold {
        parts.push("font-weight: bold".to_string());
    }
    if style.italic {
        parts.push("font-style: italic".to_string());
    }
    if style.font_size_pt > 0.0 && style.font_size_pt != DEFAULT_FONT_SIZE_PT {
        parts.push(format!("font-size: {}pt", style.font_size_pt));
    }
    if !style.font_color.is_empty() {
        parts.push(format!("color: #{}", style.font_color));
    }
    if !style.background_color.is_empty() {
        parts.push(format!("background-color: #{}", style.background_color));
    }
    if !style.horizontal_alignment.is_empty() {
        parts.push(format!("text-align: {}", style.horizontal_alignment));
    }
    if !style.border_style.is_empty() {
        parts.push(format!("border: 1px {} #000", style.border_style));
    }
    parts.join("; ")
}
