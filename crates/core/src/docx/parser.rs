//! Streaming parser for the `word/document.xml` part of a DOCX package.
//!
//! A shallow state machine over the pull parser's events tracks the current
//! paragraph/run/table frames. Unknown elements and attributes are ignored,
//! which keeps the parser tolerant of the many WordprocessingML features it
//! does not model.

use super::{
    Alignment, DocumentTree, Element, Paragraph, Table, TableCell, TableRow, TextRun,
};
use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Parser for DOCX byte slices.
#[derive(Debug, Default)]
pub struct DocxParser;

impl DocxParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a DOCX file from bytes.
    pub fn parse(&self, data: &[u8]) -> Result<DocumentTree> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| ConvertError::parse(format!("opening docx as zip: {e}")))?;

        let xml = {
            let mut entry = archive
                .by_name("word/document.xml")
                .map_err(|_| ConvertError::parse("document.xml not found"))?;
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| ConvertError::parse(format!("reading document.xml: {e}")))?;
            content
        };

        parse_document_xml(&xml)
    }
}

/// Accumulators for the element currently being built at each nesting level.
#[derive(Default)]
struct ParseState {
    elements: Vec<Element>,
    paragraph: Option<Paragraph>,
    table: Option<Table>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
    run: Option<TextRun>,
    run_text: String,
    in_run_properties: bool,
    in_text: bool,
}

fn parse_document_xml(xml: &str) -> Result<DocumentTree> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParseState::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => handle_start(&mut state, e),
            Ok(Event::Empty(ref e)) => {
                // Self-closing elements open and close in one event.
                handle_start(&mut state, e);
                handle_end(&mut state, e.local_name().as_ref());
            }
            Ok(Event::End(ref e)) => handle_end(&mut state, e.local_name().as_ref()),
            Ok(Event::Text(ref t)) => {
                if state.in_text && state.run.is_some() {
                    if let Ok(text) = t.unescape() {
                        state.run_text.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConvertError::parse(format!("malformed XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(DocumentTree {
        elements: state.elements,
    })
}

fn handle_start(state: &mut ParseState, e: &BytesStart<'_>) {
    match e.local_name().as_ref() {
        b"p" => {
            state.paragraph = Some(Paragraph::default());
        }
        b"pStyle" => {
            if let (Some(paragraph), Some(value)) = (state.paragraph.as_mut(), attr_val(e)) {
                paragraph.style = value.clone();
                if let Some(level) = heading_level(&value) {
                    paragraph.heading_level = level;
                }
            }
        }
        b"jc" => {
            if let (Some(paragraph), Some(value)) = (state.paragraph.as_mut(), attr_val(e)) {
                paragraph.alignment = match value.as_str() {
                    "center" => Alignment::Center,
                    "right" => Alignment::Right,
                    "both" => Alignment::Justify,
                    _ => Alignment::Left,
                };
            }
        }
        b"tbl" => {
            state.table = Some(Table::default());
        }
        b"tr" => {
            if state.table.is_some() {
                state.row = Some(TableRow::default());
            }
        }
        b"tc" => {
            if state.row.is_some() {
                state.cell = Some(TableCell::default());
            }
        }
        b"r" => {
            state.run = Some(TextRun::default());
            state.run_text.clear();
        }
        b"rPr" => {
            state.in_run_properties = true;
        }
        b"b" => {
            if state.in_run_properties {
                if let Some(run) = state.run.as_mut() {
                    run.bold = true;
                }
            }
        }
        b"i" => {
            if state.in_run_properties {
                if let Some(run) = state.run.as_mut() {
                    run.italic = true;
                }
            }
        }
        b"u" => {
            if state.in_run_properties {
                if let Some(run) = state.run.as_mut() {
                    run.underline = true;
                }
            }
        }
        b"strike" => {
            if state.in_run_properties {
                if let Some(run) = state.run.as_mut() {
                    run.strikethrough = true;
                }
            }
        }
        b"sz" => {
            if state.in_run_properties {
                if let (Some(run), Some(value)) = (state.run.as_mut(), attr_val(e)) {
                    // DOCX stores font sizes in half-points.
                    if let Ok(half_points) = value.trim().parse::<u32>() {
                        run.font_size_pt = half_points as f32 / 2.0;
                    }
                }
            }
        }
        b"color" => {
            if state.in_run_properties {
                if let (Some(run), Some(value)) = (state.run.as_mut(), attr_val(e)) {
                    run.font_color = value;
                }
            }
        }
        b"t" => {
            state.in_text = true;
        }
        b"br" => {
            if state.run.is_some() {
                state.run_text.push('\n');
            }
        }
        _ => {}
    }
}

fn handle_end(state: &mut ParseState, name: &[u8]) {
    match name {
        b"p" => {
            if let Some(paragraph) = state.paragraph.take() {
                if let Some(cell) = state.cell.as_mut() {
                    // Cell content flattens into the cell's run list, with a
                    // line break between paragraphs.
                    if !cell.runs.is_empty() && !paragraph.runs.is_empty() {
                        cell.runs.push(TextRun {
                            text: "\n".to_string(),
                            ..TextRun::default()
                        });
                    }
                    cell.runs.extend(paragraph.runs);
                } else if !paragraph.runs.is_empty() {
                    state.elements.push(Element::Paragraph(paragraph));
                }
            }
        }
        b"r" => {
            if let Some(mut run) = state.run.take() {
                run.text = std::mem::take(&mut state.run_text);
                if let Some(paragraph) = state.paragraph.as_mut() {
                    paragraph.runs.push(run);
                } else if let Some(cell) = state.cell.as_mut() {
                    cell.runs.push(run);
                }
            }
            state.in_run_properties = false;
        }
        b"rPr" => {
            state.in_run_properties = false;
        }
        b"t" => {
            state.in_text = false;
        }
        b"tc" => {
            if let Some(cell) = state.cell.take() {
                if let Some(row) = state.row.as_mut() {
                    row.cells.push(cell);
                }
            }
        }
        b"tr" => {
            if let Some(row) = state.row.take() {
                if let Some(table) = state.table.as_mut() {
                    table.rows.push(row);
                }
            }
        }
        b"tbl" => {
            if let Some(table) = state.table.take() {
                if !table.rows.is_empty() {
                    state.elements.push(Element::Table(table));
                }
            }
        }
        _ => {}
    }
}

/// Value of the `w:val` attribute, namespace-agnostic.
fn attr_val(e: &BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"val" {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Extract the heading level from a `Heading1`-style paragraph style name.
fn heading_level(style: &str) -> Option<u8> {
    let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
    let rest = compact
        .strip_prefix("Heading")
        .or_else(|| compact.strip_prefix("heading"))?;
    let digit = rest.chars().next()?.to_digit(10)?;
    if (1..=6).contains(&digit) {
        Some(digit as u8)
    } else {
        None
    }
}
