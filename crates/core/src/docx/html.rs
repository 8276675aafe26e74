//! Deterministic HTML serialisation of a [`DocumentTree`].
//!
//! The output is a single self-contained document: all styling lives in one
//! embedded stylesheet plus inline `style` attributes, so the PDF stage never
//! has a reason to fetch anything.

use super::{DocumentTree, Element, List, ListItem, Paragraph, Table, TextRun};
use crate::escape::escape_html;
use std::fmt::Write;

const STYLESHEET: &str = "\
body {
    font-family: 'Segoe UI', Arial, sans-serif;
    margin: 40px;
    line-height: 1.6;
    color: #333;
    max-width: 800px;
}
p { margin: 12px 0; }
h1 { font-size: 2em; font-weight: bold; margin: 20px 0 12px 0; color: #1a1a1a; }
h2 { font-size: 1.75em; font-weight: bold; margin: 18px 0 10px 0; color: #1a1a1a; }
h3 { font-size: 1.5em; font-weight: bold; margin: 16px 0 8px 0; color: #1a1a1a; }
h4 { font-size: 1.25em; font-weight: bold; margin: 14px 0 6px 0; color: #1a1a1a; }
h5 { font-size: 1.1em; font-weight: bold; margin: 12px 0 6px 0; color: #1a1a1a; }
h6 { font-size: 1em; font-weight: bold; margin: 10px 0 4px 0; color: #1a1a1a; }
.text-left { text-align: left; }
.text-center { text-align: center; }
.text-right { text-align: right; }
.text-justify { text-align: justify; }
.bold { font-weight: bold; }
.italic { font-style: italic; }
.underline { text-decoration: underline; }
.strike { text-decoration: line-through; }
ul, ol { margin: 12px 0; padding-left: 30px; }
li { margin: 4px 0; }
table { border-collapse: collapse; width: 100%; margin: 12px 0; border: 1px solid #ddd; }
td, th { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; font-weight: bold; }
";

/// Render the document tree to a complete HTML document.
///
/// Parsing the same DOCX bytes twice yields byte-identical output.
pub fn render_html(tree: &DocumentTree) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\n");
    out.push_str(STYLESHEET);
    out.push_str("</style>\n</head>\n<body>\n");

    for element in &tree.elements {
        match element {
            Element::Paragraph(p) => render_paragraph(&mut out, p),
            Element::List(l) => render_list(&mut out, l),
            Element::Table(t) => render_table(&mut out, t),
        }
    }

    out.push_str("</body></html>");
    out
}

fn render_paragraph(out: &mut String, paragraph: &Paragraph) {
    let tag = match paragraph.heading_level {
        level @ 1..=6 => format!("h{level}"),
        _ => "p".to_string(),
    };

    let _ = write!(
        out,
        "<{} class=\"{}\">",
        tag,
        paragraph.alignment.css_class()
    );
    for run in &paragraph.runs {
        render_run(out, run);
    }
    let _ = writeln!(out, "</{}>", tag);
}

fn render_run(out: &mut String, run: &TextRun) {
    if run.text.is_empty() {
        return;
    }

    let mut classes: Vec<&str> = Vec::new();
    if run.bold {
        classes.push("bold");
    }
    if run.italic {
        classes.push("italic");
    }
    if run.underline {
        classes.push("underline");
    }
    if run.strikethrough {
        classes.push("strike");
    }

    let mut styles: Vec<String> = Vec::new();
    if run.font_size_pt > 0.0 {
        styles.push(format!("font-size: {:.1}pt", run.font_size_pt));
    }
    if run.font_color.len() == 6 {
        styles.push(format!("color: #{}", run.font_color));
    }

    let needs_span = !classes.is_empty() || !styles.is_empty();
    if needs_span {
        out.push_str("<span");
        if !classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", classes.join(" "));
        }
        if !styles.is_empty() {
            let _ = write!(out, " style=\"{}\"", styles.join("; "));
        }
        out.push('>');
    }

    out.push_str(&escape_html(&run.text).replace('\n', "<br>"));

    if needs_span {
        out.push_str("</span>");
    }
}

fn render_list(out: &mut String, list: &List) {
    if list.items.is_empty() {
        return;
    }
    let tag = if list.ordered { "ol" } else { "ul" };
    let _ = writeln!(out, "<{}>", tag);
    for item in &list.items {
        render_list_item(out, item);
    }
    let _ = writeln!(out, "</{}>", tag);
}

fn render_list_item(out: &mut String, item: &ListItem) {
    out.push_str("<li>");
    for run in &item.runs {
        render_run(out, run);
    }
    if !item.children.is_empty() {
        out.push_str("<ul>\n");
        for child in &item.children {
            render_list_item(out, child);
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</li>\n");
}

fn render_table(out: &mut String, table: &Table) {
    if table.rows.is_empty() {
        return;
    }
    out.push_str("<table>\n");
    for (row_index, row) in table.rows.iter().enumerate() {
        out.push_str("<tr>\n");
        // The first row renders as a header row.
        let tag = if row_index == 0 { "th" } else { "td" };
        for cell in &row.cells {
            let _ = write!(out, "<{}", tag);
            if cell.col_span > 1 {
                let _ = write!(out, " colspan=\"{}\"", cell.col_span);
            }
            if cell.row_span > 1 {
                let _ = write!(out, " rowspan=\"{}\"", cell.row_span);
            }
            out.push('>');
            for run in &cell.runs {
                render_run(out, run);
            }
            let _ = writeln!(out, "</{}>", tag);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}
