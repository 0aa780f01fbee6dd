//! PDF and DOCX text extraction

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Text of one page; DOCX files have a single page without a number
pub type PageText = (Option<u32>, String);

/// PDF/DOCX file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file's bytes according to its extension
    pub fn parse(path: &Path, data: &[u8]) -> Result<Vec<PageText>> {
        let filename = path.display().to_string();

        match FileType::from_path(path) {
            FileType::Pdf => Self::parse_pdf(&filename, data),
            FileType::Docx => Self::parse_docx(&filename, data),
            FileType::Unknown => Err(Error::UnsupportedFileType(filename)),
        }
    }

    /// Parse a PDF page by page, falling back to whole-document extraction
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        match Self::parse_pdf_pages(filename, data) {
            Some(pages) => Ok(pages),
            None => {
                tracing::debug!("Per-page extraction failed for {}, using pdf-extract", filename);
                let content = pdf_extract::extract_text_from_mem(data)
                    .map_err(|e| Error::file_parse(filename, e.to_string()))?;
                Ok(vec![(Some(1), terminate(content))])
            }
        }
    }

    /// Per-page extraction with lopdf; `None` when nothing usable came out
    fn parse_pdf_pages(filename: &str, data: &[u8]) -> Option<Vec<PageText>> {
        let doc = lopdf::Document::load_mem(data).ok()?;

        let mut pages = Vec::new();
        for (page_number, page_id) in doc.get_pages() {
            let mut text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("{}: page {} text extraction failed: {}", filename, page_number, e);
                    String::new()
                }
            };

            if text.trim().is_empty() {
                if let Ok(content) = doc.get_page_content(page_id) {
                    text = extract_text_from_content(&content);
                }
            }

            if text.trim().is_empty() {
                tracing::warn!("{}: page {} has no extractable text", filename, page_number);
            }
            pages.push((Some(page_number), terminate(text)));
        }

        let has_text = pages.iter().any(|(_, text)| !text.trim().is_empty());
        has_text.then_some(pages)
    }

    /// Parse DOCX body text, including tables and hyperlinks, into a single page
    fn parse_docx(filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let doc =
            docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => push_paragraph(&mut content, p),
                docx_rs::DocumentChild::Table(t) => push_table(&mut content, t),
                _ => {}
            }
        }

        Ok(vec![(None, content)])
    }
}

/// One line per paragraph
fn push_paragraph(content: &mut String, paragraph: &docx_rs::Paragraph) {
    push_runs(content, &paragraph.children);
    content.push('\n');
}

fn push_runs(content: &mut String, children: &[docx_rs::ParagraphChild]) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        content.push_str(&t.text);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => push_runs(content, &link.children),
            _ => {}
        }
    }
}

/// Cells in row order; nested tables are walked in place
fn push_table(content: &mut String, table: &docx_rs::Table) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        for docx_rs::TableRowChild::TableCell(cell) in &row.cells {
            for child in &cell.children {
                match child {
                    docx_rs::TableCellContent::Paragraph(p) => push_paragraph(content, p),
                    docx_rs::TableCellContent::Table(t) => push_table(content, t),
                    _ => {}
                }
            }
        }
    }
}

/// Read string operands of `Tj`/`TJ` operators inside `BT ... ET` blocks
fn extract_text_from_content(content: &[u8]) -> String {
    let content = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut block = String::new();

    for line in content.lines().map(str::trim) {
        match line {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                if !block.is_empty() {
                    text.push_str(block.trim_end());
                    text.push('\n');
                    block.clear();
                }
            }
            _ if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) => {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        block.push_str(&unescape_pdf_string(&line[start + 1..end]));
                        block.push(' ');
                    }
                }
            }
            _ => {}
        }
    }

    text
}

fn unescape_pdf_string(raw: &str) -> String {
    raw.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\(", "(")
        .replace("\\)", ")")
        .replace("\\\\", "\\")
}

/// Ensure page text ends with whitespace so sentences never run across pages
fn terminate(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with(char::is_whitespace) {
        text.push('\n');
    }
    text
}
