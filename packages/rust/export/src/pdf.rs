//! Line-oriented PDF rendering for Markdown-like text and quizzes.
//!
//! Recognizes `#`/`##`/`###` headings, `- ` bullets, `N. ` numbered lines
//! (contiguous runs accumulate into one list block), and blank-line
//! paragraph breaks. Layout is a simple top-down cursor on A4 pages with
//! automatic page breaks; text is sanitized to the builtin font's encodable
//! range before drawing.

use std::path::Path;
use std::sync::LazyLock;

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use regex::Regex;

use courseforge_quiz::{Quiz, QuizItem};
use courseforge_shared::{CourseForgeError, Result};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

const BODY_SIZE: f32 = 11.0;
const H1_SIZE: f32 = 18.0;
const H2_SIZE: f32 = 14.0;
const H3_SIZE: f32 = 12.0;

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Render Markdown-like text to a paginated PDF file.
pub fn render_document(path: &Path, markdown: &str, title: Option<&str>) -> Result<()> {
    let mut writer = PageWriter::new(title.unwrap_or("Document"))?;

    for block in parse_blocks(markdown) {
        match block {
            Block::Heading(level, text) => writer.heading(level, &text),
            Block::List(items) => {
                for item in &items {
                    writer.list_item(item);
                }
                writer.gap();
            }
            Block::Paragraph(text) => {
                writer.paragraph(&text);
                writer.gap();
            }
        }
    }

    writer.finish(path)
}

/// Render a quiz to a paginated PDF file.
///
/// Each MCQ becomes a heading, a lettered choice list, and an
/// answer/rationale/metadata line; short items render their prompt as a
/// heading only.
pub fn render_quiz(path: &Path, quiz: &Quiz, title: Option<&str>) -> Result<()> {
    let mut writer = PageWriter::new(title.unwrap_or("Quiz"))?;

    if let Some(title) = title {
        writer.heading(1, title);
    }

    let mut number = 0;
    for item in &quiz.items {
        match item {
            QuizItem::Mcq {
                question,
                choices,
                answer,
                rationale,
                bloom,
                difficulty,
            } => {
                number += 1;
                writer.heading(3, &format!("Q{number}. {question}"));
                for (i, choice) in choices.iter().enumerate() {
                    let letter = (b'A' + i as u8) as char;
                    writer.list_item(&format!("{letter}. {choice}"));
                }
                let answer_letter = (b'A' + (*answer).min(3) as u8) as char;
                let bloom = serde_variant_name(bloom);
                let difficulty = serde_variant_name(difficulty);
                writer.paragraph(&format!(
                    "Answer: {answer_letter}. {rationale} [{bloom}, {difficulty}]"
                ));
                writer.gap();
            }
            QuizItem::Short { prompt } => {
                writer.heading(3, &format!("Short answer: {prompt}"));
            }
        }
    }

    writer.finish(path)
}

/// Lowercase serde name of a unit-ish enum variant (`Bloom`, `Difficulty`).
fn serde_variant_name<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Block parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Block {
    Heading(u8, String),
    List(Vec<String>),
    Paragraph(String),
}

/// Parse Markdown-like text into renderable blocks. Contiguous bullet and
/// numbered lines accumulate into one list block; paragraph lines accumulate
/// until a blank line or a structural line flushes them.
fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Vec<String> = Vec::new();

    let flush_paragraph = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };
    let flush_list = |list: &mut Vec<String>, blocks: &mut Vec<Block>| {
        if !list.is_empty() {
            blocks.push(Block::List(std::mem::take(list)));
        }
    };

    for line in markdown.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
        } else if let Some(text) = trimmed.strip_prefix("### ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            blocks.push(Block::Heading(3, text.to_string()));
        } else if let Some(text) = trimmed.strip_prefix("## ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            blocks.push(Block::Heading(2, text.to_string()));
        } else if let Some(text) = trimmed.strip_prefix("# ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            flush_list(&mut list, &mut blocks);
            blocks.push(Block::Heading(1, text.to_string()));
        } else if let Some(text) = trimmed.strip_prefix("- ") {
            flush_paragraph(&mut paragraph, &mut blocks);
            list.push(format!("* {text}"));
        } else if let Some(caps) = NUMBERED_RE.captures(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            list.push(format!("{}. {}", &caps[1], &caps[2]));
        } else {
            flush_list(&mut list, &mut blocks);
            paragraph.push(trimmed);
        }
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    flush_list(&mut list, &mut blocks);

    blocks
}

// ---------------------------------------------------------------------------
// Page writer
// ---------------------------------------------------------------------------

/// Top-down layout cursor over A4 pages.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| CourseForgeError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| CourseForgeError::Render(e.to_string()))?;

        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn heading(&mut self, level: u8, text: &str) {
        let size = match level {
            1 => H1_SIZE,
            2 => H2_SIZE,
            _ => H3_SIZE,
        };
        self.gap();
        for line in wrap(text, max_chars(size)) {
            self.draw_line(&line, size, true, 0.0);
        }
        self.y -= 1.5;
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, max_chars(BODY_SIZE)) {
            self.draw_line(&line, BODY_SIZE, false, 0.0);
        }
    }

    fn list_item(&mut self, text: &str) {
        let indent = 5.0;
        for (i, line) in wrap(text, max_chars(BODY_SIZE) - 4).into_iter().enumerate() {
            // Continuation lines indent past the marker.
            let extra = if i == 0 { 0.0 } else { 4.0 };
            self.draw_line(&line, BODY_SIZE, false, indent + extra);
        }
    }

    /// Vertical gap between blocks.
    fn gap(&mut self) {
        self.y -= line_height(BODY_SIZE) * 0.5;
    }

    fn draw_line(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let height = line_height(size);
        if self.y - height < MARGIN_MM {
            self.new_page();
        }

        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(
            sanitize(text),
            size,
            Mm(MARGIN_MM + indent),
            Mm(self.y),
            font,
        );
        self.y -= height;
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn finish(self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| CourseForgeError::io(path, e))?;
        self.doc
            .save(&mut std::io::BufWriter::new(file))
            .map_err(|e| CourseForgeError::Render(e.to_string()))
    }
}

/// Line advance in mm for a font size in points.
fn line_height(size: f32) -> f32 {
    size * 0.48
}

/// Approximate character budget for one line at the given font size.
fn max_chars(size: f32) -> usize {
    let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let char_mm = size * 0.5 * 0.3528;
    ((usable_mm / char_mm) as usize).max(20)
}

/// Greedy word wrap to a character budget. Overlong words get their own line.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Map text onto the builtin font's encodable range.
///
/// Builtin PDF fonts are WinAnsi-encoded; anything outside Latin-1 would
/// produce malformed glyphs, so common typographic characters are folded to
/// ASCII and the rest replaced.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2014}' | '\u{2013}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2022}' => '*',
            '\u{2026}' => '.',
            c if (c as u32) < 0x20 => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}
