//! Box-file renderers used to prepare training data.
//!
//! All three formats measure Y from the bottom of the image and print
//! `left bottom right top page` after the text of each entry.

use std::fmt::Write as _;

use crate::core::errors::OcrResult;
use crate::core::geometry::Rect;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, ExportOptions, Exporter};

fn write_entry(
    out: &mut String,
    text: &str,
    rect: &Rect,
    image_height: u32,
    page: u32,
) -> OcrResult<()> {
    let (left, bottom, right, top) = rect.to_bottom_up(image_height);
    write!(out, "{text} {left} {bottom} {right} {top} {page}")?;
    Ok(())
}

/// One line per symbol.
#[derive(Debug, Clone)]
pub struct BoxExporter {
    options: ExportOptions,
}

impl BoxExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Exporter for BoxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Box
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        for symbol in layout.words().flat_map(|w| w.symbols.iter()) {
            write_entry(&mut out, &symbol.text, &symbol.bbox, layout.height, self.options.page_number)?;
            out.push('\n');
        }
        Ok(out)
    }
}

/// Symbol entries for line-level training. Every entry of a line carries the
/// line's box: a space entry separates words and a tab entry ends the line.
#[derive(Debug, Clone)]
pub struct LstmBoxExporter {
    options: ExportOptions,
}

impl LstmBoxExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Exporter for LstmBoxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::LstmBox
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let page = self.options.page_number;
        let mut out = String::new();
        for line in layout.lines() {
            let bbox = line.bbox;
            for (i, word) in line.words.iter().enumerate() {
                for symbol in &word.symbols {
                    write_entry(&mut out, &symbol.text, &bbox, layout.height, page)?;
                    out.push('\n');
                }
                if i + 1 < line.words.len() {
                    write_entry(&mut out, " ", &bbox, layout.height, page)?;
                    out.push('\n');
                }
            }
            write_entry(&mut out, "\t", &bbox, layout.height, page)?;
            out.push('\n');
        }
        Ok(out)
    }
}

/// One line per word, closed by the integer mean of its symbol confidences.
#[derive(Debug, Clone)]
pub struct WordStrBoxExporter {
    options: ExportOptions,
}

impl WordStrBoxExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Exporter for WordStrBoxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::WordStrBox
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        for word in layout.words() {
            write_entry(&mut out, &word.text, &word.bbox, layout.height, self.options.page_number)?;
            writeln!(out, " #{}", word.symbol_mean_confidence() as i32)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::fixtures::*;
    use pretty_assertions::assert_eq;

    fn sample() -> PageLayout {
        page(vec![block(vec![paragraph(vec![line(&["ab", "c"], 10)])])])
    }

    #[test]
    fn box_lines_are_bottom_up() {
        let text = BoxExporter::new(ExportOptions::default()).render(&sample()).unwrap();
        assert_eq!(text, "a 10 278 18 290 0\nb 18 278 26 290 0\nc 34 278 42 290 0\n");
    }

    #[test]
    fn lstm_box_marks_word_and_line_ends() {
        let text = LstmBoxExporter::new(ExportOptions::new(2)).render(&sample()).unwrap();
        assert_eq!(
            text,
            "a 10 278 42 290 2\nb 10 278 42 290 2\n  10 278 42 290 2\nc 10 278 42 290 2\n\t 10 278 42 290 2\n"
        );
    }

    #[test]
    fn lstm_box_uses_line_box_where_symbol_boxes_differ() {
        let mut layout = sample();
        let line = &mut layout.blocks[0].paragraphs[0].lines[0];
        line.words[0].symbols[1].bbox = Rect::from_coords(18, 4, 26, 30).unwrap();
        line.bbox = Rect::from_coords(10, 4, 42, 30).unwrap();

        let plain = BoxExporter::new(ExportOptions::default()).render(&layout).unwrap();
        let lstm = LstmBoxExporter::new(ExportOptions::default()).render(&layout).unwrap();
        assert_ne!(plain.lines().next(), lstm.lines().next());
        assert_eq!(plain.lines().nth(1), Some("b 18 270 26 296 0"));
        for entry in lstm.lines() {
            assert!(entry.ends_with(" 10 270 42 296 0"), "{entry:?}");
        }
    }

    #[test]
    fn word_str_box_appends_symbol_confidence() {
        let mut layout = sample();
        let word = &mut layout.blocks[0].paragraphs[0].lines[0].words[0];
        word.symbols[0].confidence = 80.0;
        word.symbols[1].confidence = 95.5;
        let text = WordStrBoxExporter::new(ExportOptions::default()).render(&layout).unwrap();
        assert_eq!(text, "ab 10 278 26 290 0 #87\nc 34 278 42 290 0 #90\n");
    }
}
