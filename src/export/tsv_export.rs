use std::fmt::Write as _;

use crate::core::errors::OcrResult;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, ExportOptions, Exporter};

pub const TSV_HEADER: &str =
    "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n";

/// Tab-separated word table. Every row is a word (level 5) and every
/// number in it is 1-based. Tabs and line breaks inside word text become
/// spaces so each row keeps twelve columns.
#[derive(Debug, Clone)]
pub struct TsvExporter {
    options: ExportOptions,
}

impl TsvExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }
}

impl Exporter for TsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Tsv
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::from(TSV_HEADER);
        let page = self.options.page_number + 1;
        for (b, block) in layout.blocks.iter().enumerate() {
            for (p, paragraph) in block.paragraphs.iter().enumerate() {
                for (l, line) in paragraph.lines.iter().enumerate() {
                    for (w, word) in line.words.iter().enumerate() {
                        writeln!(
                            out,
                            "5\t{page}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.6}\t{}",
                            b + 1,
                            p + 1,
                            l + 1,
                            w + 1,
                            word.bbox.x1,
                            word.bbox.y1,
                            word.bbox.width(),
                            word.bbox.height(),
                            word.confidence,
                            word.text.replace(['\t', '\n', '\r'], " ")
                        )?;
                    }
                }
            }
        }
        Ok(out)
    }
}
