use crate::core::errors::OcrResult;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, Exporter};

/// Substitute for characters the Latin-1 based UNLV format cannot hold.
pub const UNLV_REJECT: char = '~';

/// UNLV text: one line per text line, a blank line after every block.
#[derive(Debug, Clone, Default)]
pub struct UnlvExporter;

impl UnlvExporter {
    pub fn new() -> Self {
        Self
    }
}

fn to_latin1(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars()
        .map(|ch| if u32::from(ch) <= 0xFF { ch } else { UNLV_REJECT })
}

impl Exporter for UnlvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Unlv
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        for block in &layout.blocks {
            for line in block.paragraphs.iter().flat_map(|p| p.lines.iter()) {
                out.extend(to_latin1(&line.text()));
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out)
    }
}
