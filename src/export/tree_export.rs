use std::fmt::Write as _;

use crate::core::errors::{OcrError, OcrResult};
use crate::core::model::{Level, PageLayout};
use crate::cursor::ResultCursor;
use crate::export::{ChoiceFormatter, ExportFormat, Exporter};

/// Tagged listing of the whole result tree, produced by a full cursor walk.
///
/// Every node opens with `<level confidence="NN.NN %" bounds="x1, y1, x2, y2">`
/// and closes with `</level>`, one tag per line. A symbol's content is its
/// text, or whatever the configured [`ChoiceFormatter`] writes.
#[derive(Default)]
pub struct TreeExporter {
    formatter: Option<Box<dyn ChoiceFormatter>>,
}

impl TreeExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatter(mut self, formatter: Box<dyn ChoiceFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }
}

impl std::fmt::Debug for TreeExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeExporter")
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

impl Exporter for TreeExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Tree
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        let mut cursor = ResultCursor::new(layout);
        cursor.walk(|c| {
            let depth = c.depth()?;
            for level in Level::ALL.into_iter().filter(|l| *l <= depth) {
                if !c.is_at_beginning_of(level)? {
                    continue;
                }
                let node = c
                    .node(level)?
                    .ok_or(OcrError::InvalidState("cursor lost its node"))?;
                let bbox = node.bbox();
                writeln!(
                    out,
                    "<{} confidence=\"{:.2} %\" bounds=\"{}, {}, {}, {}\">",
                    level.tag(),
                    node.confidence(),
                    bbox.x1,
                    bbox.y1,
                    bbox.x2,
                    bbox.y2
                )?;
            }

            if let Some(symbol) = c.symbol()? {
                match (&self.formatter, c.choices()?) {
                    (Some(formatter), Some(choices)) => formatter.write_symbol(&mut out, symbol, choices)?,
                    _ => out.push_str(&html_escape::encode_text(&symbol.text)),
                }
                out.push('\n');
            }

            for level in Level::ALL.into_iter().filter(|l| *l <= depth).rev() {
                if c.is_at_end_of(level)? {
                    writeln!(out, "</{}>", level.tag())?;
                }
            }
            Ok(())
        })?;
        Ok(out)
    }
}
