pub mod alto_export;
pub mod box_export;
pub mod hocr_export;
pub mod json_export;
pub mod text_export;
pub mod tree_export;
pub mod tsv_export;
pub mod unlv_export;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::OcrResult;
use crate::core::model::{PageLayout, Symbol};
use crate::cursor::ChoiceIterator;

pub use alto_export::AltoExporter;
pub use box_export::{BoxExporter, LstmBoxExporter, WordStrBoxExporter};
pub use hocr_export::HocrExporter;
pub use json_export::JsonExporter;
pub use text_export::TextExporter;
pub use tree_export::TreeExporter;
pub use tsv_export::TsvExporter;
pub use unlv_export::UnlvExporter;

/// Every format the crate can render a page into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Hocr,
    Xhtml,
    Alto,
    Tsv,
    Unlv,
    Box,
    LstmBox,
    WordStrBox,
    Text,
    Json,
    Tree,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 11] = [
        ExportFormat::Hocr,
        ExportFormat::Xhtml,
        ExportFormat::Alto,
        ExportFormat::Tsv,
        ExportFormat::Unlv,
        ExportFormat::Box,
        ExportFormat::LstmBox,
        ExportFormat::WordStrBox,
        ExportFormat::Text,
        ExportFormat::Json,
        ExportFormat::Tree,
    ];

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Hocr => "hocr",
            ExportFormat::Xhtml => "xhtml",
            ExportFormat::Alto => "xml",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Unlv => "unlv",
            ExportFormat::Box | ExportFormat::LstmBox | ExportFormat::WordStrBox => "box",
            ExportFormat::Text | ExportFormat::Tree => "txt",
            ExportFormat::Json => "json",
        }
    }
}

/// Settings shared by every exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Zero-based page number written into the output.
    pub page_number: u32,
    /// Source image name recorded by hOCR and ALTO.
    pub image_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_number: 0,
            image_name: "unknown".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn new(page_number: u32) -> Self {
        Self {
            page_number,
            ..Self::default()
        }
    }

    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = image_name.into();
        self
    }
}

pub trait Exporter {
    fn format(&self) -> ExportFormat;

    fn render(&self, layout: &PageLayout) -> OcrResult<String>;

    /// Renders the whole page before creating `path`, so a failed render
    /// leaves nothing behind.
    fn write_to_file(&self, layout: &PageLayout, path: &Path) -> OcrResult<()> {
        let data = self.render(layout)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        debug!(format = ?self.format(), path = %path.display(), "wrote page export");
        Ok(())
    }
}

pub fn exporter_for(format: ExportFormat, options: ExportOptions) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Hocr => Box::new(HocrExporter::new(options, false)),
        ExportFormat::Xhtml => Box::new(HocrExporter::new(options, true)),
        ExportFormat::Alto => Box::new(AltoExporter::new(options)),
        ExportFormat::Tsv => Box::new(TsvExporter::new(options)),
        ExportFormat::Unlv => Box::new(UnlvExporter::new()),
        ExportFormat::Box => Box::new(BoxExporter::new(options)),
        ExportFormat::LstmBox => Box::new(LstmBoxExporter::new(options)),
        ExportFormat::WordStrBox => Box::new(WordStrBoxExporter::new(options)),
        ExportFormat::Text => Box::new(TextExporter::new()),
        ExportFormat::Json => Box::new(JsonExporter::new()),
        ExportFormat::Tree => Box::new(TreeExporter::new()),
    }
}

/// Renders a symbol's content in the tree dump.
pub trait ChoiceFormatter {
    fn write_symbol(
        &self,
        out: &mut String,
        symbol: &Symbol,
        choices: ChoiceIterator<'_>,
    ) -> OcrResult<()>;
}

/// Writes the symbol's alternatives as a `<choices>` element.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlChoiceFormatter;

impl ChoiceFormatter for XmlChoiceFormatter {
    fn write_symbol(
        &self,
        out: &mut String,
        _symbol: &Symbol,
        choices: ChoiceIterator<'_>,
    ) -> OcrResult<()> {
        out.push_str("<choices>");
        for choice in choices {
            write!(
                out,
                "<choice text=\"{}\" confidence=\"{:.2}\"/>",
                html_escape::encode_double_quoted_attribute(&choice.text),
                choice.confidence
            )?;
        }
        out.push_str("</choices>");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::fixtures::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_covers_every_format() {
        for format in ExportFormat::ALL {
            assert_eq!(exporter_for(format, ExportOptions::default()).format(), format);
        }
    }

    #[test]
    fn empty_page_bodies() {
        let layout = page(Vec::new());
        for format in [
            ExportFormat::Box,
            ExportFormat::LstmBox,
            ExportFormat::WordStrBox,
            ExportFormat::Unlv,
            ExportFormat::Text,
            ExportFormat::Tree,
        ] {
            let rendered = exporter_for(format, ExportOptions::default())
                .render(&layout)
                .unwrap();
            assert_eq!(rendered, "", "{format:?}");
        }
    }

    #[test]
    fn xml_choices_escape_text() {
        let mut symbol = symbol('a', 0, 0);
        symbol.choices = vec![
            crate::core::model::Choice {
                text: "a".to_string(),
                confidence: 91.5,
            },
            crate::core::model::Choice {
                text: "\"".to_string(),
                confidence: 3.25,
            },
        ];
        let mut out = String::new();
        XmlChoiceFormatter
            .write_symbol(&mut out, &symbol, ChoiceIterator::new(&symbol.choices))
            .unwrap();
        assert_eq!(
            out,
            "<choices><choice text=\"a\" confidence=\"91.50\"/><choice text=\"&quot;\" confidence=\"3.25\"/></choices>"
        );
    }
}
