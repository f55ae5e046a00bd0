use crate::core::errors::OcrResult;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, Exporter};

/// Plain UTF-8 page text.
#[derive(Debug, Clone, Default)]
pub struct TextExporter;

impl TextExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        Ok(layout.text())
    }
}
