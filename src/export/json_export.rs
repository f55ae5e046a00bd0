use crate::core::errors::OcrResult;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, Exporter};

/// Pretty-printed serde dump of the whole page model.
#[derive(Debug, Clone, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        Ok(serde_json::to_string_pretty(layout)?)
    }
}
