use image::DynamicImage;
use tracing::debug;

use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::{Level, PageLayout};
use crate::cursor::ResultCursor;
use crate::engine::Engine;
use crate::export::{exporter_for, ExportFormat, ExportOptions, Exporter, HocrExporter};
use crate::ocr::SegmentationMode;

/// Recognition result for one image, tied to the engine that produced it.
///
/// Cursors borrow the page's layout, so the region of interest can only be
/// changed while no cursor is alive.
#[derive(Debug)]
pub struct Page<'a> {
    engine: &'a Engine,
    image: &'a DynamicImage,
    mode: SegmentationMode,
    layout: PageLayout,
}

impl<'a> Page<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        image: &'a DynamicImage,
        mode: SegmentationMode,
        layout: PageLayout,
    ) -> Self {
        Self {
            engine,
            image,
            mode,
            layout,
        }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn into_layout(self) -> PageLayout {
        self.layout
    }

    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    pub fn region_of_interest(&self) -> Rect {
        self.layout.region
    }

    /// Re-runs recognition over `region`. The previous result stays in place
    /// if recognition fails.
    pub fn set_region_of_interest(&mut self, region: Rect) -> OcrResult<()> {
        let extent = self.layout.extent();
        if !extent.contains_rect(&region) {
            return Err(OcrError::OutOfBounds {
                region,
                width: extent.width(),
                height: extent.height(),
            });
        }
        let layout = self.engine.recognize(self.image, region, self.mode)?;
        debug!(%region, blocks = layout.blocks.len(), "region of interest changed");
        self.layout = layout;
        Ok(())
    }

    pub fn cursor(&self) -> ResultCursor<'_> {
        ResultCursor::new(&self.layout)
    }

    pub fn text(&self) -> String {
        self.layout.text()
    }

    pub fn mean_confidence(&self) -> f32 {
        self.layout.mean_confidence()
    }

    pub fn segmented_regions(&self, level: Level) -> Vec<Rect> {
        self.layout.segmented_regions(level)
    }

    pub fn export(&self, format: ExportFormat, options: ExportOptions) -> OcrResult<String> {
        exporter_for(format, options).render(&self.layout)
    }

    pub fn hocr_text(&self, page_number: u32, xhtml: bool) -> OcrResult<String> {
        HocrExporter::new(ExportOptions::new(page_number), xhtml).render(&self.layout)
    }

    pub fn alto_text(&self, page_number: u32) -> OcrResult<String> {
        self.export(ExportFormat::Alto, ExportOptions::new(page_number))
    }

    pub fn tsv_text(&self, page_number: u32) -> OcrResult<String> {
        self.export(ExportFormat::Tsv, ExportOptions::new(page_number))
    }

    pub fn box_text(&self, page_number: u32) -> OcrResult<String> {
        self.export(ExportFormat::Box, ExportOptions::new(page_number))
    }

    pub fn lstm_box_text(&self, page_number: u32) -> OcrResult<String> {
        self.export(ExportFormat::LstmBox, ExportOptions::new(page_number))
    }

    pub fn word_str_box_text(&self, page_number: u32) -> OcrResult<String> {
        self.export(ExportFormat::WordStrBox, ExportOptions::new(page_number))
    }

    pub fn unlv_text(&self) -> OcrResult<String> {
        self.export(ExportFormat::Unlv, ExportOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{RawElement, ReplayBackend};
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        let word = |line: usize, x: u32, y: u32, text: &str| {
            RawElement::new(Level::Word, &[1, 1, line, 1])
                .with_bbox(Rect::new(x, y, 30, 10))
                .with_confidence(90.0)
                .with_text(text)
        };
        Engine::new(Box::new(ReplayBackend::new(vec![
            word(1, 10, 10, "top"),
            word(2, 10, 50, "bottom"),
        ])))
    }

    #[test]
    fn region_outside_page_is_rejected_and_result_kept() {
        let engine = engine();
        let image = DynamicImage::new_luma8(100, 80);
        let mut page = engine.process(&image, SegmentationMode::Auto).unwrap();
        let before = page.layout().clone();
        let err = page.set_region_of_interest(Rect::new(50, 50, 60, 10)).unwrap_err();
        assert!(matches!(err, OcrError::OutOfBounds { width: 100, height: 80, .. }));
        assert_eq!(page.layout(), &before);
    }

    #[test]
    fn region_change_rebuilds_layout() {
        let engine = engine();
        let image = DynamicImage::new_luma8(100, 80);
        let mut page = engine.process(&image, SegmentationMode::Auto).unwrap();
        assert_eq!(page.text(), "top\nbottom\n");
        page.set_region_of_interest(Rect::new(0, 40, 100, 40)).unwrap();
        assert_eq!(page.text(), "bottom\n");
        assert_eq!(page.region_of_interest(), Rect::new(0, 40, 100, 40));
        assert_eq!(page.segmented_regions(Level::Word), vec![Rect::new(10, 50, 30, 10)]);
    }
}
