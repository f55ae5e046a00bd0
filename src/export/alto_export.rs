use std::fmt::Write as _;

use crate::core::confidence::as_fraction;
use crate::core::errors::OcrResult;
use crate::core::geometry::Rect;
use crate::core::model::PageLayout;
use crate::export::{ExportFormat, ExportOptions, Exporter};

/// ALTO v3 renderer. Paragraphs are flattened: ALTO text blocks hold lines
/// directly.
#[derive(Debug, Clone)]
pub struct AltoExporter {
    options: ExportOptions,
}

impl AltoExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    fn write_header(&self, out: &mut String) -> OcrResult<()> {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(
            "<alto xmlns=\"http://www.loc.gov/standards/alto/ns-v3#\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://www.loc.gov/standards/alto/ns-v3# \
             http://www.loc.gov/alto/v3/alto-3-0.xsd\">\n",
        );
        out.push_str("\t<Description>\n\t\t<MeasurementUnit>pixel</MeasurementUnit>\n");
        writeln!(
            out,
            "\t\t<sourceImageInformation>\n\t\t\t<fileName>{}</fileName>\n\t\t</sourceImageInformation>",
            html_escape::encode_text(&self.options.image_name)
        )?;
        writeln!(
            out,
            "\t\t<OCRProcessing ID=\"OCR_0\">\n\t\t\t<ocrProcessingStep>\n\t\t\t\t<processingSoftware>\n\t\t\t\t\t<softwareName>{}</softwareName>\n\t\t\t\t</processingSoftware>\n\t\t\t</ocrProcessingStep>\n\t\t</OCRProcessing>",
            env!("CARGO_PKG_NAME")
        )?;
        out.push_str("\t</Description>\n");
        Ok(())
    }
}

fn geometry(rect: &Rect) -> String {
    format!(
        "HPOS=\"{}\" VPOS=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\"",
        rect.x1,
        rect.y1,
        rect.width(),
        rect.height()
    )
}

impl Exporter for AltoExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Alto
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        self.write_header(&mut out)?;

        let page = self.options.page_number;
        out.push_str("\t<Layout>\n");
        writeln!(
            out,
            "\t\t<Page WIDTH=\"{}\" HEIGHT=\"{}\" PHYSICAL_IMG_NR=\"{page}\" ID=\"page_{page}\">",
            layout.width, layout.height
        )?;
        writeln!(out, "\t\t\t<PrintSpace {}>", geometry(&layout.extent()))?;

        let (mut block_id, mut line_id, mut string_id) = (0, 0, 0);
        for block in &layout.blocks {
            writeln!(out, "\t\t\t\t<TextBlock ID=\"block_{block_id}\" {}>", geometry(&block.bbox))?;
            block_id += 1;
            for line in block.paragraphs.iter().flat_map(|p| p.lines.iter()) {
                writeln!(out, "\t\t\t\t\t<TextLine ID=\"line_{line_id}\" {}>", geometry(&line.bbox))?;
                line_id += 1;
                let mut previous: Option<&Rect> = None;
                for word in &line.words {
                    if let Some(previous) = previous {
                        writeln!(
                            out,
                            "\t\t\t\t\t\t<SP WIDTH=\"{}\" VPOS=\"{}\" HPOS=\"{}\"/>",
                            word.bbox.x1.saturating_sub(previous.x2),
                            previous.y1,
                            previous.x2
                        )?;
                    }
                    writeln!(
                        out,
                        "\t\t\t\t\t\t<String ID=\"string_{string_id}\" {} WC=\"{:.2}\" CONTENT=\"{}\"/>",
                        geometry(&word.bbox),
                        as_fraction(word.confidence),
                        html_escape::encode_double_quoted_attribute(&word.text)
                    )?;
                    string_id += 1;
                    previous = Some(&word.bbox);
                }
                out.push_str("\t\t\t\t\t</TextLine>\n");
            }
            out.push_str("\t\t\t\t</TextBlock>\n");
        }

        out.push_str("\t\t\t</PrintSpace>\n\t\t</Page>\n\t</Layout>\n</alto>\n");
        Ok(out)
    }
}
