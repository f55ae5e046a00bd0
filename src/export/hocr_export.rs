use std::fmt::Write as _;

use crate::core::confidence::as_percent;
use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::{Level, PageLayout};
use crate::cursor::ResultCursor;
use crate::export::{ExportFormat, ExportOptions, Exporter};

const XHTML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN"
    "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
"#;

const HTML_HEADER: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN"
    "http://www.w3.org/TR/html4/loose.dtd">
<html>
"#;

/// hOCR renderer, in either HTML 4.01 or XHTML flavour.
#[derive(Debug, Clone)]
pub struct HocrExporter {
    options: ExportOptions,
    xhtml: bool,
    char_boxes: bool,
}

impl HocrExporter {
    pub fn new(options: ExportOptions, xhtml: bool) -> Self {
        Self {
            options,
            xhtml,
            char_boxes: false,
        }
    }

    /// Also emits one `ocrx_cinfo` span per symbol inside each word.
    pub fn with_char_boxes(mut self, char_boxes: bool) -> Self {
        self.char_boxes = char_boxes;
        self
    }

    fn write_header(&self, out: &mut String) -> OcrResult<()> {
        let close = if self.xhtml { "/" } else { "" };
        out.push_str(if self.xhtml { XHTML_HEADER } else { HTML_HEADER });
        out.push_str(" <head>\n  <title></title>\n");
        writeln!(
            out,
            "  <meta http-equiv=\"Content-Type\" content=\"text/html;charset=utf-8\"{close}>"
        )?;
        writeln!(
            out,
            "  <meta name='ocr-system' content='{} {}'{close}>",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )?;
        let mut capabilities = String::from("ocr_page ocr_carea ocr_par ocr_line ocrx_word ocrp_wconf");
        if self.char_boxes {
            capabilities.push_str(" ocrx_cinfo");
        }
        writeln!(out, "  <meta name='ocr-capabilities' content='{capabilities}'{close}>")?;
        out.push_str(" </head>\n <body>\n");
        Ok(())
    }

    fn write_body(&self, out: &mut String, layout: &PageLayout) -> OcrResult<()> {
        let page = self.options.page_number + 1;
        writeln!(
            out,
            "  <div class='ocr_page' id='page_{page}' title='image \"{}\"; bbox {}; ppageno {}'>",
            html_escape::encode_single_quoted_attribute(&self.options.image_name),
            bbox(&layout.extent()),
            self.options.page_number
        )?;

        let mut ids = [0u32; 4];
        let mut cursor = ResultCursor::new(layout);
        cursor.walk(|c| {
            let depth = c.depth()?;
            let deepest = depth.min(Level::Word);
            for level in Level::ALL.into_iter().filter(|l| *l <= deepest) {
                if !c.is_at_beginning_of(level)? {
                    continue;
                }
                ids[level.index()] += 1;
                let id = ids[level.index()];
                let node = c
                    .node(level)?
                    .ok_or(OcrError::InvalidState("cursor lost its node"))?;
                let title = format!(
                    "bbox {}; x_wconf {}",
                    bbox(&node.bbox()),
                    as_percent(node.confidence())
                );
                match level {
                    Level::Block => writeln!(
                        out,
                        "   <div class='ocr_carea' id='block_{page}_{id}' title='{title}'>"
                    )?,
                    Level::Paragraph => writeln!(
                        out,
                        "    <p class='ocr_par' id='par_{page}_{id}' title='{title}'>"
                    )?,
                    Level::TextLine => writeln!(
                        out,
                        "     <span class='ocr_line' id='line_{page}_{id}' title='{title}'>"
                    )?,
                    _ => {
                        let word = c.word()?.ok_or(OcrError::InvalidState("cursor lost its word"))?;
                        write!(out, "      <span class='ocrx_word' id='word_{page}_{id}' title='{title}'")?;
                        if let Some(language) = &word.language {
                            write!(out, " lang='{}'", html_escape::encode_single_quoted_attribute(language))?;
                        }
                        out.push('>');
                        if !self.char_boxes || depth == Level::Word {
                            out.push_str(&html_escape::encode_text(&word.text));
                        }
                    }
                }
            }

            if self.char_boxes && depth == Level::Symbol {
                if let Some(symbol) = c.symbol()? {
                    write!(
                        out,
                        "<span class='ocrx_cinfo' title='x_bboxes {}; x_conf {:.2}'>{}</span>",
                        bbox(&symbol.bbox),
                        symbol.confidence,
                        html_escape::encode_text(&symbol.text)
                    )?;
                }
            }

            for level in Level::ALL.into_iter().filter(|l| *l <= deepest).rev() {
                if !c.is_at_end_of(level)? {
                    continue;
                }
                match level {
                    Level::Block => out.push_str("   </div>\n"),
                    Level::Paragraph => out.push_str("    </p>\n"),
                    Level::TextLine => out.push_str("     </span>\n"),
                    _ => out.push_str("</span>\n"),
                }
            }
            Ok(())
        })?;

        out.push_str("  </div>\n");
        Ok(())
    }
}

fn bbox(rect: &Rect) -> String {
    format!("{} {} {} {}", rect.x1, rect.y1, rect.x2, rect.y2)
}

impl Exporter for HocrExporter {
    fn format(&self) -> ExportFormat {
        if self.xhtml {
            ExportFormat::Xhtml
        } else {
            ExportFormat::Hocr
        }
    }

    fn render(&self, layout: &PageLayout) -> OcrResult<String> {
        let mut out = String::new();
        self.write_header(&mut out)?;
        self.write_body(&mut out, layout)?;
        out.push_str(" </body>\n</html>\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::fixtures::*;
    use pretty_assertions::assert_eq;

    fn sample() -> PageLayout {
        page(vec![
            block(vec![
                paragraph(vec![line(&["Hi", "<you>"], 10), line(&["again"], 30)]),
                paragraph(vec![line(&["two"], 50)]),
            ]),
            block(vec![paragraph(vec![line(&["end"], 100)])]),
        ])
    }

    #[test]
    fn tags_are_balanced() {
        let html = HocrExporter::new(ExportOptions::default(), true)
            .with_char_boxes(true)
            .render(&sample())
            .unwrap();
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
        assert_eq!(html.matches("<p ").count(), html.matches("</p>").count());
        assert_eq!(html.matches("<span").count(), html.matches("</span>").count());
        assert_eq!(html.matches("class='ocr_carea'").count(), 2);
        assert_eq!(html.matches("class='ocr_par'").count(), 3);
        assert_eq!(html.matches("class='ocr_line'").count(), 4);
        assert_eq!(html.matches("class='ocrx_word'").count(), 5);
    }

    #[test]
    fn renders_word_markup() {
        let html = HocrExporter::new(ExportOptions::new(1), false)
            .render(&sample())
            .unwrap();
        assert!(html.contains(
            "      <span class='ocrx_word' id='word_2_2' title='bbox 34 10 74 22; x_wconf 90' lang='eng'>&lt;you&gt;</span>\n"
        ));
        assert!(html.contains("id='block_2_2'"));
        assert!(html.contains("<meta http-equiv=\"Content-Type\" content=\"text/html;charset=utf-8\">"));
        assert!(html.starts_with("<!DOCTYPE HTML PUBLIC"));
    }

    #[test]
    fn xhtml_variant_is_well_formed_shell() {
        let html = HocrExporter::new(ExportOptions::default(), true)
            .render(&page(Vec::new()))
            .unwrap();
        assert!(html.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(html.contains("<html xmlns=\"http://www.w3.org/1999/xhtml\""));
        assert!(html.contains("charset=utf-8\"/>"));
        assert!(html.contains(
            "  <div class='ocr_page' id='page_1' title='image \"unknown\"; bbox 0 0 400 300; ppageno 0'>\n  </div>\n"
        ));
        assert!(html.ends_with(" </body>\n</html>\n"));
    }

    #[test]
    fn char_boxes_replace_plain_word_text() {
        let layout = page(vec![block(vec![paragraph(vec![line(&["ab"], 10)])])]);
        let html = HocrExporter::new(ExportOptions::default(), true)
            .with_char_boxes(true)
            .render(&layout)
            .unwrap();
        assert!(html.contains(
            "title='bbox 10 10 26 22; x_wconf 90' lang='eng'><span class='ocrx_cinfo' title='x_bboxes 10 10 18 22; x_conf 90.00'>a</span><span class='ocrx_cinfo' title='x_bboxes 18 10 26 22; x_conf 90.00'>b</span></span>\n"
        ));
    }
}
