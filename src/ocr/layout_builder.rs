use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::core::confidence::mean_confidence;
use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::{Block, Level, PageLayout, Paragraph, Symbol, TextLine, Word};
use crate::ocr::RawElement;

/// Groups a flat result dump into the five-level tree.
///
/// Nodes appear in the order their key is first seen. A record whose parent
/// never had a record of its own creates that parent implicitly; the
/// parent's box is then the union of its children and its confidence their
/// mean.
pub fn build_layout(
    width: u32,
    height: u32,
    region: Rect,
    records: Vec<RawElement>,
) -> OcrResult<PageLayout> {
    let record_count = records.len();
    let mut root = Draft::new(0);
    for record in records {
        let mut node = &mut root;
        for ordinal in record.key() {
            node = node.child_mut(ordinal);
        }
        if node.record.is_some() {
            warn!(level = ?record.level, key = ?record.key(), "duplicate record ignored");
            continue;
        }
        node.record = Some(record);
    }

    let blocks = root
        .children
        .into_iter()
        .map(finish_block)
        .collect::<OcrResult<Vec<_>>>()?;
    debug!(records = record_count, blocks = blocks.len(), "built page layout");
    Ok(PageLayout::new(width, height, region, blocks))
}

#[derive(Debug)]
struct Draft {
    ordinal: usize,
    record: Option<RawElement>,
    children: Vec<Draft>,
}

impl Draft {
    fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            record: None,
            children: Vec::new(),
        }
    }

    fn child_mut(&mut self, ordinal: usize) -> &mut Draft {
        let index = match self.children.iter().position(|c| c.ordinal == ordinal) {
            Some(index) => index,
            None => {
                self.children.push(Draft::new(ordinal));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

fn finish_block(draft: Draft) -> OcrResult<Block> {
    let paragraphs = draft
        .children
        .into_iter()
        .map(finish_paragraph)
        .collect::<OcrResult<Vec<_>>>()?;
    let record = draft.record.as_ref();
    Ok(Block {
        bbox: derive_bbox(record, paragraphs.iter().map(|p| &p.bbox), Level::Block)?,
        confidence: derive_confidence(record, paragraphs.iter().map(|p| p.confidence)),
        paragraphs,
    })
}

fn finish_paragraph(draft: Draft) -> OcrResult<Paragraph> {
    let lines = draft
        .children
        .into_iter()
        .map(finish_line)
        .collect::<OcrResult<Vec<_>>>()?;
    let record = draft.record.as_ref();
    Ok(Paragraph {
        bbox: derive_bbox(record, lines.iter().map(|l| &l.bbox), Level::Paragraph)?,
        confidence: derive_confidence(record, lines.iter().map(|l| l.confidence)),
        lines,
    })
}

fn finish_line(draft: Draft) -> OcrResult<TextLine> {
    let words = draft
        .children
        .into_iter()
        .map(finish_word)
        .collect::<OcrResult<Vec<_>>>()?;
    let record = draft.record.as_ref();
    Ok(TextLine {
        bbox: derive_bbox(record, words.iter().map(|w| &w.bbox), Level::TextLine)?,
        confidence: derive_confidence(record, words.iter().map(|w| w.confidence)),
        words,
    })
}

fn finish_word(draft: Draft) -> OcrResult<Word> {
    let symbols = draft
        .children
        .into_iter()
        .map(finish_symbol)
        .collect::<OcrResult<Vec<_>>>()?;
    let record = draft.record;
    let bbox = derive_bbox(record.as_ref(), symbols.iter().map(|s| &s.bbox), Level::Word)?;
    let confidence = derive_confidence(record.as_ref(), symbols.iter().map(|s| s.confidence));
    let (text, is_from_dictionary, is_numeric, language) = match record {
        Some(r) => (r.text, r.is_from_dictionary, r.is_numeric, r.language),
        None => (None, false, false, None),
    };
    let text = match text {
        Some(text) => normalize(&text),
        None => normalize(&symbols.iter().map(|s| s.text.as_str()).collect::<String>()),
    };
    Ok(Word {
        bbox,
        confidence,
        text,
        is_from_dictionary,
        is_numeric,
        language,
        symbols,
    })
}

fn finish_symbol(draft: Draft) -> OcrResult<Symbol> {
    let record = draft.record.ok_or_else(|| {
        OcrError::RecognitionFailure(format!("symbol {} has no record", draft.ordinal))
    })?;
    Ok(Symbol {
        bbox: derive_bbox(Some(&record), std::iter::empty(), Level::Symbol)?,
        confidence: record.confidence.unwrap_or(0.0),
        text: record.text.as_deref().map(normalize).unwrap_or_default(),
        is_superscript: record.is_superscript,
        is_dropcap: record.is_dropcap,
        choices: record.choices,
    })
}

fn derive_bbox<'a>(
    record: Option<&RawElement>,
    children: impl IntoIterator<Item = &'a Rect>,
    level: Level,
) -> OcrResult<Rect> {
    record
        .and_then(|r| r.bbox)
        .or_else(|| Rect::union_all(children))
        .ok_or_else(|| OcrError::RecognitionFailure(format!("{level:?} element has no geometry")))
}

fn derive_confidence(record: Option<&RawElement>, children: impl IntoIterator<Item = f32>) -> f32 {
    record
        .and_then(|r| r.confidence)
        .or_else(|| mean_confidence(children))
        .unwrap_or(0.0)
}

fn normalize(text: &str) -> String {
    text.nfc().collect()
}
