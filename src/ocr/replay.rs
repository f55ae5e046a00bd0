use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::core::errors::OcrResult;
use crate::core::geometry::Rect;
use crate::core::model::Level;
use crate::ocr::variables::{MemoryVariables, VariableStore, VariableValue};
use crate::ocr::{RawElement, RecognitionBackend, SegmentationMode};

/// Backend that replays a recorded result dump instead of running an engine.
///
/// The dump is scoped to the requested region: a word survives when the
/// centre of its box lies inside the region, its symbols follow it, and an
/// ancestor survives while it still holds a word. Ancestors that lost some
/// of their words have their box and confidence re-derived from what is left.
#[derive(Debug, Clone, Default)]
pub struct ReplayBackend {
    records: Vec<RawElement>,
    variables: MemoryVariables,
}

impl ReplayBackend {
    pub fn new(records: Vec<RawElement>) -> Self {
        Self {
            records,
            variables: MemoryVariables::new(),
        }
    }

    /// Loads a dump written as a JSON array of records.
    pub fn from_json_file(path: &Path) -> OcrResult<Self> {
        let data = fs::read_to_string(path)?;
        let records: Vec<RawElement> = serde_json::from_str(&data)?;
        debug!(path = %path.display(), records = records.len(), "loaded replay dump");
        Ok(Self::new(records))
    }

    pub fn with_variables(mut self, variables: MemoryVariables) -> Self {
        self.variables = variables;
        self
    }

    pub fn records(&self) -> &[RawElement] {
        &self.records
    }
}

impl VariableStore for ReplayBackend {
    fn get(&self, name: &str) -> Option<VariableValue> {
        self.variables.get(name)
    }

    fn set(&mut self, name: &str, value: VariableValue) -> bool {
        self.variables.set(name, value)
    }

    fn entries(&self) -> Vec<(String, VariableValue)> {
        self.variables.entries()
    }
}

impl RecognitionBackend for ReplayBackend {
    fn recognize(
        &self,
        _image: &DynamicImage,
        region: Rect,
        _mode: SegmentationMode,
    ) -> OcrResult<Vec<RawElement>> {
        Ok(scope_to_region(&self.records, region))
    }
}

/// Keeps the part of `records` that falls inside `region`.
pub fn scope_to_region(records: &[RawElement], region: Rect) -> Vec<RawElement> {
    let word_boxes = word_boxes(records);

    let mut kept_words: HashSet<Vec<usize>> = HashSet::new();
    let mut populated: HashSet<Vec<usize>> = HashSet::new();
    let mut trimmed: HashSet<Vec<usize>> = HashSet::new();
    for (key, bbox) in &word_boxes {
        let inside = match bbox {
            Some(bbox) => {
                let (cx, cy) = bbox.center();
                region.contains_point(cx, cy)
            }
            None => {
                warn!(key = ?key, "word without geometry dropped");
                false
            }
        };
        for depth in 1..key.len() {
            let prefix = key[..depth].to_vec();
            populated.insert(prefix.clone());
            if !inside {
                trimmed.insert(prefix);
            }
        }
        if inside {
            kept_words.insert(key.clone());
        }
    }
    let survivors: HashSet<Vec<usize>> = kept_words
        .iter()
        .flat_map(|key| (1..key.len()).map(move |depth| key[..depth].to_vec()))
        .collect();

    let scoped: Vec<RawElement> = records
        .iter()
        .filter_map(|record| {
            let key = record.key();
            match record.level {
                Level::Symbol => kept_words.contains(&key[..4]).then(|| record.clone()),
                Level::Word => kept_words.contains(&key).then(|| record.clone()),
                _ if survivors.contains(&key) => {
                    let mut record = record.clone();
                    if trimmed.contains(&key) {
                        record.bbox = None;
                        record.confidence = None;
                    }
                    Some(record)
                }
                _ if !populated.contains(&key) => record
                    .bbox
                    .filter(|bbox| {
                        let (cx, cy) = bbox.center();
                        region.contains_point(cx, cy)
                    })
                    .map(|_| record.clone()),
                _ => None,
            }
        })
        .collect();
    debug!(
        %region,
        total = records.len(),
        kept = scoped.len(),
        "scoped replay dump to region"
    );
    scoped
}

/// Box of every word key: its own, or the union of its symbols.
fn word_boxes(records: &[RawElement]) -> Vec<(Vec<usize>, Option<Rect>)> {
    let mut order: Vec<Vec<usize>> = Vec::new();
    let mut boxes: HashMap<Vec<usize>, Option<Rect>> = HashMap::new();
    for record in records {
        let key = record.key();
        let (word_key, bbox) = match record.level {
            Level::Word => (key, record.bbox),
            Level::Symbol => (key[..4].to_vec(), record.bbox),
            _ => continue,
        };
        let entry = boxes.entry(word_key.clone()).or_insert_with(|| {
            order.push(word_key);
            None
        });
        if record.level == Level::Word && bbox.is_some() {
            *entry = bbox;
        } else if let Some(bbox) = bbox {
            *entry = Some(entry.map_or(bbox, |acc| acc.union(&bbox)));
        }
    }
    order
        .into_iter()
        .map(|key| {
            let bbox = boxes.get(&key).copied().flatten();
            (key, bbox)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dump() -> Vec<RawElement> {
        vec![
            RawElement::new(Level::Block, &[1])
                .with_bbox(Rect::new(0, 0, 100, 60))
                .with_confidence(50.0),
            RawElement::new(Level::TextLine, &[1, 1, 1]).with_bbox(Rect::new(0, 0, 100, 20)),
            RawElement::new(Level::Word, &[1, 1, 1, 1])
                .with_bbox(Rect::new(0, 0, 40, 20))
                .with_text("top"),
            RawElement::new(Level::Symbol, &[1, 1, 1, 1, 1])
                .with_bbox(Rect::new(0, 0, 10, 20))
                .with_text("t"),
            RawElement::new(Level::TextLine, &[1, 1, 2]).with_bbox(Rect::new(0, 40, 100, 20)),
            RawElement::new(Level::Word, &[1, 1, 2, 1])
                .with_bbox(Rect::new(0, 40, 60, 20))
                .with_text("bottom"),
        ]
    }

    #[test]
    fn full_region_keeps_everything() {
        let records = dump();
        assert_eq!(scope_to_region(&records, Rect::new(0, 0, 100, 60)), records);
    }

    #[test]
    fn drops_words_outside_and_rederives_ancestors() {
        let scoped = scope_to_region(&dump(), Rect::new(0, 0, 100, 30));
        let texts: Vec<_> = scoped.iter().filter_map(|r| r.text.clone()).collect();
        assert_eq!(texts, vec!["top".to_string(), "t".to_string()]);
        let block = &scoped[0];
        assert_eq!(block.level, Level::Block);
        assert_eq!(block.bbox, None);
        assert_eq!(block.confidence, None);
        // The surviving line lost nothing, so it keeps its own box.
        assert_eq!(scoped[1].bbox, Some(Rect::new(0, 0, 100, 20)));
    }

    #[test]
    fn dump_with_inverted_box_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        std::fs::write(
            &path,
            r#"[{"level":"word","block_num":1,"par_num":1,"line_num":1,"word_num":1,"bbox":{"x1":30,"y1":10,"x2":10,"y2":40},"text":"bad"}]"#,
        )
        .unwrap();
        assert!(matches!(
            ReplayBackend::from_json_file(&path),
            Err(crate::core::errors::OcrError::Json(_))
        ));
    }

    #[test]
    fn empty_region_keeps_nothing() {
        assert!(scope_to_region(&dump(), Rect::new(90, 55, 5, 5)).is_empty());
    }
}
