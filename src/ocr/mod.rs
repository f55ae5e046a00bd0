pub mod bridge;
pub mod layout_builder;
pub mod replay;
pub mod variables;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::core::errors::OcrResult;
use crate::core::geometry::Rect;
use crate::core::model::{Choice, Level};

pub use bridge::TesseractCli;
pub use replay::ReplayBackend;
pub use variables::{MemoryVariables, VariableStore, VariableValue};

/// Page layout assumption handed to the recognition engine.
///
/// Discriminants are Tesseract's `--psm` numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    #[default]
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertText = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl SegmentationMode {
    pub fn as_psm(self) -> u8 {
        self as u8
    }
}

/// One record of the engine's flat result dump.
///
/// Records are keyed by their level and 1-based ordinals within each
/// ancestor, the way Tesseract's TSV output numbers them. Ordinals deeper
/// than `level` are ignored. Values left as `None` are derived from the
/// children when the tree is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawElement {
    pub level: Level,
    pub block_num: usize,
    #[serde(default)]
    pub par_num: usize,
    #[serde(default)]
    pub line_num: usize,
    #[serde(default)]
    pub word_num: usize,
    #[serde(default)]
    pub symbol_num: usize,
    #[serde(default)]
    pub bbox: Option<Rect>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_from_dictionary: bool,
    #[serde(default)]
    pub is_numeric: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_superscript: bool,
    #[serde(default)]
    pub is_dropcap: bool,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl RawElement {
    /// A bare record at `level` addressed by `ordinals` (outermost first).
    pub fn new(level: Level, ordinals: &[usize]) -> Self {
        let at = |i: usize| ordinals.get(i).copied().unwrap_or(0);
        Self {
            level,
            block_num: at(0),
            par_num: at(1),
            line_num: at(2),
            word_num: at(3),
            symbol_num: at(4),
            bbox: None,
            confidence: None,
            text: None,
            is_from_dictionary: false,
            is_numeric: false,
            language: None,
            is_superscript: false,
            is_dropcap: false,
            choices: Vec::new(),
        }
    }

    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Ordinals from the block down to this record's own level.
    pub fn key(&self) -> Vec<usize> {
        [
            self.block_num,
            self.par_num,
            self.line_num,
            self.word_num,
            self.symbol_num,
        ][..=self.level.index()]
            .to_vec()
    }
}

/// The external recognition engine.
///
/// Implementations turn an image, a region of interest and a segmentation
/// mode into a flat result dump, and own the engine's named variables.
pub trait RecognitionBackend: VariableStore {
    fn recognize(
        &self,
        image: &DynamicImage,
        region: Rect,
        mode: SegmentationMode,
    ) -> OcrResult<Vec<RawElement>>;
}
