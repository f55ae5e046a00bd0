//! Navigable page model over OCR engine output, with hOCR, ALTO, TSV, UNLV
//! and box-file renderers.

pub mod core;
pub mod cursor;
pub mod engine;
pub mod export;
pub mod ocr;
pub mod page;

pub use crate::core::errors::{OcrError, OcrResult};
pub use crate::core::geometry::Rect;
pub use crate::core::model::{Block, Choice, Level, PageLayout, Paragraph, Symbol, TextLine, Word};
pub use cursor::{ChoiceIterator, CursorState, Position, ResultCursor};
pub use engine::{Engine, EngineConfig};
pub use export::{exporter_for, ExportFormat, ExportOptions, Exporter};
pub use ocr::{RawElement, RecognitionBackend, ReplayBackend, SegmentationMode, TesseractCli, VariableValue};
pub use page::Page;
