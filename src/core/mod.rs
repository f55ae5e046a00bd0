pub mod confidence;
pub mod errors;
pub mod geometry;
pub mod model;

pub use errors::{OcrError, OcrResult};
pub use geometry::Rect;
pub use model::{Block, Choice, Level, NodeRef, PageLayout, Paragraph, Symbol, TextLine, Word};
