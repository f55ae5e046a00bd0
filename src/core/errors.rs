use thiserror::Error;

use crate::core::geometry::Rect;

/// Errors surfaced by the model, the cursor, the exporters and the engine facade.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid geometry: ({x1}, {y1}) - ({x2}, {y2}) has inverted corners")]
    InvalidGeometry { x1: u32, y1: u32, x2: u32, y2: u32 },

    #[error("region {region} exceeds the page extent {width}x{height}")]
    OutOfBounds { region: Rect, width: u32, height: u32 },

    #[error("cursor operation not valid in the current state: {0}")]
    InvalidState(&'static str),

    #[error("recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("region {region} lies outside the image bounds {width}x{height}")]
    InvalidRegion { region: Rect, width: u32, height: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

pub type OcrResult<T> = Result<T, OcrError>;
