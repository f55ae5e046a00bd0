use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{OcrError, OcrResult};

/// Axis-aligned pixel rectangle with the origin at the image's top-left corner.
///
/// `x2`/`y2` are exclusive edges, so `width = x2 - x1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "RectCorners")]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Unchecked corners as they appear in serialized dumps.
#[derive(Deserialize)]
struct RectCorners {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl TryFrom<RectCorners> for Rect {
    type Error = OcrError;

    fn try_from(c: RectCorners) -> OcrResult<Self> {
        Rect::from_coords(c.x1, c.y1, c.x2, c.y2)
    }
}

impl Rect {
    pub fn from_coords(x1: u32, y1: u32, x2: u32, y2: u32) -> OcrResult<Self> {
        if x1 > x2 || y1 > y2 {
            return Err(OcrError::InvalidGeometry { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width),
            y2: y.saturating_add(height),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x1 + self.x2) as f32 * 0.5,
            (self.y1 + self.y2) as f32 * 0.5,
        )
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        (x1 <= x2 && y1 <= y2).then_some(Self { x1, y1, x2, y2 })
    }

    pub fn contains_rect(&self, other: &Self) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x1 as f32 && x <= self.x2 as f32 && y >= self.y1 as f32 && y <= self.y2 as f32
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let inter_area = self.intersection(other).map_or(0, |inter| inter.area());
        let union = self.area() + other.area() - inter_area;
        if union == 0 {
            0.0
        } else {
            inter_area as f32 / union as f32
        }
    }

    pub fn translate(&self, dx: u32, dy: u32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Returns `(left, bottom, right, top)` with Y measured up from the bottom
    /// edge of an image `image_height` pixels tall.
    pub fn to_bottom_up(&self, image_height: u32) -> (u32, u32, u32, u32) {
        (
            self.x1,
            image_height.saturating_sub(self.y2),
            self.x2,
            image_height.saturating_sub(self.y1),
        )
    }

    /// Inverse of [`Rect::to_bottom_up`].
    pub fn from_bottom_up(
        left: u32,
        bottom: u32,
        right: u32,
        top: u32,
        image_height: u32,
    ) -> OcrResult<Self> {
        Self::from_coords(
            left,
            image_height.saturating_sub(top),
            right,
            image_height.saturating_sub(bottom),
        )
    }

    /// Smallest rectangle covering every rectangle in `rects`.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc: Option<Rect>, r| {
            Some(acc.map_or(*r, |a| a.union(r)))
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_inverted_coordinates() {
        assert!(matches!(
            Rect::from_coords(10, 0, 5, 5),
            Err(OcrError::InvalidGeometry { x1: 10, .. })
        ));
        assert!(matches!(
            Rect::from_coords(0, 8, 5, 5),
            Err(OcrError::InvalidGeometry { y1: 8, .. })
        ));
    }

    #[test]
    fn deserializing_checks_corners() {
        let rect: Rect = serde_json::from_str(r#"{"x1":1,"y1":2,"x2":3,"y2":4}"#).unwrap();
        assert_eq!(rect, Rect::from_coords(1, 2, 3, 4).unwrap());
        let err = serde_json::from_str::<Rect>(r#"{"x1":30,"y1":10,"x2":10,"y2":40}"#).unwrap_err();
        assert!(err.to_string().contains("inverted corners"));
    }

    #[test]
    fn derives_size_from_corners() {
        let rect = Rect::from_coords(3, 4, 13, 24).unwrap();
        assert_eq!(rect.width(), 10);
        assert_eq!(rect.height(), 20);
        assert_eq!(rect.area(), 200);
        assert_eq!(Rect::new(3, 4, 10, 20), rect);
    }

    #[test]
    fn degenerate_rect_is_valid_but_empty() {
        let rect = Rect::from_coords(5, 5, 5, 9).unwrap();
        assert!(rect.is_empty());
        assert_eq!(rect.area(), 0);
    }

    #[test]
    fn computes_iou() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.iou(&b), 25.0 / 175.0);
        assert_eq!(a.iou(&Rect::new(20, 20, 5, 5)), 0.0);
    }

    #[test]
    fn converts_to_bottom_up_and_back() {
        let rect = Rect::from_coords(10, 20, 30, 50).unwrap();
        assert_eq!(rect.to_bottom_up(100), (10, 50, 30, 80));
        assert_eq!(Rect::from_bottom_up(10, 50, 30, 80, 100).unwrap(), rect);
    }

    #[test]
    fn unions_many() {
        let rects = [Rect::new(5, 5, 1, 1), Rect::new(0, 7, 2, 2)];
        assert_eq!(
            Rect::union_all(&rects),
            Some(Rect::from_coords(0, 5, 6, 9).unwrap())
        );
        assert_eq!(Rect::union_all(&[]), None);
    }
}
