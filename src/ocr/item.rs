use serde::{Deserialize, Serialize};
use std::fmt;

/// A recognized text region, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrItem {
    /// Recognized text.
    pub text: String,
    /// Quadrilateral corners, clockwise from top-left.
    #[serde(rename = "box")]
    pub quad: [[i32; 2]; 4],
    /// Axis-aligned bounds `[x1, y1, x2, y2]`.
    pub bbox: [i32; 4],
    /// Click point: floor of the mean of the four corners.
    pub center: [i32; 2],
    /// Recognition confidence.
    pub score: f32,
}

impl OcrItem {
    /// Build an item from its four corners, deriving `bbox` and `center`.
    pub fn from_quad(text: impl Into<String>, quad: [[i32; 2]; 4], score: f32) -> Self {
        let xs = quad.map(|p| p[0]);
        let ys = quad.map(|p| p[1]);
        let sum_x: i32 = xs.iter().sum();
        let sum_y: i32 = ys.iter().sum();
        Self {
            text: text.into(),
            quad,
            bbox: [
                xs.iter().copied().min().unwrap_or_default(),
                ys.iter().copied().min().unwrap_or_default(),
                xs.iter().copied().max().unwrap_or_default(),
                ys.iter().copied().max().unwrap_or_default(),
            ],
            center: [sum_x.div_euclid(4), sum_y.div_euclid(4)],
            score,
        }
    }

    /// Build an item from an axis-aligned rectangle.
    pub fn from_rect(text: impl Into<String>, x: i32, y: i32, w: i32, h: i32, score: f32) -> Self {
        Self::from_quad(
            text,
            [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
            score,
        )
    }

    pub fn width(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }
}

impl fmt::Display for OcrItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x1, y1, x2, y2] = self.bbox;
        write!(f, "({},{}) ({},{}) | {}", x1, y1, x2, y2, self.text)
    }
}

/// Sort items top-to-bottom, then left-to-right, by center.
pub fn sort_reading_order(items: &mut [OcrItem]) {
    items.sort_by_key(|it| (it.center[1], it.center[0]));
}
