use std::cmp::{max, min};

use serde::{Deserialize, Serialize};

/// A position in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
///
/// `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from inclusive corner coordinates.
    pub fn from_corners(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.center_x(), self.center_y())
    }

    pub fn center_x(&self) -> f32 {
        self.x as f32 + self.width as f32 / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.height as f32 / 2.0
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.x <= x && x < self.right() && self.y <= y && y < self.bottom()
    }

    /// Smallest rectangle covering both. Empty rectangles are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let x = min(self.x, other.x);
        let y = min(self.y, other.y);
        Rect::new(
            x,
            y,
            max(self.right(), other.right()) - x,
            max(self.bottom(), other.bottom()) - y,
        )
    }

    /// Whether the vertical extents share at least one row.
    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }

    /// Number of columns shared by the two horizontal extents.
    pub fn horizontal_overlap(&self, other: &Rect) -> usize {
        min(self.right(), other.right()).saturating_sub(max(self.x, other.x))
    }

    /// Signed horizontal gap from `self` to `other`, negative when they overlap.
    pub fn horizontal_gap(&self, other: &Rect) -> i64 {
        if other.x >= self.right() {
            (other.x - self.right()) as i64
        } else if self.x >= other.right() {
            (self.x - other.right()) as i64
        } else {
            -(self.horizontal_overlap(other) as i64)
        }
    }
}

/// A single candidate produced by template matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatch {
    pub character: char,
    /// Index of the best-scoring variant within the character's template.
    pub variant: usize,
    pub score: f32,
}

impl ScoreMatch {
    pub fn new(character: char, variant: usize, score: f32) -> Self {
        Self {
            character,
            variant,
            score,
        }
    }
}

/// A recognized text line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Mean matching score over the line's non-space characters.
    pub confidence: f32,
    pub bbox: Rect,
}

/// OCR results for a single image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    pub page_index: u32,
    pub text: String,
    pub lines: Vec<TextLine>,
    pub confidence: f32,
}

/// Timing information for pipeline stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingInfo {
    pub preprocess_ms: f32,
    pub detect_ms: f32,
    pub recognize_ms: f32,
    pub correct_ms: f32,
    pub total_ms: f32,
}

/// Raw decoded image data, interleaved 8-bit channels.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl RawImage {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Expand 1-, 3- or 4-channel data to RGBA.
    pub fn to_rgba(&self) -> Option<Vec<u8>> {
        let n = self.width as usize * self.height as usize;
        let channels = self.channels as usize;
        if self.data.len() < n * channels {
            return None;
        }
        let rgba = match channels {
            4 => self.data[..n * 4].to_vec(),
            3 => self.data[..n * 3]
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            1 => self.data[..n].iter().flat_map(|&g| [g, g, g, 255]).collect(),
            _ => return None,
        };
        Some(rgba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty() {
        let a = Rect::new(2, 3, 4, 5);
        assert_eq!(a.union(&Rect::empty()), a);
        assert_eq!(Rect::empty().union(&a), a);
        assert_eq!(a.union(&Rect::new(0, 0, 1, 1)), Rect::new(0, 0, 6, 8));
    }

    #[test]
    fn horizontal_gap_is_signed() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.horizontal_gap(&Rect::new(14, 0, 3, 3)), 4);
        assert_eq!(Rect::new(14, 0, 3, 3).horizontal_gap(&a), 4);
        assert_eq!(a.horizontal_gap(&Rect::new(8, 0, 5, 3)), -2);
    }

    #[test]
    fn grayscale_expands_to_rgba() {
        let img = RawImage {
            data: vec![10, 200],
            width: 2,
            height: 1,
            channels: 1,
        };
        let rgba = img.to_rgba().unwrap();
        assert_eq!(rgba, vec![10, 10, 10, 255, 200, 200, 200, 255]);
    }
}
