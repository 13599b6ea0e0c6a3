use serde::{Deserialize, Serialize};

/// Screen-space rectangle in integer pixels, stored as edges.
///
/// A rectangle that actually encloses area always satisfies `right > left`
/// and `bottom > top`. Degenerate (zero-area) rects are used as deltas for
/// resize adjustments and work-area offsets.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn width(&self) -> i32 { self.right - self.left }

    pub const fn height(&self) -> i32 { self.bottom - self.top }

    pub const fn area(&self) -> i64 { self.width() as i64 * self.height() as i64 }

    pub const fn is_empty(&self) -> bool { self.right <= self.left || self.bottom <= self.top }

    /// Shrink every edge inward by `padding`.
    pub fn add_padding<T>(&mut self, padding: T)
    where T: Into<Option<i32>> {
        if let Some(padding) = padding.into() {
            self.left += padding;
            self.top += padding;
            self.right -= padding;
            self.bottom -= padding;
        }
    }

    /// Apply a work-area offset: each field of `offset` moves the matching
    /// edge inward.
    #[must_use]
    pub fn offset_by(mut self, offset: Rect) -> Self {
        self.left += offset.left;
        self.top += offset.top;
        self.right -= offset.right;
        self.bottom -= offset.bottom;
        self
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Mirror this rect across the vertical centerline of `bounds`.
    #[must_use]
    pub fn flipped_horizontal(&self, bounds: &Rect) -> Self {
        Self {
            left: bounds.left + (bounds.right - self.right),
            right: bounds.left + (bounds.right - self.left),
            top: self.top,
            bottom: self.bottom,
        }
    }

    /// Mirror this rect across the horizontal centerline of `bounds`.
    #[must_use]
    pub fn flipped_vertical(&self, bounds: &Rect) -> Self {
        Self {
            left: self.left,
            right: self.right,
            top: bounds.top + (bounds.bottom - self.bottom),
            bottom: bounds.top + (bounds.bottom - self.top),
        }
    }
}
