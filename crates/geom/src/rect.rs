use super::{Expanse, Insets, Point};

/// A rectangle with a top-left corner and an unsigned extent.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

/// Clamp a u32 extent into the i32 coordinate space.
fn extent(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl Rect {
    /// Construct a rectangle.
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// A zero-sized rectangle at the origin.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Does this rectangle have zero area?
    pub fn is_zero(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// The exclusive right edge.
    pub fn right(&self) -> i32 {
        self.tl.x.saturating_add(extent(self.w))
    }

    /// The exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.tl.y.saturating_add(extent(self.h))
    }

    /// The size of this rectangle.
    pub fn expanse(&self) -> Expanse {
        Expanse::new(self.w, self.h)
    }

    /// Does the rectangle contain a point? The top and left edges are
    /// inclusive, the bottom and right edges are exclusive.
    pub fn contains_point(&self, p: impl Into<Point>) -> bool {
        let p = p.into();
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// Does this rectangle completely enclose another?
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.tl.x >= self.tl.x
            && other.tl.y >= self.tl.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Move the rectangle by an offset.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            tl: self.tl.offset(dx, dy),
            w: self.w,
            h: self.h,
        }
    }

    /// Shrink the rectangle by a set of insets. Insets larger than the
    /// rectangle collapse the corresponding dimension to zero.
    pub fn shrink(&self, insets: Insets) -> Self {
        let w = self.w.saturating_sub(insets.left + insets.right);
        let h = self.h.saturating_sub(insets.top + insets.bottom);
        Self {
            tl: self.tl.offset(extent(insets.left), extent(insets.top)),
            w,
            h,
        }
    }

    /// Grow the rectangle outward by a set of insets.
    pub fn grow(&self, insets: Insets) -> Self {
        Self {
            tl: self.tl.offset(-extent(insets.left), -extent(insets.top)),
            w: self.w.saturating_add(insets.left + insets.right),
            h: self.h.saturating_add(insets.top + insets.bottom),
        }
    }

    /// The overlapping region of two rectangles, if any.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x = self.tl.x.max(other.tl.x);
        let y = self.tl.y.max(other.tl.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        if r <= x || b <= y {
            return None;
        }
        Some(Self::new(x, y, r.abs_diff(x), b.abs_diff(y)))
    }
}
