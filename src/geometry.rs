//! Axis-aligned rectangles and the clamp-then-remap point mapping shared by
//! the cursor normalisation and the preview overlay.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rectangle anchored at `(x, y)`. Width and height may be negative until
/// [`Rect::standardize`] is called; the edge accessors always report the
/// ordered bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two corners, in any order.
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self::new(a.x, a.y, b.x - a.x, b.y - a.y).standardize()
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x.min(self.x + self.width)
    }
    #[inline]
    pub fn right(&self) -> f32 {
        self.x.max(self.x + self.width)
    }
    #[inline]
    pub fn top(&self) -> f32 {
        self.y.min(self.y + self.height)
    }
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y.max(self.y + self.height)
    }

    pub fn top_left(&self) -> Point2 {
        Point2::new(self.left(), self.top())
    }

    pub fn bottom_right(&self) -> Point2 {
        Point2::new(self.right(), self.bottom())
    }

    /// Same rectangle with non-negative width and height.
    pub fn standardize(self) -> Self {
        Self::new(
            self.left(),
            self.top(),
            self.width.abs(),
            self.height.abs(),
        )
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Nearest point of the rectangle (boundary included) to `p`.
    pub fn clamp(&self, p: Point2) -> Point2 {
        Point2::new(
            p.x.clamp(self.left(), self.right()),
            p.y.clamp(self.top(), self.bottom()),
        )
    }
}

/// Linear remap of `v` from `[in_min, in_max]` to `[out_min, out_max]`,
/// unclamped. A zero-width input range collapses onto `out_min`.
#[inline]
pub fn remap(v: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span.abs() < f64::from(f32::EPSILON) {
        return out_min;
    }
    out_min + (v - in_min) / span * (out_max - out_min)
}

/// Clamp `p` into `src`, then remap each axis independently onto `dst`.
///
/// `src` must have non-zero width and height; a degenerate source is a caller
/// error and yields `dst`'s top-left corner.
pub fn map_point(p: Point2, src: &Rect, dst: &Rect) -> Point2 {
    let c = src.clamp(p);
    let x = remap(
        f64::from(c.x),
        f64::from(src.left()),
        f64::from(src.right()),
        f64::from(dst.left()),
        f64::from(dst.right()),
    );
    let y = remap(
        f64::from(c.y),
        f64::from(src.top()),
        f64::from(src.bottom()),
        f64::from(dst.top()),
        f64::from(dst.bottom()),
    );
    Point2::new(x as f32, y as f32)
}

/// Map both corners of `rect` from `src` into `dst`.
pub fn map_rect(rect: &Rect, src: &Rect, dst: &Rect) -> Rect {
    let tl = map_point(rect.top_left(), src, dst);
    let br = map_point(rect.bottom_right(), src, dst);
    Rect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y)
}
