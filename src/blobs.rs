//! Connected-region extraction on a cleaned mask.
//!
//! Any non-zero pixel is foreground. Background enclosed by a region counts
//! towards that region, so holes are never reported on their own and regions
//! nested inside a hole merge into their enclosing region. Foreground uses
//! 8-connectivity and background 4-connectivity, the usual dual pairing that
//! keeps diagonal gaps in an outline from leaking.

use crate::frame::Mask;
use crate::geometry::{Point2, Rect};

/// Smallest region kept by default, in pixels.
pub const DEFAULT_MIN_AREA: usize = 900;

/// Default upper bound: half of the frame.
pub fn default_max_area(w: usize, h: usize) -> usize {
    (w * h) / 2
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Mean pixel position in sensor pixel space.
    pub centroid: Point2,
    /// Pixel count, enclosed holes included.
    pub area: usize,
    pub bounds: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaBand {
    pub min: usize,
    pub max: usize,
}

impl AreaBand {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn for_frame(w: usize, h: usize) -> Self {
        Self::new(DEFAULT_MIN_AREA, default_max_area(w, h))
    }

    #[inline]
    pub fn contains(&self, area: usize) -> bool {
        (self.min..=self.max).contains(&area)
    }
}

struct RegionAccumulator {
    count: usize,
    sum_x: f64,
    sum_y: f64,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl RegionAccumulator {
    fn new(x: usize, y: usize) -> Self {
        Self {
            count: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    #[inline]
    fn push(&mut self, x: usize, y: usize) {
        self.count += 1;
        self.sum_x += x as f64;
        self.sum_y += y as f64;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn into_blob(self) -> Blob {
        let n = self.count as f64;
        Blob {
            centroid: Point2::new((self.sum_x / n) as f32, (self.sum_y / n) as f32),
            area: self.count,
            bounds: Rect::new(
                self.min_x as f32,
                self.min_y as f32,
                (self.max_x - self.min_x + 1) as f32,
                (self.max_y - self.min_y + 1) as f32,
            ),
        }
    }
}

/// Reusable buffers for [`BlobExtractor::extract`].
#[derive(Debug, Default)]
pub struct BlobExtractor {
    outside: Vec<bool>,
    visited: Vec<bool>,
    stack: Vec<usize>,
}

impl BlobExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Regions whose filled area lies in `band`, in raster order of their
    /// first pixel.
    pub fn extract(&mut self, mask: &Mask, band: AreaBand) -> Vec<Blob> {
        let (w, h) = (mask.w, mask.h);
        let mut blobs = Vec::new();
        if w == 0 || h == 0 {
            return blobs;
        }
        self.mark_outside(mask);

        self.visited.clear();
        self.visited.resize(w * h, false);
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                if self.visited[i] || self.outside[i] {
                    continue;
                }
                let region = self.flood_region(w, h, x, y);
                if band.contains(region.count) {
                    blobs.push(region.into_blob());
                }
            }
        }
        blobs
    }

    /// Flag background pixels 4-connected to the image border.
    fn mark_outside(&mut self, mask: &Mask) {
        let (w, h) = (mask.w, mask.h);
        self.outside.clear();
        self.outside.resize(w * h, false);
        self.stack.clear();

        let seed = |i: usize, outside: &mut Vec<bool>, stack: &mut Vec<usize>| {
            if mask.data[i] == 0 && !outside[i] {
                outside[i] = true;
                stack.push(i);
            }
        };
        for x in 0..w {
            seed(x, &mut self.outside, &mut self.stack);
            seed((h - 1) * w + x, &mut self.outside, &mut self.stack);
        }
        for y in 0..h {
            seed(y * w, &mut self.outside, &mut self.stack);
            seed(y * w + w - 1, &mut self.outside, &mut self.stack);
        }

        while let Some(i) = self.stack.pop() {
            let (x, y) = (i % w, i / w);
            let mut visit = |j: usize| {
                if mask.data[j] == 0 && !self.outside[j] {
                    self.outside[j] = true;
                    self.stack.push(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < w {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - w);
            }
            if y + 1 < h {
                visit(i + w);
            }
        }
    }

    /// Collect the 8-connected region of non-outside pixels around `(x0, y0)`.
    fn flood_region(&mut self, w: usize, h: usize, x0: usize, y0: usize) -> RegionAccumulator {
        let mut acc = RegionAccumulator::new(x0, y0);
        let start = y0 * w + x0;
        self.visited[start] = true;
        self.stack.clear();
        self.stack.push(start);

        while let Some(i) = self.stack.pop() {
            let (x, y) = (i % w, i / w);
            acc.push(x, y);
            let y_lo = y.saturating_sub(1);
            let y_hi = (y + 1).min(h - 1);
            let x_lo = x.saturating_sub(1);
            let x_hi = (x + 1).min(w - 1);
            for ny in y_lo..=y_hi {
                for nx in x_lo..=x_hi {
                    let j = ny * w + nx;
                    if !self.visited[j] && !self.outside[j] {
                        self.visited[j] = true;
                        self.stack.push(j);
                    }
                }
            }
        }
        acc
    }
}

/// Drop all but the `count` largest blobs. Survivors keep their relative
/// order; equal areas favour the earlier blob.
pub fn keep_largest(blobs: &mut Vec<Blob>, count: usize) {
    if blobs.len() <= count {
        return;
    }
    let mut by_area: Vec<usize> = (0..blobs.len()).collect();
    by_area.sort_by(|&a, &b| blobs[b].area.cmp(&blobs[a].area));
    let mut keep = vec![false; blobs.len()];
    for &i in &by_area[..count] {
        keep[i] = true;
    }
    let mut i = 0;
    blobs.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}

/// One-shot [`BlobExtractor::extract`].
pub fn extract(mask: &Mask, band: AreaBand) -> Vec<Blob> {
    BlobExtractor::new().extract(mask, band)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(mask: &mut Mask, x0: usize, y0: usize, w: usize, h: usize, v: u8) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, v);
            }
        }
    }

    #[test]
    fn area_band_is_inclusive_at_min() {
        let band = AreaBand::new(900, 100_000);

        let mut mask = Mask::new(100, 100);
        fill_rect(&mut mask, 10, 10, 30, 30, 255);
        let blobs = extract(&mask, band);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 900);

        mask.set(39, 39, 0); // 899 pixels, corner removed keeps it one region
        assert!(extract(&mask, band).is_empty());
    }

    #[test]
    fn area_band_is_inclusive_at_max() {
        let mut mask = Mask::new(20, 20);
        fill_rect(&mut mask, 2, 2, 10, 10, 255);
        assert_eq!(extract(&mask, AreaBand::new(1, 100)).len(), 1);
        assert!(extract(&mask, AreaBand::new(1, 99)).is_empty());
    }

    #[test]
    fn centroid_and_bounds_of_square() {
        let mut mask = Mask::new(64, 48);
        fill_rect(&mut mask, 10, 20, 4, 6, 17);
        let blobs = extract(&mask, AreaBand::new(1, 1000));
        assert_eq!(blobs.len(), 1);
        let b = &blobs[0];
        assert_eq!(b.centroid, Point2::new(11.5, 22.5));
        assert_eq!(b.bounds, Rect::new(10.0, 20.0, 4.0, 6.0));
    }

    #[test]
    fn ring_is_one_blob_with_filled_hole() {
        let mut mask = Mask::new(30, 30);
        fill_rect(&mut mask, 5, 5, 20, 20, 255);
        fill_rect(&mut mask, 10, 10, 10, 10, 0);
        // island inside the hole is absorbed by the enclosing region
        fill_rect(&mut mask, 14, 14, 2, 2, 255);
        let blobs = extract(&mask, AreaBand::new(1, 10_000));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 400);
        assert_eq!(blobs[0].centroid, Point2::new(14.5, 14.5));
    }

    #[test]
    fn diagonal_neighbours_join_but_open_gaps_do_not() {
        let mut mask = Mask::new(10, 10);
        mask.set(2, 2, 255);
        mask.set(3, 3, 255);
        mask.set(7, 7, 255);
        let blobs = extract(&mask, AreaBand::new(1, 10));
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area, 2);
        assert_eq!(blobs[1].area, 1);
    }

    #[test]
    fn raster_order_of_first_pixel() {
        let mut mask = Mask::new(50, 50);
        fill_rect(&mut mask, 30, 5, 5, 5, 255);
        fill_rect(&mut mask, 2, 20, 8, 8, 255);
        fill_rect(&mut mask, 5, 2, 3, 3, 255);
        let blobs = extract(&mask, AreaBand::new(1, 1000));
        let areas: Vec<usize> = blobs.iter().map(|b| b.area).collect();
        assert_eq!(areas, vec![9, 25, 64]);
    }

    #[test]
    fn keep_largest_preserves_raster_order() {
        let mut mask = Mask::new(50, 50);
        fill_rect(&mut mask, 30, 5, 5, 5, 255);
        fill_rect(&mut mask, 2, 20, 8, 8, 255);
        fill_rect(&mut mask, 5, 2, 3, 3, 255);
        let mut blobs = extract(&mask, AreaBand::new(1, 1000));
        keep_largest(&mut blobs, 2);
        let areas: Vec<usize> = blobs.iter().map(|b| b.area).collect();
        assert_eq!(areas, vec![25, 64]);

        keep_largest(&mut blobs, 5);
        assert_eq!(blobs.len(), 2);
        keep_largest(&mut blobs, 0);
        assert!(blobs.is_empty());
    }

    #[test]
    fn keep_largest_breaks_ties_by_position() {
        let mut mask = Mask::new(40, 10);
        fill_rect(&mut mask, 1, 1, 3, 3, 255);
        fill_rect(&mut mask, 11, 1, 3, 3, 255);
        fill_rect(&mut mask, 21, 1, 3, 3, 255);
        let mut blobs = extract(&mask, AreaBand::new(1, 100));
        keep_largest(&mut blobs, 2);
        let xs: Vec<f32> = blobs.iter().map(|b| b.centroid.x).collect();
        assert_eq!(xs, vec![2.0, 12.0]);
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        let mask = Mask::new(16, 16);
        assert!(extract(&mask, AreaBand::new(0, 1000)).is_empty());
        assert!(extract(&Mask::new(0, 0), AreaBand::new(0, 10)).is_empty());
    }
}
