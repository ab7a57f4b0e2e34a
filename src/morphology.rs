//! Grayscale dilation/erosion with a 3×3 rectangular neighbourhood.
//!
//! The square window is separable, so each pass runs a horizontal then a
//! vertical 3-tap max (or min) through a scratch buffer. Neighbours outside
//! the image are ignored rather than padded.

use crate::frame::Mask;

/// Dilation passes followed by the same number of erosion passes.
pub const CLOSING_PASSES: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Dilate,
    Erode,
}

impl Op {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Op::Dilate => a.max(b),
            Op::Erode => a.min(b),
        }
    }
}

/// Reusable scratch storage for morphology passes.
#[derive(Debug, Default)]
pub struct MorphologyWorkspace {
    scratch: Vec<u8>,
}

impl MorphologyWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove speckle and close small gaps: [`CLOSING_PASSES`] dilations
    /// then as many erosions, in place.
    pub fn clean(&mut self, mask: &mut Mask) {
        for _ in 0..CLOSING_PASSES {
            self.apply(mask, Op::Dilate);
        }
        for _ in 0..CLOSING_PASSES {
            self.apply(mask, Op::Erode);
        }
    }

    pub fn dilate(&mut self, mask: &mut Mask) {
        self.apply(mask, Op::Dilate);
    }

    pub fn erode(&mut self, mask: &mut Mask) {
        self.apply(mask, Op::Erode);
    }

    fn apply(&mut self, mask: &mut Mask, op: Op) {
        let (w, h) = (mask.w, mask.h);
        if w == 0 || h == 0 {
            return;
        }
        self.scratch.resize(w * h, 0);

        // horizontal: mask -> scratch
        for y in 0..h {
            let src = &mask.data[y * w..(y + 1) * w];
            let dst = &mut self.scratch[y * w..(y + 1) * w];
            for x in 0..w {
                let mut v = src[x];
                if x > 0 {
                    v = op.pick(v, src[x - 1]);
                }
                if x + 1 < w {
                    v = op.pick(v, src[x + 1]);
                }
                dst[x] = v;
            }
        }

        // vertical: scratch -> mask
        for y in 0..h {
            for x in 0..w {
                let mut v = self.scratch[y * w + x];
                if y > 0 {
                    v = op.pick(v, self.scratch[(y - 1) * w + x]);
                }
                if y + 1 < h {
                    v = op.pick(v, self.scratch[(y + 1) * w + x]);
                }
                mask.data[y * w + x] = v;
            }
        }
    }
}

/// One-shot [`MorphologyWorkspace::clean`].
pub fn clean(mask: &mut Mask) {
    MorphologyWorkspace::new().clean(mask);
}
