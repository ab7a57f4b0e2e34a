//! Depth frames coming from a sensor and the single-channel masks derived
//! from them.

use serde::{Deserialize, Serialize};

/// Pinhole projection used to lift a depth reading into sensor-centred world
/// coordinates (millimetres, z along the optical axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Nominal parameters of a 640×480 structured-light depth sensor.
    pub const fn nominal_640x480() -> Self {
        Self {
            fx: 580.0,
            fy: 580.0,
            cx: 320.0,
            cy: 240.0,
        }
    }

    #[inline]
    pub fn unproject(&self, u: usize, v: usize, depth_mm: u16) -> [f64; 3] {
        let z = f64::from(depth_mm);
        [
            (u as f64 - self.cx) * z / self.fx,
            (v as f64 - self.cy) * z / self.fy,
            z,
        ]
    }
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::nominal_640x480()
    }
}

/// One sensor frame: raw depth in millimetres (0 = no reading) plus the
/// projection needed for world coordinates. The buffer always holds exactly
/// `w × h` readings.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    w: usize,
    h: usize,
    depth: Vec<u16>,
    intrinsics: Intrinsics,
}

impl DepthFrame {
    /// Frame of `w × h` invalid readings.
    pub fn new(w: usize, h: usize, intrinsics: Intrinsics) -> Self {
        Self {
            w,
            h,
            depth: vec![0; w * h],
            intrinsics,
        }
    }

    pub fn from_depth(w: usize, h: usize, depth: Vec<u16>, intrinsics: Intrinsics) -> Option<Self> {
        (depth.len() == w * h).then_some(Self {
            w,
            h,
            depth,
            intrinsics,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.h
    }

    pub fn depth(&self) -> &[u16] {
        &self.depth
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    #[inline]
    pub fn distance_at(&self, x: usize, y: usize) -> u16 {
        self.depth[y * self.w + x]
    }

    #[inline]
    pub fn set_distance(&mut self, x: usize, y: usize, mm: u16) {
        self.depth[y * self.w + x] = mm;
    }

    #[inline]
    pub fn world_at(&self, x: usize, y: usize) -> [f64; 3] {
        self.intrinsics.unproject(x, y, self.distance_at(x, y))
    }
}

/// Owned 8-bit mask in row-major layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<u8>,
}

impl Mask {
    /// Zero-initialised mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_buffer_must_match_dimensions() {
        let k = Intrinsics::default();
        assert!(DepthFrame::from_depth(4, 3, vec![0; 11], k).is_none());
        assert!(DepthFrame::from_depth(4, 3, vec![0; 13], k).is_none());

        let frame = DepthFrame::from_depth(4, 3, vec![7; 12], k).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.depth().len(), 12);
        assert_eq!(frame.distance_at(3, 2), 7);
    }

    #[test]
    fn world_at_uses_pinhole_projection() {
        let mut frame = DepthFrame::new(640, 480, Intrinsics::nominal_640x480());
        frame.set_distance(320, 240, 1000);
        assert_eq!(frame.world_at(320, 240), [0.0, 0.0, 1000.0]);
        frame.set_distance(378, 182, 580);
        assert_eq!(frame.world_at(378, 182), [58.0, -58.0, 580.0]);
    }
}
