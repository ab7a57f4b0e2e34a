//! Per-pixel depth segmentation against the reference plane.

use crate::frame::{DepthFrame, Mask};
use crate::geometry::remap;
use crate::plane::{DistanceThreshold, PlaneEquation};

/// How foreground pixels are written into the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskEncoding {
    /// Every pixel in front of the plane becomes 255.
    Binary,
    /// Foreground pixels encode their distance to the plane, saturating at
    /// half the distance threshold.
    LocalDepth,
}

impl MaskEncoding {
    pub fn from_local_depth(local_depth: bool) -> Self {
        if local_depth {
            Self::LocalDepth
        } else {
            Self::Binary
        }
    }
}

/// Segment `frame` into a freshly allocated mask.
pub fn segment(
    frame: &DepthFrame,
    plane: &PlaneEquation,
    encoding: MaskEncoding,
    distance: DistanceThreshold,
) -> Mask {
    let mut mask = Mask::new(frame.width(), frame.height());
    segment_into(frame, plane, encoding, distance, &mut mask);
    mask
}

/// Segment `frame` into `mask`.
///
/// Pixels without a depth reading are not written, so `mask` must be cleared
/// by the caller when it is reused across frames.
pub fn segment_into(
    frame: &DepthFrame,
    plane: &PlaneEquation,
    encoding: MaskEncoding,
    distance: DistanceThreshold,
    mask: &mut Mask,
) {
    debug_assert_eq!((mask.w, mask.h), (frame.width(), frame.height()));
    // integer halving, as the threshold is specified in whole millimetres
    let half_range = f64::from(distance.millimeters() / 2);

    for y in 0..frame.height() {
        for x in 0..frame.width() {
            if frame.distance_at(x, y) == 0 {
                continue;
            }
            let world = frame.world_at(x, y);
            let dot = plane.signed_dot(world);
            let value = if dot > 0.0 {
                0
            } else {
                match encoding {
                    MaskEncoding::Binary => 255,
                    MaskEncoding::LocalDepth => {
                        let depth = dot.abs() / plane.normal_norm;
                        remap(depth, 0.0, half_range, 0.0, 255.0).clamp(0.0, 255.0) as u8
                    }
                }
            };
            mask.set(x, y, value);
        }
    }
}
