//! Tilt-corrected reference plane separating the interaction volume from the
//! background.
//!
//! The plane contains the sensor's tilt axis `(1, 0, 0)` and the reference
//! vector `(0, 1, 0)` rotated about that axis by the tilt angle, shifted
//! along z so that it crosses the optical axis at `distance / cos(θ)`.

use serde::{Deserialize, Serialize};

pub const MIN_ANGLE_DEG: i32 = -30;
pub const MAX_ANGLE_DEG: i32 = 30;
pub const MIN_DISTANCE_MM: i32 = 0;
pub const MAX_DISTANCE_MM: i32 = 2000;

/// Sensor tilt in whole degrees, always within `[-30, 30]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TiltAngle(i32);

impl TiltAngle {
    pub fn new(degrees: i32) -> Self {
        Self(degrees.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG))
    }

    pub fn degrees(self) -> i32 {
        self.0
    }

    /// Radians with the sign flipped, matching the sensor's tilt direction.
    pub fn radians(self) -> f64 {
        -f64::from(self.0).to_radians()
    }
}

/// Horizontal distance threshold in millimetres, always within `[0, 2000]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistanceThreshold(i32);

impl DistanceThreshold {
    pub fn new(millimeters: i32) -> Self {
        Self(millimeters.clamp(MIN_DISTANCE_MM, MAX_DISTANCE_MM))
    }

    pub fn millimeters(self) -> i32 {
        self.0
    }
}

/// Plane `n · p + offset = 0` with its normal length cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneEquation {
    pub normal: [f64; 3],
    pub offset: f64,
    pub normal_norm: f64,
    /// Where the plane crosses the optical axis, in millimetres.
    pub plane_distance: f64,
}

impl PlaneEquation {
    /// Derive the plane for a tilt and horizontal distance.
    ///
    /// `cos(θ)` stays above `cos(30°)` for every representable [`TiltAngle`],
    /// so the division below never approaches a singularity.
    pub fn recompute(angle: TiltAngle, distance: DistanceThreshold) -> Self {
        let theta = angle.radians();
        let (sin_t, cos_t) = theta.sin_cos();
        let plane_distance = f64::from(distance.millimeters()) / cos_t;

        let axis = [1.0, 0.0, 0.0];
        let rotated = [0.0, cos_t, sin_t];
        let normal = cross(axis, rotated);
        let offset = -normal[2] * plane_distance;
        let normal_norm = dot3(normal, normal).sqrt();

        Self {
            normal,
            offset,
            normal_norm,
            plane_distance,
        }
    }

    /// Homogeneous product `(x, y, z, 1) · (nx, ny, nz, offset)`.
    /// Positive values lie beyond the plane.
    #[inline]
    pub fn signed_dot(&self, p: [f64; 3]) -> f64 {
        dot3(self.normal, p) + self.offset
    }

    /// Perpendicular distance from `p` to the plane.
    #[inline]
    pub fn distance_to(&self, p: [f64; 3]) -> f64 {
        self.signed_dot(p).abs() / self.normal_norm
    }
}

#[inline]
fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn zero_tilt_gives_horizontal_plane() {
        let plane = PlaneEquation::recompute(TiltAngle::new(0), DistanceThreshold::new(800));
        let sign = plane.normal[2].signum();
        assert!(plane.normal[0].abs() < EPS);
        assert!(plane.normal[1].abs() < EPS);
        assert!((plane.normal[2].abs() - 1.0).abs() < EPS);
        assert!((plane.offset * sign + 800.0).abs() < EPS);
        assert!(plane.signed_dot([12.0, -40.0, 800.0]).abs() < EPS);
    }

    #[test]
    fn plane_distance_grows_with_threshold() {
        for deg in [-30, -7, 0, 12, 30] {
            let angle = TiltAngle::new(deg);
            let mut prev = f64::NEG_INFINITY;
            for mm in (0..=2000).step_by(50) {
                let d = PlaneEquation::recompute(angle, DistanceThreshold::new(mm)).plane_distance;
                assert!(d > prev, "angle {deg}: {d} not above {prev} at {mm}mm");
                prev = d;
            }
        }
    }

    #[test]
    fn tilted_plane_contains_axis_and_rotated_reference() {
        let angle = TiltAngle::new(20);
        let plane = PlaneEquation::recompute(angle, DistanceThreshold::new(1000));
        let theta = angle.radians();
        let on_axis = [0.0, 0.0, plane.plane_distance];
        let along_axis = [250.0, 0.0, plane.plane_distance];
        let along_ref = [0.0, theta.cos() * 300.0, theta.sin() * 300.0 + plane.plane_distance];
        for p in [on_axis, along_axis, along_ref] {
            assert!(plane.signed_dot(p).abs() < 1e-6, "{p:?} off plane");
        }
        assert!((plane.normal_norm - 1.0).abs() < EPS);
    }

    #[test]
    fn controls_are_clamped() {
        assert_eq!(TiltAngle::new(45).degrees(), 30);
        assert_eq!(TiltAngle::new(-90).degrees(), -30);
        assert_eq!(DistanceThreshold::new(-5).millimeters(), 0);
        assert_eq!(DistanceThreshold::new(5000).millimeters(), 2000);
    }
}
