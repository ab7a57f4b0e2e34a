//! Mutable control state (tilt, distance, active zone) and the immutable
//! [`Configuration`] snapshots handed to each pipeline pass.

use log::info;
use std::sync::Arc;

use crate::blobs::AreaBand;
use crate::geometry::{Point2, Rect, map_rect};
use crate::plane::{DistanceThreshold, PlaneEquation, TiltAngle};
use crate::segment::MaskEncoding;

/// Keyboard step for the tilt angle, in degrees.
pub const ANGLE_STEP_DEG: i32 = 1;
/// Keyboard step for the distance threshold, in millimetres.
pub const DISTANCE_STEP_MM: i32 = 10;
/// Drags on the preview shorter than this (preview pixels) are ignored.
pub const MIN_DRAG_PX: f32 = 10.0;

/// Sensor frame and the on-screen preview it is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLayout {
    pub sensor: Rect,
    pub preview: Rect,
}

impl PreviewLayout {
    pub fn new(sensor_w: usize, sensor_h: usize) -> Self {
        Self {
            sensor: Rect::new(0.0, 0.0, sensor_w as f32, sensor_h as f32),
            preview: Rect::new(10.0, 320.0, 400.0, 300.0),
        }
    }

    pub fn to_preview(&self, zone: &Rect) -> Rect {
        map_rect(zone, &self.sensor, &self.preview)
    }

    pub fn to_sensor(&self, preview_rect: &Rect) -> Rect {
        map_rect(preview_rect, &self.preview, &self.sensor)
    }
}

/// Everything a single frame pass reads. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub angle: TiltAngle,
    pub distance: DistanceThreshold,
    pub plane: PlaneEquation,
    /// Region of sensor pixel space mapped onto `[-1, 1]²`.
    pub active_zone: Rect,
    /// Active zone as drawn on the preview.
    pub preview_zone: Rect,
    pub encoding: MaskEncoding,
    /// Explicit blob area band; `None` uses the per-frame default.
    pub area: Option<AreaBand>,
    /// Keep only this many of the largest blobs.
    pub max_blobs: Option<usize>,
}

impl Configuration {
    pub fn area_for(&self, w: usize, h: usize) -> AreaBand {
        self.area.unwrap_or_else(|| AreaBand::for_frame(w, h))
    }
}

/// Initial values for a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    pub angle: i32,
    pub distance: i32,
    pub active_zone: Rect,
    pub local_depth: bool,
    pub area: Option<AreaBand>,
    pub max_blobs: Option<usize>,
}

/// Owner of the current configuration snapshot.
///
/// Every setter clamps its input, rebuilds the derived plane or preview
/// rectangle and swaps in a fresh `Arc<Configuration>`; passes already
/// holding the previous snapshot are unaffected.
#[derive(Debug, Clone)]
pub struct Controller {
    layout: PreviewLayout,
    current: Arc<Configuration>,
}

impl Controller {
    pub fn new(settings: ControlSettings, layout: PreviewLayout) -> Self {
        let angle = TiltAngle::new(settings.angle);
        let distance = DistanceThreshold::new(settings.distance);
        let active_zone = settings.active_zone.standardize();
        let current = Arc::new(Configuration {
            angle,
            distance,
            plane: PlaneEquation::recompute(angle, distance),
            active_zone,
            preview_zone: layout.to_preview(&active_zone),
            encoding: MaskEncoding::from_local_depth(settings.local_depth),
            area: settings.area,
            max_blobs: settings.max_blobs,
        });
        Self { layout, current }
    }

    /// Snapshot for the next frame pass.
    pub fn snapshot(&self) -> Arc<Configuration> {
        Arc::clone(&self.current)
    }

    pub fn layout(&self) -> &PreviewLayout {
        &self.layout
    }

    pub fn settings(&self) -> ControlSettings {
        ControlSettings {
            angle: self.current.angle.degrees(),
            distance: self.current.distance.millimeters(),
            active_zone: self.current.active_zone,
            local_depth: self.current.encoding == MaskEncoding::LocalDepth,
            area: self.current.area,
            max_blobs: self.current.max_blobs,
        }
    }

    /// Apply another set of settings, e.g. after the settings file changed.
    pub fn apply(&mut self, settings: ControlSettings) {
        self.set_angle(settings.angle);
        self.set_distance(settings.distance);
        self.set_active_zone(settings.active_zone);
        self.set_local_depth(settings.local_depth);
        self.set_area(settings.area);
        self.set_max_blobs(settings.max_blobs);
    }

    fn replace(&mut self, next: Configuration) {
        if *self.current != next {
            self.current = Arc::new(next);
        }
    }

    pub fn set_angle(&mut self, degrees: i32) -> TiltAngle {
        let angle = TiltAngle::new(degrees);
        let mut next = (*self.current).clone();
        next.angle = angle;
        next.plane = PlaneEquation::recompute(angle, next.distance);
        if angle != self.current.angle {
            info!("tilt angle: {} deg", angle.degrees());
        }
        self.replace(next);
        angle
    }

    pub fn set_distance(&mut self, millimeters: i32) -> DistanceThreshold {
        let distance = DistanceThreshold::new(millimeters);
        let mut next = (*self.current).clone();
        next.distance = distance;
        next.plane = PlaneEquation::recompute(next.angle, distance);
        if distance != self.current.distance {
            info!("distance threshold: {} mm", distance.millimeters());
        }
        self.replace(next);
        distance
    }

    pub fn nudge_angle(&mut self, steps: i32) -> TiltAngle {
        let target = self
            .current
            .angle
            .degrees()
            .saturating_add(steps.saturating_mul(ANGLE_STEP_DEG));
        self.set_angle(target)
    }

    pub fn nudge_distance(&mut self, steps: i32) -> DistanceThreshold {
        let target = self
            .current
            .distance
            .millimeters()
            .saturating_add(steps.saturating_mul(DISTANCE_STEP_MM));
        self.set_distance(target)
    }

    pub fn set_active_zone(&mut self, zone: Rect) {
        let zone = zone.standardize();
        let mut next = (*self.current).clone();
        next.active_zone = zone;
        next.preview_zone = self.layout.to_preview(&zone);
        self.replace(next);
    }

    /// Set the active zone from a drag on the preview between `from` and `to`.
    /// The end point is kept inside the preview; short drags are ignored.
    pub fn set_active_zone_from_preview(&mut self, from: Point2, to: Point2) -> bool {
        if !self.layout.preview.contains(from) {
            return false;
        }
        let to = self.layout.preview.clamp(to);
        if from.distance(to) <= MIN_DRAG_PX {
            return false;
        }
        let preview_zone = Rect::from_corners(from, to);
        let mut next = (*self.current).clone();
        next.active_zone = self.layout.to_sensor(&preview_zone);
        next.preview_zone = preview_zone;
        info!(
            "active zone: x={} y={} w={} h={}",
            next.active_zone.x, next.active_zone.y, next.active_zone.width, next.active_zone.height
        );
        self.replace(next);
        true
    }

    pub fn set_local_depth(&mut self, on: bool) {
        let mut next = (*self.current).clone();
        next.encoding = MaskEncoding::from_local_depth(on);
        self.replace(next);
    }

    pub fn set_area(&mut self, area: Option<AreaBand>) {
        let mut next = (*self.current).clone();
        next.area = area;
        self.replace(next);
    }

    pub fn set_max_blobs(&mut self, max_blobs: Option<usize>) {
        let mut next = (*self.current).clone();
        next.max_blobs = max_blobs;
        self.replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(
            ControlSettings {
                angle: 0,
                distance: 800,
                active_zone: Rect::new(0.0, 0.0, 640.0, 480.0),
                local_depth: false,
                area: None,
                max_blobs: None,
            },
            PreviewLayout::new(640, 480),
        )
    }

    #[test]
    fn setters_clamp_and_recompute_plane() {
        let mut c = controller();
        assert_eq!(c.set_angle(90).degrees(), 30);
        assert_eq!(c.set_distance(-1).millimeters(), 0);
        let cfg = c.snapshot();
        assert_eq!(cfg.plane, PlaneEquation::recompute(TiltAngle::new(30), DistanceThreshold::new(0)));
    }

    #[test]
    fn nudges_step_and_saturate() {
        let mut c = controller();
        assert_eq!(c.nudge_angle(1).degrees(), 1);
        assert_eq!(c.nudge_angle(-5).degrees(), -4);
        assert_eq!(c.nudge_angle(-100).degrees(), -30);
        assert_eq!(c.nudge_distance(1).millimeters(), 810);
        assert_eq!(c.nudge_distance(500).millimeters(), 2000);
    }

    #[test]
    fn old_snapshots_survive_changes() {
        let mut c = controller();
        let before = c.snapshot();
        c.set_distance(400);
        let after = c.snapshot();
        assert_eq!(before.distance.millimeters(), 800);
        assert_eq!(after.distance.millimeters(), 400);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn unchanged_value_keeps_snapshot() {
        let mut c = controller();
        let before = c.snapshot();
        c.set_angle(0);
        c.set_local_depth(false);
        c.set_max_blobs(None);
        assert!(Arc::ptr_eq(&before, &c.snapshot()));
    }

    #[test]
    fn active_zone_drives_preview_rect() {
        let mut c = controller();
        c.set_active_zone(Rect::new(384.0, 288.0, -320.0, -240.0));
        let cfg = c.snapshot();
        assert_eq!(cfg.active_zone, Rect::new(64.0, 48.0, 320.0, 240.0));
        assert_eq!(cfg.preview_zone, Rect::new(50.0, 350.0, 200.0, 150.0));
    }

    #[test]
    fn preview_drag_sets_active_zone() {
        let mut c = controller();
        // dragged up-left, end point beyond the preview edge
        assert!(c.set_active_zone_from_preview(Point2::new(250.0, 500.0), Point2::new(0.0, 350.0)));
        let cfg = c.snapshot();
        assert_eq!(cfg.preview_zone, Rect::new(10.0, 350.0, 240.0, 150.0));
        assert_eq!(cfg.active_zone, Rect::new(0.0, 48.0, 384.0, 240.0));

        assert!(!c.set_active_zone_from_preview(Point2::new(100.0, 400.0), Point2::new(105.0, 405.0)));
        assert!(!c.set_active_zone_from_preview(Point2::new(600.0, 10.0), Point2::new(100.0, 400.0)));
        assert_eq!(c.snapshot().active_zone, Rect::new(0.0, 48.0, 384.0, 240.0));
    }
}
