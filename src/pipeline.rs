//! Per-frame orchestration: segment, clean, extract, normalise.

use log::{debug, trace};
use serde::Serialize;

use crate::blobs::{Blob, BlobExtractor, keep_largest};
use crate::control::Configuration;
use crate::frame::{DepthFrame, Mask};
use crate::geometry::{Point2, Rect, map_point};
use crate::morphology::MorphologyWorkspace;
use crate::segment::segment_into;

/// Output range of both cursor axes.
pub const NORMALIZED: Rect = Rect::new(-1.0, -1.0, 2.0, 2.0);

/// Blob centroid normalised to the active zone, each axis in `[-1, 1]`.
/// The y axis keeps the sensor's downward orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

impl Cursor {
    pub fn from_centroid(centroid: Point2, zone: &Rect) -> Self {
        let p = map_point(centroid, zone, &NORMALIZED);
        Self { x: p.x, y: p.y }
    }
}

/// Pipeline state reused across frames. Only scratch buffers and the last
/// results live here; nothing about a blob carries over to the next frame.
#[derive(Debug)]
pub struct CursorPipeline {
    mask: Mask,
    morphology: MorphologyWorkspace,
    extractor: BlobExtractor,
    blobs: Vec<Blob>,
    cursors: Vec<Cursor>,
    frames: u64,
}

impl Default for CursorPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorPipeline {
    pub fn new() -> Self {
        Self {
            mask: Mask::new(0, 0),
            morphology: MorphologyWorkspace::new(),
            extractor: BlobExtractor::new(),
            blobs: Vec::new(),
            cursors: Vec::new(),
            frames: 0,
        }
    }

    /// Run one pass. Without a new frame the previous cursors are returned
    /// unchanged.
    pub fn process(&mut self, frame: Option<&DepthFrame>, config: &Configuration) -> &[Cursor] {
        if let Some(frame) = frame {
            self.run(frame, config);
        }
        &self.cursors
    }

    fn run(&mut self, frame: &DepthFrame, config: &Configuration) {
        let (w, h) = (frame.width(), frame.height());
        if (self.mask.w, self.mask.h) != (w, h) {
            self.mask = Mask::new(w, h);
        } else {
            self.mask.clear();
        }

        segment_into(
            frame,
            &config.plane,
            config.encoding,
            config.distance,
            &mut self.mask,
        );
        trace!("segmented {} foreground pixels", self.mask.count_nonzero());
        self.morphology.clean(&mut self.mask);

        let band = config.area_for(w, h);
        self.blobs = self.extractor.extract(&self.mask, band);
        if let Some(n) = config.max_blobs {
            keep_largest(&mut self.blobs, n);
        }
        self.cursors = self
            .blobs
            .iter()
            .map(|b| Cursor::from_centroid(b.centroid, &config.active_zone))
            .collect();

        self.frames += 1;
        debug!("frame {}: {} blob(s)", self.frames, self.blobs.len());
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// Cleaned mask of the last processed frame.
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }
}
