//! Depth-sensor blob tracking: segments a depth stream against a tilted
//! reference plane, extracts blobs and publishes their centroids as
//! normalised cursors.

pub mod blobs;
pub mod config;
pub mod control;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod morphology;
pub mod pipeline;
pub mod plane;
pub mod publish;
pub mod segment;
pub mod source;

pub use crate::control::{Configuration, ControlSettings, Controller, PreviewLayout};
pub use crate::error::{Error, Result};
pub use crate::frame::{DepthFrame, Intrinsics, Mask};
pub use crate::pipeline::{Cursor, CursorPipeline};
