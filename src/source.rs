//! Narrow view of a depth sensor: frames, tilt and connection state.

use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::error::{Error, Result};
use crate::frame::{DepthFrame, Intrinsics};

pub trait DepthSource {
    /// Next frame if one arrived since the last call.
    fn poll_frame(&mut self) -> Result<Option<DepthFrame>>;

    /// Ask the device to tilt to `degrees`. Sources without a motor ignore it.
    fn set_tilt(&mut self, degrees: i32) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn describe(&self) -> String;
}

/// Stand-in for an absent device: connected is false and no frame ever
/// arrives, so every pipeline pass is a no-op.
#[derive(Debug, Default)]
pub struct DisconnectedSource;

impl DepthSource for DisconnectedSource {
    fn poll_frame(&mut self) -> Result<Option<DepthFrame>> {
        Ok(None)
    }

    fn set_tilt(&mut self, _degrees: i32) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "disconnected".to_string()
    }
}

/// Replays a recording of raw frames: consecutive `w × h` little-endian
/// `u16` depth buffers in millimetres. Loops at the end of the file and hands
/// out frames no faster than `fps`.
#[derive(Debug)]
pub struct ReplaySource {
    path: PathBuf,
    w: usize,
    h: usize,
    intrinsics: Intrinsics,
    frames: Vec<Vec<u16>>,
    next: usize,
    interval: Duration,
    last_emit: Option<Instant>,
    tilt: i32,
}

impl ReplaySource {
    pub fn open(
        path: impl AsRef<Path>,
        w: usize,
        h: usize,
        fps: u32,
        intrinsics: Intrinsics,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let frames = split_frames(&bytes, w, h)?;
        info!(
            "replay: {} frame(s) of {w}x{h} from {}",
            frames.len(),
            path.display()
        );
        Ok(Self {
            path,
            w,
            h,
            intrinsics,
            frames,
            next: 0,
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            last_emit: None,
            tilt: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

fn split_frames(bytes: &[u8], w: usize, h: usize) -> Result<Vec<Vec<u16>>> {
    let frame_bytes = w * h * 2;
    if frame_bytes == 0 {
        return Err(Error::Source("replay frame size is zero".into()));
    }
    if bytes.is_empty() || bytes.len() % frame_bytes != 0 {
        return Err(Error::Source(format!(
            "replay length {} is not a multiple of the {w}x{h} frame size ({frame_bytes} bytes)",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(frame_bytes)
        .map(|chunk| {
            chunk
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .collect()
        })
        .collect())
}

impl DepthSource for ReplaySource {
    fn poll_frame(&mut self) -> Result<Option<DepthFrame>> {
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.interval {
                return Ok(None);
            }
        }
        self.last_emit = Some(now);

        let depth = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        DepthFrame::from_depth(self.w, self.h, depth, self.intrinsics)
            .map(Some)
            .ok_or_else(|| Error::Source("replay frame has the wrong size".into()))
    }

    fn set_tilt(&mut self, degrees: i32) -> Result<()> {
        if degrees != self.tilt {
            warn!("replay: ignoring tilt request to {degrees} deg");
        }
        self.tilt = degrees;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("replay {} ({}x{})", self.path.display(), self.w, self.h)
    }
}
