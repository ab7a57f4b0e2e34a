use anyhow::Result;
use log::{error, info, warn};

use depthctl::config::Settings;
use depthctl::control::Configuration;
use depthctl::pipeline::{Cursor, CursorPipeline};
use depthctl::publish::{CursorSink, OscSink};
use depthctl::source::{DepthSource, DisconnectedSource, ReplaySource};

/// Source → pipeline → sink, one pass per call to [`FrameDriver::step`].
pub struct FrameDriver {
    source: Box<dyn DepthSource>,
    sink: Box<dyn CursorSink>,
    pipeline: CursorPipeline,
    osc_target: String,
    connected: bool,
    send_failures: u64,
}

impl FrameDriver {
    pub fn open(settings: &Settings) -> Result<Self> {
        let source: Box<dyn DepthSource> = match &settings.sensor.replay {
            Some(path) => match ReplaySource::open(
                path,
                settings.sensor.width,
                settings.sensor.height,
                settings.sensor.fps,
                settings.intrinsics(),
            ) {
                Ok(src) => Box::new(src),
                Err(e) => {
                    warn!("depth source unavailable: {e}");
                    Box::new(DisconnectedSource)
                }
            },
            None => {
                warn!("no depth source configured (sensor.replay); pipeline idle");
                Box::new(DisconnectedSource)
            }
        };
        let sink = OscSink::new(&settings.osc_target(), &settings.osc.address)?;
        let connected = source.is_connected();
        info!("depth source: {}", source.describe());
        Ok(Self {
            source,
            osc_target: sink.target().to_string(),
            sink: Box::new(sink),
            pipeline: CursorPipeline::new(),
            connected,
            send_failures: 0,
        })
    }

    /// Poll the source once. Returns whether a frame was processed.
    pub fn step(&mut self, config: &Configuration) -> bool {
        let connected = self.source.is_connected();
        if connected != self.connected {
            if connected {
                info!("depth source connected: {}", self.source.describe());
            } else {
                warn!("depth source disconnected");
            }
            self.connected = connected;
        }

        let frame = match self.source.poll_frame() {
            Ok(f) => f,
            Err(e) => {
                error!("depth source read failed: {e}");
                None
            }
        };
        let Some(frame) = frame else {
            return false;
        };

        let cursors = self.pipeline.process(Some(&frame), config);
        if let Err(e) = self.sink.publish(cursors) {
            self.send_failures += 1;
            if self.send_failures == 1 || self.send_failures % 100 == 0 {
                error!("publish failed ({} so far): {e}", self.send_failures);
            }
        }
        true
    }

    pub fn set_tilt(&mut self, degrees: i32) {
        if let Err(e) = self.source.set_tilt(degrees) {
            error!("tilt to {degrees} deg failed: {e}");
        }
    }

    pub fn cursors(&self) -> &[Cursor] {
        self.pipeline.cursors()
    }

    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.source.describe(),
            "connected": self.source.is_connected(),
            "frames": self.pipeline.frames_processed(),
            "blobs": self.pipeline.blobs().len(),
            "osc_target": self.osc_target,
            "publish_failures": self.send_failures,
        })
    }
}
