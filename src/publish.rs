//! Outbound cursor messages.

use log::{info, warn};
use rosc::{OscMessage, OscPacket, OscType, encoder};
use std::net::UdpSocket;

use crate::error::Result;
use crate::pipeline::Cursor;

pub const DEFAULT_ADDRESS: &str = "/blobs";

pub trait CursorSink {
    /// Publish one frame's cursors. An empty slice is still a message.
    fn publish(&mut self, cursors: &[Cursor]) -> Result<()>;
}

/// `/blobs x0 y0 x1 y1 …` with one float argument per coordinate.
pub fn blobs_message(address: &str, cursors: &[Cursor]) -> OscMessage {
    OscMessage {
        addr: address.to_string(),
        args: cursors
            .iter()
            .flat_map(|c| [OscType::Float(c.x), OscType::Float(c.y)])
            .collect(),
    }
}

pub fn encode_blobs(address: &str, cursors: &[Cursor]) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(blobs_message(address, cursors));
    Ok(encoder::encode(&packet)?)
}

/// Sends cursor messages as OSC over UDP.
pub struct OscSink {
    socket: UdpSocket,
    target: String,
    address: String,
}

impl OscSink {
    pub fn new(target: &str, address: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        info!("osc: sending {address} to {target}");
        Ok(Self {
            socket,
            target: target.to_string(),
            address: address.to_string(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl CursorSink for OscSink {
    fn publish(&mut self, cursors: &[Cursor]) -> Result<()> {
        let data = encode_blobs(&self.address, cursors)?;
        if let Err(e) = self.socket.send_to(&data, &self.target) {
            warn!("osc: send to {} failed: {e}", self.target);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Keeps every published frame in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<Vec<Cursor>>,
}

impl CursorSink for RecordingSink {
    fn publish(&mut self, cursors: &[Cursor]) -> Result<()> {
        self.frames.push(cursors.to_vec());
        Ok(())
    }
}
