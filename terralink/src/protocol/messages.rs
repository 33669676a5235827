//! Terrain protocol messages.
//!
//! Field semantics follow the MAVLink terrain messages. Encoding to bytes is
//! the transport's job; sizes here are only used for outbound capacity checks.

use crate::grid::{Location, TileKey, FRAGMENT_SAMPLES};

pub const MSG_ID_TERRAIN_REQUEST: u32 = 133;
pub const MSG_ID_TERRAIN_DATA: u32 = 134;
pub const MSG_ID_TERRAIN_CHECK: u32 = 135;
pub const MSG_ID_TERRAIN_REPORT: u32 = 136;

pub const TERRAIN_REQUEST_LEN: usize = 18;
pub const TERRAIN_DATA_LEN: usize = 43;
pub const TERRAIN_CHECK_LEN: usize = 8;
pub const TERRAIN_REPORT_LEN: usize = 22;

/// Framing overhead added to every payload on the link.
pub const NON_PAYLOAD_BYTES: usize = 8;

/// Bytes a status report occupies on the link.
pub const REPORT_FRAME_LEN: usize = NON_PAYLOAD_BYTES + TERRAIN_REPORT_LEN;

/// Bytes a tile request occupies on the link.
pub const REQUEST_FRAME_LEN: usize = NON_PAYLOAD_BYTES + TERRAIN_REQUEST_LEN;

/// Vehicle asks the GCS for the fragments set in `mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub lat: i32,
    pub lon: i32,
    pub spacing: u16,
    pub mask: u64,
}

impl TileRequest {
    pub fn key(&self) -> TileKey {
        TileKey::new(self.lat, self.lon, self.spacing)
    }
}

/// One fragment of tile samples sent by the GCS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileData {
    pub lat: i32,
    pub lon: i32,
    pub spacing: u16,
    /// Fragment index, valid below 56
    pub fragment_index: u8,
    /// Heights in meters, row-major 4×4 (north rows, east columns)
    pub samples: [u16; FRAGMENT_SAMPLES],
}

impl TileData {
    pub fn key(&self) -> TileKey {
        TileKey::new(self.lat, self.lon, self.spacing)
    }
}

/// GCS asks for a status report at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusQuery {
    pub lat: i32,
    pub lon: i32,
}

impl StatusQuery {
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon)
    }
}

/// Terrain availability at a location plus cache totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub lat: i32,
    pub lon: i32,
    /// Grid spacing, or 0 when no terrain is known at the location
    pub spacing: u16,
    /// Terrain height in meters, meaningful only when `spacing != 0`
    pub elevation: f32,
    pub pending: u16,
    pub loaded: u16,
}

/// Messages arriving from the GCS.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    TileData(TileData),
    StatusQuery(StatusQuery),
    /// Any other message on the link, ignored by terrain handling
    Unknown { msg_id: u32 },
}

impl InboundMessage {
    pub fn msg_id(&self) -> u32 {
        match self {
            InboundMessage::TileData(_) => MSG_ID_TERRAIN_DATA,
            InboundMessage::StatusQuery(_) => MSG_ID_TERRAIN_CHECK,
            InboundMessage::Unknown { msg_id } => *msg_id,
        }
    }
}

/// Messages the vehicle sends to the GCS.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    TileRequest(TileRequest),
    StatusReport(StatusReport),
}

impl OutboundMessage {
    pub fn msg_id(&self) -> u32 {
        match self {
            OutboundMessage::TileRequest(_) => MSG_ID_TERRAIN_REQUEST,
            OutboundMessage::StatusReport(_) => MSG_ID_TERRAIN_REPORT,
        }
    }

    /// Bytes this message occupies on the link.
    pub fn frame_len(&self) -> usize {
        match self {
            OutboundMessage::TileRequest(_) => REQUEST_FRAME_LEN,
            OutboundMessage::StatusReport(_) => REPORT_FRAME_LEN,
        }
    }
}
