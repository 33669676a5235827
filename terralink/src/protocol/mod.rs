//! Vehicle ↔ GCS terrain protocol.

mod link;
mod messages;

pub use link::{BufferedLink, GcsLink};
pub use messages::{
    InboundMessage, OutboundMessage, StatusQuery, StatusReport, TileData, TileRequest,
    MSG_ID_TERRAIN_CHECK, MSG_ID_TERRAIN_DATA, MSG_ID_TERRAIN_REPORT, MSG_ID_TERRAIN_REQUEST,
    NON_PAYLOAD_BYTES, REPORT_FRAME_LEN, REQUEST_FRAME_LEN, TERRAIN_CHECK_LEN, TERRAIN_DATA_LEN,
    TERRAIN_REPORT_LEN, TERRAIN_REQUEST_LEN,
};
