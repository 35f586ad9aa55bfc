//! Protocol module - wire format, envelopes and segmentation.
//!
//! This module implements the header-based wire protocol:
//! - protocol, plugin and structure declaration headers
//! - metadata envelope and message kinds
//! - splitting message text into numbered, length-prefixed segments
//! - detecting a console extension from request headers

mod client;
mod envelope;
mod segment;
mod wire_format;

pub use client::{
    compare_versions, detect_client, version_from_header, version_from_user_agent,
    MIN_CLIENT_VERSION,
};
pub use envelope::{Envelope, Kind, RESERVED_OPTION_NAMES};
pub use segment::{split, Segment};
pub use wire_format::{
    segment_header_name, Structure, CONTINUATION, INDEX_HEADER, MAX_MESSAGE_INDEX, PLUGIN_HEADER,
    PLUGIN_URI, PROTOCOL_HEADER, PROTOCOL_URI, SEGMENT_BUDGET, SEPARATOR,
};
