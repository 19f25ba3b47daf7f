//! Streaming wire protocol: blank-line terminated frames of `event:` and
//! `data:` lines, decoded into `ProtocolEvent`s as bytes arrive.
mod decoder;
mod event;
mod scanner;

pub use decoder::{ProtocolDecoder, protocol_events};
pub use event::{
    DEFAULT_STREAM_ERROR, EndSummary, PARSE_FAILURE_MESSAGE, ProtocolEvent, decode_frame,
};
pub use scanner::{DEFAULT_EVENT_NAME, FrameScanner, RawFrame};
