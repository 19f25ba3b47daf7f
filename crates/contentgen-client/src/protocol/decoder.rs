use std::collections::VecDeque;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::errors::TransportError;
use crate::transport::ByteStream;

use super::event::{ProtocolEvent, decode_frame};
use super::scanner::FrameScanner;

/// Frame scanner plus the terminal latch.
///
/// Once an `End` or `Error` has been produced, every later byte is ignored.
#[derive(Debug, Default)]
pub struct ProtocolDecoder {
    scanner: FrameScanner,
    terminated: bool,
}

impl ProtocolDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network read and returns the events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProtocolEvent> {
        if self.terminated {
            return Vec::new();
        }
        let mut events = Vec::new();
        for frame in self.scanner.push(chunk) {
            let Some(event) = decode_frame(&frame) else {
                continue;
            };
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                self.terminated = true;
                self.scanner.finish();
                break;
            }
        }
        events
    }

    /// True once a terminal event has been produced.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Ends the input. Returns how many trailing bytes were discarded.
    pub fn finish(&mut self) -> usize {
        self.scanner.finish()
    }
}

/// Lazily decodes a byte stream into protocol events.
///
/// Reads the next chunk only when no decoded event is pending, and stops
/// reading after the first terminal event. Read failures end the stream
/// with the transport error.
pub fn protocol_events(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<ProtocolEvent, TransportError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: ProtocolDecoder,
        pending: VecDeque<ProtocolEvent>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: ProtocolDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done || state.decoder.is_terminated() {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push(&chunk));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        let dropped = state.decoder.finish();
                        if dropped > 0 {
                            debug!(
                                event = "protocol.trailing_frame_dropped",
                                domain = "protocol",
                                dropped_bytes = dropped as u64
                            );
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}
