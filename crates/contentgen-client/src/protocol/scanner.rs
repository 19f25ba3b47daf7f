use bytes::{Buf as _, BytesMut};

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One blank-line terminated frame, before its payload is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Last `event:` value in the frame, or `"message"`.
    pub event: String,
    /// Trimmed `data:` contents, concatenated in order without a separator.
    pub data: String,
}

impl RawFrame {
    /// Parses the lines of one complete frame. Unknown lines are ignored.
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut event: Option<String> = None;
        let mut data = String::new();
        for raw_line in text.split('\n') {
            let line = raw_line.trim_end_matches('\r');
            if let Some(rest) = line.strip_prefix("event:") {
                event = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data.push_str(rest.trim());
            }
        }
        Self {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
        }
    }
}

/// Incremental frame scanner with residual state between pushes.
///
/// Bytes are kept undecoded until a whole frame is available, so a UTF-8
/// sequence split across two reads is reassembled before decoding. Complete
/// frames are split off the front of the buffer; the scan resumes from
/// `scanned` instead of the start on the next push.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buf: BytesMut,
    scanned: usize,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((end, delim_len)) = find_separator(&self.buf, self.scanned) {
            let frame = self.buf.split_to(end);
            self.buf.advance(delim_len);
            self.scanned = 0;
            frames.push(RawFrame::parse(&frame));
        }
        // A separator may straddle the next chunk boundary (at most 3 bytes
        // of `\r\n\r\n` already buffered).
        self.scanned = self.buf.len().saturating_sub(3);
        frames
    }

    /// Number of buffered bytes not yet part of a complete frame.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drops any incomplete trailing frame and returns its size in bytes.
    ///
    /// A partial frame is never promoted to a complete one.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf.clear();
        self.scanned = 0;
        dropped
    }
}

fn find_separator(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_split_across_pushes_is_emitted_once() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(b"event:chunk\ndata:{\"te").is_empty());
        let frames = scanner.push(b"xt\":\"x\"}\n\n");
        assert_eq!(
            frames,
            vec![RawFrame {
                event: "chunk".into(),
                data: "{\"text\":\"x\"}".into(),
            }]
        );
        assert_eq!(scanner.pending_len(), 0);
    }

    #[test]
    fn separator_split_between_pushes_is_found() {
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(b"data: {}\r\n\r").is_empty());
        let frames = scanner.push(b"\nevent: end\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, DEFAULT_EVENT_NAME);
        assert_eq!(frames[0].data, "{}");
        assert_eq!(scanner.pending_len(), "event: end\n".len());

        let mut scanner = FrameScanner::new();
        assert!(scanner.push(b"data: 1\n").is_empty());
        assert_eq!(scanner.push(b"\n").len(), 1);
    }

    #[test]
    fn several_frames_in_one_push_keep_order_and_remainder() {
        let mut scanner = FrameScanner::new();
        let frames = scanner.push(b"event:a\ndata:1\n\nevent:b\ndata:2\n\nevent:c\nda");
        let names: Vec<_> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(scanner.finish(), "event:c\nda".len());
        assert_eq!(scanner.pending_len(), 0);
    }

    #[test]
    fn last_event_line_wins_and_data_lines_concatenate() {
        let frame = RawFrame::parse(b"event: one\nid: 7\ndata: {\"text\":\ndata:  \"hi\"}\nevent: chunk");
        assert_eq!(frame.event, "chunk");
        assert_eq!(frame.data, "{\"text\":\"hi\"}");
    }

    #[test]
    fn utf8_split_inside_a_character_is_reassembled() {
        let payload = "data:{\"text\":\"ñ\"}\n\n".as_bytes();
        let cut = payload.iter().position(|b| *b == 0xC3).expect("lead byte") + 1;
        let mut scanner = FrameScanner::new();
        assert!(scanner.push(&payload[..cut]).is_empty());
        let frames = scanner.push(&payload[cut..]);
        assert_eq!(frames[0].data, "{\"text\":\"ñ\"}");
    }
}
