//! Incremental `text/event-stream` decoder.
//!
//! # Responsibilities
//! - Accumulate raw upstream bytes across reads
//! - Split complete segments on the blank-line delimiter
//! - Extract the `data:` payload (plus `event:` and `id:`) from each segment
//!
//! # Design Decisions
//! - The buffer only ever holds the unterminated tail
//! - `feed` is lazy: frames are removed from the buffer as they are yielded
//! - Segments without a non-empty `data:` line (comments, keep-alives) are dropped

use thiserror::Error;

/// Blank line separating two events on the wire.
const DELIMITER: &[u8] = b"\n\n";

/// Default cap on the unterminated tail.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Value of the `event:` field, if present.
    pub event: Option<String>,
    /// Value of the `id:` field, if present.
    pub id: Option<String>,
    /// Payload of the first non-empty `data:` line.
    pub data: String,
}

impl Frame {
    /// Frame carrying only a payload.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            id: None,
            data: data.into(),
        }
    }

    /// Set the event name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the event id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The unterminated tail grew past the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unterminated event of {buffered} bytes exceeds limit of {limit} bytes")]
pub struct FrameTooLarge {
    pub buffered: usize,
    pub limit: usize,
}

/// Stateful decoder, one per relay session.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Offset where the next delimiter search starts. Bytes before it are
    /// known not to contain a delimiter.
    scan_from: usize,
    max_buffer: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buf: Vec::new(),
            scan_from: 0,
            max_buffer,
        }
    }

    /// Append a chunk and return the frames it completes, in delimiter order.
    ///
    /// The returned iterator is lazy. Frames not pulled before it is dropped
    /// stay buffered and come out of the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.buf.extend_from_slice(bytes);
        Frames { decoder: self }
    }

    /// Number of bytes held that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Fails when the tail has grown past the limit.
    pub fn check_capacity(&self) -> Result<(), FrameTooLarge> {
        if self.buf.len() > self.max_buffer {
            return Err(FrameTooLarge {
                buffered: self.buf.len(),
                limit: self.max_buffer,
            });
        }
        Ok(())
    }

    /// Discard any buffered tail.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scan_from = 0;
    }

    /// Remove the next complete segment (without its delimiter) from the buffer.
    fn take_segment(&mut self) -> Option<Vec<u8>> {
        let start = self.scan_from;
        match find_delimiter(&self.buf[start..]) {
            Some(offset) => {
                let end = start + offset;
                let mut segment: Vec<u8> = self.buf.drain(..end + DELIMITER.len()).collect();
                segment.truncate(end);
                self.scan_from = 0;
                Some(segment)
            }
            None => {
                // A delimiter may straddle the next chunk boundary.
                self.scan_from = self.buf.len().saturating_sub(DELIMITER.len() - 1);
                None
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of frames produced by one [`FrameDecoder::feed`] call.
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        while let Some(segment) = self.decoder.take_segment() {
            if let Some(frame) = parse_segment(&segment) {
                return Some(frame);
            }
        }
        None
    }
}

fn find_delimiter(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}

fn parse_segment(segment: &[u8]) -> Option<Frame> {
    let text = String::from_utf8_lossy(segment);
    let mut data = None;
    let mut event = None;
    let mut id = None;

    for line in text.split(|c| c == '\n' || c == '\r') {
        if let Some(value) = field_value(line, "data") {
            // An empty payload does not count; a later data line may still match.
            if data.is_none() && !value.is_empty() {
                data = Some(value.to_owned());
            }
            continue;
        }
        if event.is_none() {
            if let Some(value) = field_value(line, "event") {
                event = Some(value.to_owned());
                continue;
            }
        }
        if id.is_none() {
            if let Some(value) = field_value(line, "id") {
                id = Some(value.to_owned());
            }
        }
    }

    data.map(|data| Frame { event, id, data })
}

/// `name:value` or `name: value`. Only one leading space is stripped.
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let value = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
