//! Render frames back into `text/event-stream` text.

use crate::sse::decoder::Frame;

/// Encode a frame as one wire event, blank-line terminated.
///
/// Payload lines are emitted as consecutive `data:` lines.
pub fn encode_frame(frame: &Frame) -> String {
    let mut out = String::new();
    if let Some(id) = &frame.id {
        out.push_str("id: ");
        out.push_str(id);
        out.push('\n');
    }
    if let Some(event) = &frame.event {
        out.push_str("event: ");
        out.push_str(event);
        out.push('\n');
    }
    for line in frame.data.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}
