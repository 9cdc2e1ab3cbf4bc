//! Server-Sent Events wire handling.
//!
//! # Data Flow
//! ```text
//! upstream body chunks
//!     → decoder.rs (buffer bytes, split on blank line, parse fields)
//!     → Frame (data + optional event/id)
//!
//! Frame
//!     → encoder.rs (render back to text/event-stream)
//! ```
//!
//! # Design Decisions
//! - Decoder buffers raw bytes; UTF-8 decoding happens per complete segment
//! - Only the first `data:` line of a segment is kept
//! - No I/O in this module; callers own the transport

pub mod decoder;
pub mod encoder;

pub use decoder::{Frame, FrameDecoder, FrameTooLarge, Frames};
pub use encoder::encode_frame;
