//! Recorded capture formats
//!
//! Readers here implement [`CaptureSource`](crate::capture::CaptureSource) so
//! a recorded session can be replayed through the same path as live capture.

pub mod capture_file;

// Re-export reader/writer types
pub use capture_file::{CaptureFileReader, CaptureFileWriter};
