//! SPI Telemetry Decoder Library
//!
//! A stateless, reusable library for decoding the multiplexed telemetry stream
//! a motor controller writes on its SPI master-out line.
//!
//! # Architecture
//!
//! Captured bytes flow through three stages, each consuming the previous
//! stage's output in full:
//! - [`ByteStreamAssembler`] pairs bytes into 4-character hex words
//! - [`ChannelDemultiplexer`] routes words to four channels by tag nibble
//! - [`FixedPointDecoder`] turns each channel's words into physical values
//!
//! [`Decoder`] runs the stages over one owned [`CaptureBuffer`]. Transactions
//! reach the buffer through the [`CaptureSource`] trait; a recorded capture
//! file can be replayed with [`CaptureFileReader`].
//!
//! The library does NOT:
//! - Discover or configure analyzer hardware
//! - Print transaction dumps or reports
//!
//! All of that lives in the application layer (spi-telemetry-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use spi_telemetry_decoder::{capture, CaptureFileReader, Channel, Decoder, DecoderConfig};
//! use std::path::Path;
//!
//! let mut source = CaptureFileReader::open(Path::new("session.spic")).unwrap();
//! let run = capture(&mut source, 2, 0, |_| {});
//! if let Some(e) = &run.error {
//!     eprintln!("Capture cut short: {}", e);
//! }
//!
//! let decoder = Decoder::new(DecoderConfig::default()).unwrap();
//! let report = decoder.decode_buffer(&run.buffer);
//!
//! for sample in &report.channel(Channel::Channel1).samples {
//!     println!("{} -> {}", sample.word, sample.value);
//! }
//! for error in report.errors() {
//!     eprintln!("Decode error: {}", error);
//! }
//! ```

// Public modules
pub mod assembler;
pub mod capture;
pub mod config;
pub mod decoder;
pub mod demux;
pub mod fixed_point;
pub mod formats;
pub mod types;

// Re-export main types for convenience
pub use assembler::ByteStreamAssembler;
pub use capture::{capture, CaptureBuffer, CaptureRun, CaptureSource, StatusFlags, Transaction};
pub use config::{scale, ChannelConfig, DecoderConfig, TypeDescriptor};
pub use decoder::{DecodeReport, DecodeStats, Decoder};
pub use demux::{ChannelDemultiplexer, DemuxedWords};
pub use fixed_point::FixedPointDecoder;
pub use formats::{CaptureFileReader, CaptureFileWriter};
pub use types::{
    Channel, DecodedChannel, DecodedSample, DecoderError, Result, Timestamp, Word, WordError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: the standard profile builds a decoder
        let decoder = Decoder::new(DecoderConfig::default()).unwrap();
        let report = decoder.decode_bytes(&[]);
        assert!(report.words.is_empty());
        assert_eq!(report.channels.len(), 4);
    }
}
