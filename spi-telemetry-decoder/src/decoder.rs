//! Main decoder API
//!
//! The [`Decoder`] runs the three pipeline stages over one captured byte
//! buffer: assembly into words, demultiplexing by tag and fixed-point
//! decoding per channel. It only holds the (validated) configuration, so the
//! same instance can be run again on later snapshots of a buffer.

use crate::assembler::ByteStreamAssembler;
use crate::capture::CaptureBuffer;
use crate::config::DecoderConfig;
use crate::demux::ChannelDemultiplexer;
use crate::fixed_point::FixedPointDecoder;
use crate::types::{Channel, DecodedChannel, Result, Word, WordError};
use serde::Serialize;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder for the given channel configuration
    ///
    /// # Returns
    /// * `Err(DecoderError::InvalidConfig)` if any channel cannot be applied
    ///
    /// # Example
    /// ```
    /// use spi_telemetry_decoder::{Decoder, DecoderConfig};
    ///
    /// let decoder = Decoder::new(DecoderConfig::default()).unwrap();
    /// let report = decoder.decode_bytes(&[0xe0, 0x10, 0xe0, 0x20]);
    /// assert_eq!(report.words.len(), 2);
    /// ```
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the MOSI bytes accumulated in a capture buffer
    pub fn decode_buffer(&self, buffer: &CaptureBuffer) -> DecodeReport {
        self.decode_bytes(buffer.as_bytes())
    }

    /// Decode a raw byte sequence in one pass
    pub fn decode_bytes(&self, bytes: &[u8]) -> DecodeReport {
        log::debug!("Decoding {} captured bytes", bytes.len());

        let words = ByteStreamAssembler::assemble(bytes);
        let demuxed = ChannelDemultiplexer::demultiplex(&words);

        let channels: Vec<DecodedChannel> = Channel::ALL
            .iter()
            .map(|&channel| {
                FixedPointDecoder::decode_channel(
                    channel,
                    demuxed.words(channel),
                    self.config.channel(channel),
                )
            })
            .collect();

        let report = DecodeReport {
            byte_count: bytes.len(),
            words,
            dropped: demuxed.dropped,
            channels,
        };

        let stats = report.stats();
        log::debug!(
            "Decoded {} of {} words ({} dropped, {} errors)",
            stats.decoded,
            stats.words,
            stats.dropped,
            stats.errors
        );

        report
    }
}

/// Everything derived from one captured buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeReport {
    /// Number of raw bytes the words were assembled from
    pub byte_count: usize,
    /// All assembled words in arrival order
    pub words: Vec<Word>,
    /// Words whose tag matched no channel
    pub dropped: Vec<Word>,
    /// Decoded channels, in [`Channel::ALL`] order
    pub channels: Vec<DecodedChannel>,
}

impl DecodeReport {
    /// Decoded output of a channel
    pub fn channel(&self, channel: Channel) -> &DecodedChannel {
        &self.channels[channel.index()]
    }

    /// Word errors across all channels, channel by channel
    pub fn errors(&self) -> impl Iterator<Item = &WordError> {
        self.channels.iter().flat_map(|c| c.errors.iter())
    }

    pub fn error_count(&self) -> usize {
        self.channels.iter().map(|c| c.errors.len()).sum()
    }

    /// True if the trailing byte was left unpaired
    pub fn discarded_trailing_byte(&self) -> bool {
        self.byte_count % 2 != 0
    }

    /// Summary counts of the run
    pub fn stats(&self) -> DecodeStats {
        DecodeStats {
            bytes: self.byte_count,
            words: self.words.len(),
            dropped: self.dropped.len(),
            decoded: self.channels.iter().map(|c| c.samples.len()).sum(),
            errors: self.error_count(),
        }
    }
}

/// Summary counts of a decode run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub bytes: usize,
    pub words: usize,
    pub dropped: usize,
    pub decoded: usize,
    pub errors: usize,
}
