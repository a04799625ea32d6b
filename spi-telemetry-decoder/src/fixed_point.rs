//! Fixed-point decoding engine
//!
//! Converts a channel's raw words into physical values. Every word is decoded
//! on its own from the fixed channel configuration:
//!
//! 1. strip the tag character, leaving a 12-bit hex magnitude `V`
//! 2. `V << 4` restores the register alignment lost with the tag
//! 3. `<< shift` widens 32-bit encodings
//! 4. `- offset` removes the encoding bias
//! 5. `>> scalefactor` (arithmetic, sign preserving) gives the integer code
//! 6. `code * int_scale_factor` gives the physical value

use crate::config::ChannelConfig;
use crate::types::{Channel, DecodedChannel, DecodedSample, Word, WordError};

/// Fixed-point decoder - stateless, driven by a [`ChannelConfig`]
pub struct FixedPointDecoder;

impl FixedPointDecoder {
    /// Decode one word into its integer code and physical value
    ///
    /// # Arguments
    /// * `channel` - Channel the word belongs to (for error context)
    /// * `index` - Position of the word within the channel
    /// * `word` - Captured word, tag included
    /// * `config` - Channel decode parameters
    pub fn decode_word(
        channel: Channel,
        index: usize,
        word: &Word,
        config: &ChannelConfig,
    ) -> Result<DecodedSample, WordError> {
        let code = Self::integer_code(word, config).ok_or_else(|| WordError {
            channel,
            index,
            word: word.to_string(),
        })?;

        Ok(DecodedSample {
            index,
            word: word.clone(),
            code,
            value: code as f64 * config.int_scale_factor,
        })
    }

    /// Decode every word of a channel
    ///
    /// A malformed word is recorded in `errors` and decoding carries on with
    /// the next one.
    pub fn decode_channel(channel: Channel, words: &[Word], config: &ChannelConfig) -> DecodedChannel {
        let mut samples = Vec::with_capacity(words.len());
        let mut errors = Vec::new();

        for (index, word) in words.iter().enumerate() {
            match Self::decode_word(channel, index, word, config) {
                Ok(sample) => {
                    log::trace!("{} #{}: {} -> {}", channel, index, word, sample.value);
                    samples.push(sample);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    errors.push(e);
                }
            }
        }

        DecodedChannel {
            channel,
            label: config.label.clone(),
            unit: config.unit.clone(),
            samples,
            errors,
        }
    }

    /// Integer code of a word (steps 1-5), `None` if the residual is not hex
    pub fn integer_code(word: &Word, config: &ChannelConfig) -> Option<i64> {
        let descriptor = config.type_descriptor;
        let magnitude = i64::from(parse_hex(word.residual())?);

        let aligned = magnitude << 4;
        let widened = aligned << descriptor.shift();
        let unbiased = widened - descriptor.offset();

        Some(arithmetic_shr(unbiased, config.scalefactor))
    }
}

/// Parse a string made only of ASCII hex digits
///
/// No sign, prefix or whitespace is accepted.
pub fn parse_hex(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 8 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}

/// Floor shift on a signed value; shifts past the width saturate to the sign
fn arithmetic_shr(value: i64, bits: u32) -> i64 {
    value
        .checked_shr(bits)
        .unwrap_or(if value < 0 { -1 } else { 0 })
}
