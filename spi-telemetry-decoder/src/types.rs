//! Core types for the SPI telemetry decoder library
//!
//! This module defines the values that flow between the pipeline stages:
//! hex words, the four logical channels, decoded samples and the errors the
//! decoder can raise. Nothing here holds state across a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur during capture replay and decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error(transparent)]
    Word(#[from] WordError),

    #[error("Invalid word: {0}")]
    InvalidWord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A word whose residual text is not a hexadecimal value
///
/// Scoped to a single word: the rest of the channel still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{channel} word #{index} '{word}' does not carry a hexadecimal value")]
pub struct WordError {
    /// Channel the word was routed to
    pub channel: Channel,
    /// Position of the word within its channel
    pub index: usize,
    /// Word text as captured
    pub word: String,
}

/// A 16-bit bus word in its 4-character lowercase hex form
///
/// The leading character is the tag nibble selecting the channel; the
/// remaining three characters are the 12-bit raw magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    /// Number of characters in every word
    pub const LEN: usize = 4;

    /// Build a word from its text form
    ///
    /// The text must be exactly four characters. It is lowercased but its
    /// digits are not checked here; a non-hex residual surfaces as a
    /// [`WordError`] when the word is decoded.
    pub fn new(text: &str) -> Result<Self> {
        let len = text.chars().count();
        if len != Self::LEN {
            return Err(DecoderError::InvalidWord(format!(
                "'{}' has {} characters, expected {}",
                text,
                len,
                Self::LEN
            )));
        }
        Ok(Self(text.to_lowercase()))
    }

    /// Concatenate two 2-character tokens
    pub(crate) fn from_tokens(high: &str, low: &str) -> Self {
        let mut text = String::with_capacity(Self::LEN);
        text.push_str(high);
        text.push_str(low);
        Self(text)
    }

    /// Leading (tag) character
    pub fn tag(&self) -> char {
        // Construction guarantees four characters
        self.0.chars().next().unwrap_or_default()
    }

    /// Text after the tag character
    pub fn residual(&self) -> &str {
        let tag_len = self.tag().len_utf8();
        &self.0[tag_len..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Word {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        Word::new(s)
    }
}

/// One of the four logical telemetry streams multiplexed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Channel1,
    Channel2,
    Channel3,
    Channel4,
}

impl Channel {
    /// All channels in routing order
    pub const ALL: [Channel; 4] = [
        Channel::Channel1,
        Channel::Channel2,
        Channel::Channel3,
        Channel::Channel4,
    ];

    /// Look up the channel owning a tag character
    ///
    /// Returns `None` for any tag outside {3, 7, b, e}.
    pub fn from_tag(tag: char) -> Option<Channel> {
        match tag {
            '3' => Some(Channel::Channel1),
            '7' => Some(Channel::Channel2),
            'b' => Some(Channel::Channel3),
            'e' => Some(Channel::Channel4),
            _ => None,
        }
    }

    /// Tag character carried by words of this channel
    pub fn tag(self) -> char {
        match self {
            Channel::Channel1 => '3',
            Channel::Channel2 => '7',
            Channel::Channel3 => 'b',
            Channel::Channel4 => 'e',
        }
    }

    /// Zero-based position in [`Channel::ALL`]
    pub fn index(self) -> usize {
        match self {
            Channel::Channel1 => 0,
            Channel::Channel2 => 1,
            Channel::Channel3 => 2,
            Channel::Channel4 => 3,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel{}", self.index() + 1)
    }
}

/// A single decoded word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSample {
    /// Position of the word within its channel
    pub index: usize,
    /// Word as captured (tag included)
    pub word: Word,
    /// Integer physical code after offset removal and scalefactor shift
    pub code: i64,
    /// Physical value (code multiplied by the channel's float scale)
    pub value: f64,
}

/// All samples decoded for one channel in a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedChannel {
    pub channel: Channel,
    /// Display label from the channel configuration (if any)
    pub label: Option<String>,
    /// Engineering unit (e.g. "rpm", "Nm", "rad/s")
    pub unit: Option<String>,
    /// Successfully decoded words, in arrival order
    pub samples: Vec<DecodedSample>,
    /// Words that failed to decode, in arrival order
    pub errors: Vec<WordError>,
}

impl DecodedChannel {
    /// Physical values in arrival order
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Number of words routed to this channel
    pub fn word_count(&self) -> usize {
        self.samples.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_count() == 0
    }
}
