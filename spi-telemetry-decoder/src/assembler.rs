//! Byte stream assembly
//!
//! Pairs the captured MOSI bytes into 16-bit hex words.

use crate::types::Word;

/// Turns raw captured bytes into tagged words
pub struct ByteStreamAssembler;

impl ByteStreamAssembler {
    /// Render each byte as a 2-character lowercase hex token
    pub fn tokens(bytes: &[u8]) -> Vec<String> {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Concatenate disjoint token pairs (0,1), (2,3), ... into words
    ///
    /// Yields `bytes.len() / 2` words; an unpaired final byte is discarded.
    pub fn assemble(bytes: &[u8]) -> Vec<Word> {
        if bytes.len() % 2 != 0 {
            log::debug!(
                "Odd byte count ({}), discarding trailing byte 0x{:02x}",
                bytes.len(),
                bytes[bytes.len() - 1]
            );
        }

        let tokens = Self::tokens(bytes);
        tokens
            .chunks_exact(2)
            .map(|pair| Word::from_tokens(&pair[0], &pair[1]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.as_str()).collect()
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            ByteStreamAssembler::tokens(&[0x30, 0x01, 0xAB, 0x0F]),
            vec!["30", "01", "ab", "0f"]
        );
    }

    #[test]
    fn test_assemble_pairs() {
        let words = ByteStreamAssembler::assemble(&[0x30, 0x01, 0x70, 0x02]);
        assert_eq!(texts(&words), vec!["3001", "7002"]);
    }

    #[test]
    fn test_assemble_odd_length_drops_last_byte() {
        let words = ByteStreamAssembler::assemble(&[0x30, 0x01, 0x70, 0x02, 0xE5]);
        assert_eq!(texts(&words), vec!["3001", "7002"]);
    }

    #[test]
    fn test_assemble_counts() {
        for n in 0..9usize {
            let bytes: Vec<u8> = (0..n as u8).collect();
            assert_eq!(ByteStreamAssembler::assemble(&bytes).len(), n / 2);
        }
    }

    #[test]
    fn test_words_are_four_chars() {
        let words = ByteStreamAssembler::assemble(&[0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(texts(&words), vec!["0000", "ffff"]);
        assert!(words.iter().all(|w| w.as_str().len() == Word::LEN));
    }
}
