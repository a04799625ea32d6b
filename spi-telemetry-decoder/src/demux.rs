//! Channel demultiplexing
//!
//! Routes words to their logical channel by the leading tag nibble.
//! Words with an unknown tag are dropped, not treated as errors.

use crate::types::{Channel, Word};

/// Words split per channel, plus the ones no channel claimed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemuxedWords {
    channels: [Vec<Word>; 4],
    /// Words whose tag matched no channel, in arrival order
    pub dropped: Vec<Word>,
}

impl DemuxedWords {
    /// Words routed to a channel, in arrival order
    pub fn words(&self, channel: Channel) -> &[Word] {
        &self.channels[channel.index()]
    }

    /// Total number of routed (non-dropped) words
    pub fn routed_count(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }
}

/// Splits the word sequence into the four channel streams
pub struct ChannelDemultiplexer;

impl ChannelDemultiplexer {
    pub fn demultiplex(words: &[Word]) -> DemuxedWords {
        let mut demuxed = DemuxedWords::default();

        for word in words {
            match Channel::from_tag(word.tag()) {
                Some(channel) => {
                    log::trace!("Word {} -> {}", word, channel);
                    demuxed.channels[channel.index()].push(word.clone());
                }
                None => {
                    log::trace!("Word {} has unknown tag '{}', dropping", word, word.tag());
                    demuxed.dropped.push(word.clone());
                }
            }
        }

        log::debug!(
            "Demultiplexed {} words: {} routed, {} dropped",
            words.len(),
            demuxed.routed_count(),
            demuxed.dropped.len()
        );

        demuxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(texts: &[&str]) -> Vec<Word> {
        texts.iter().map(|t| Word::new(t).unwrap()).collect()
    }

    #[test]
    fn test_partitioning() {
        let demuxed = ChannelDemultiplexer::demultiplex(&words(&["3001", "7002", "b003", "ffff"]));
        assert_eq!(demuxed.words(Channel::Channel1), words(&["3001"]).as_slice());
        assert_eq!(demuxed.words(Channel::Channel2), words(&["7002"]).as_slice());
        assert_eq!(demuxed.words(Channel::Channel3), words(&["b003"]).as_slice());
        assert!(demuxed.words(Channel::Channel4).is_empty());
        assert_eq!(demuxed.dropped, words(&["ffff"]));
    }

    #[test]
    fn test_order_preserved_per_channel() {
        let input = words(&["e001", "3001", "e002", "3002", "0abc", "e003", "3003"]);
        let demuxed = ChannelDemultiplexer::demultiplex(&input);
        assert_eq!(
            demuxed.words(Channel::Channel1),
            words(&["3001", "3002", "3003"]).as_slice()
        );
        assert_eq!(
            demuxed.words(Channel::Channel4),
            words(&["e001", "e002", "e003"]).as_slice()
        );
        assert_eq!(demuxed.dropped, words(&["0abc"]));
    }

    #[test]
    fn test_every_word_lands_once() {
        let input: Vec<Word> = (0u16..=0xff)
            .map(|v| Word::new(&format!("{:04x}", v.wrapping_mul(0x0101))).unwrap())
            .collect();
        let demuxed = ChannelDemultiplexer::demultiplex(&input);
        assert_eq!(demuxed.routed_count() + demuxed.dropped.len(), input.len());
    }

    #[test]
    fn test_tag_nibble_kept() {
        let demuxed = ChannelDemultiplexer::demultiplex(&words(&["b7ff"]));
        assert_eq!(demuxed.words(Channel::Channel3)[0].as_str(), "b7ff");
    }
}
