//! Capture seam and the run-scoped byte buffer
//!
//! The protocol analyzer driver is reached only through [`CaptureSource`].
//! Each transaction it yields contributes its MOSI bytes, in arrival order,
//! to one [`CaptureBuffer`] owned by the caller.

use crate::types::{DecoderError, Result, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Read status bits reported by the analyzer for each transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    pub const OK: StatusFlags = StatusFlags(0x000);
    pub const TIMEOUT: StatusFlags = StatusFlags(0x100);
    pub const MIDDLE_OF_PACKET: StatusFlags = StatusFlags(0x200);
    pub const SHORT_BUFFER: StatusFlags = StatusFlags(0x400);
    pub const PARTIAL_LAST_BYTE: StatusFlags = StatusFlags(0x800);

    /// Low byte carries the bit index of a partial last byte
    const PARTIAL_BIT_MASK: u32 = 0xff;

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    pub fn contains(self, flag: StatusFlags) -> bool {
        (self.0 & flag.0) == flag.0 && flag.0 != 0
    }

    pub fn insert(&mut self, flag: StatusFlags) {
        self.0 |= flag.0;
    }

    /// Bit index of the partial last byte, if flagged
    pub fn partial_bits(self) -> Option<u32> {
        self.contains(Self::PARTIAL_LAST_BYTE)
            .then_some(self.0 & Self::PARTIAL_BIT_MASK)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }

        let mut parts = Vec::new();
        if self.contains(Self::TIMEOUT) {
            parts.push("TIMEOUT".to_string());
        }
        if self.contains(Self::MIDDLE_OF_PACKET) {
            parts.push("MIDDLE".to_string());
        }
        if self.contains(Self::SHORT_BUFFER) {
            parts.push("SHORT BUFFER".to_string());
        }
        if let Some(bit) = self.partial_bits() {
            parts.push(format!("PARTIAL_BYTE(bit {})", bit));
        }
        if parts.is_empty() {
            parts.push(format!("0x{:x}", self.0));
        }
        f.write_str(&parts.join(" "))
    }
}

/// One bus transaction as read from the analyzer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Sequence number within the capture
    pub index: usize,
    /// Start of packet, in nanoseconds since capture start
    pub timestamp_ns: u64,
    pub status: StatusFlags,
    /// Master-out bytes (decoded telemetry stream)
    pub mosi: Vec<u8>,
    /// Slave-out bytes (reporting only)
    pub miso: Vec<u8>,
}

impl Transaction {
    /// Number of bytes captured
    pub fn byte_count(&self) -> usize {
        self.mosi.len()
    }

    /// Absolute time of the transaction given the capture start
    ///
    /// Offsets past the representable range saturate.
    pub fn timestamp(&self, started_at: Timestamp) -> Timestamp {
        let offset_ns = i64::try_from(self.timestamp_ns).unwrap_or(i64::MAX);
        started_at
            .checked_add_signed(chrono::Duration::nanoseconds(offset_ns))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Source of transactions (hardware driver binding or recorded capture)
pub trait CaptureSource {
    /// Read the next transaction, holding at most `max_bytes` bytes
    ///
    /// Returns `Ok(None)` once the source has no more transactions.
    fn read_transaction(&mut self, max_bytes: usize) -> Result<Option<Transaction>>;
}

/// MOSI bytes of a run, in transaction arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureBuffer {
    bytes: Vec<u8>,
    transactions: usize,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the MOSI bytes of a transaction
    ///
    /// Transactions without data are skipped.
    pub fn append(&mut self, transaction: &Transaction) {
        if transaction.mosi.is_empty() {
            log::trace!("Transaction {} carries no data, skipping", transaction.index);
            return;
        }
        self.bytes.extend_from_slice(&transaction.mosi);
        self.transactions += 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of transactions that contributed bytes
    pub fn transaction_count(&self) -> usize {
        self.transactions
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for CaptureBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        let transactions = usize::from(!bytes.is_empty());
        Self { bytes, transactions }
    }
}

/// Outcome of a capture run
///
/// A read failure ends the run but keeps everything captured before it.
#[derive(Debug)]
pub struct CaptureRun {
    /// MOSI bytes of every transaction read
    pub buffer: CaptureBuffer,
    /// Transactions read, including empty ones
    pub transactions: usize,
    /// Read failure that stopped the run early, if any
    pub error: Option<DecoderError>,
}

impl CaptureRun {
    /// True if the run ended on a read failure
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

/// Read transactions from a source into a fresh buffer
///
/// # Arguments
/// * `source` - Transaction source
/// * `max_bytes` - Maximum bytes per transaction
/// * `count` - Number of transactions to read, 0 reads until the source ends
/// * `on_transaction` - Called for every transaction read (e.g. to print a dump)
pub fn capture<S, F>(
    source: &mut S,
    max_bytes: usize,
    count: usize,
    mut on_transaction: F,
) -> CaptureRun
where
    S: CaptureSource + ?Sized,
    F: FnMut(&Transaction),
{
    let mut buffer = CaptureBuffer::new();
    let mut read = 0usize;
    let mut error = None;

    while count == 0 || read < count {
        let transaction = match source.read_transaction(max_bytes) {
            Ok(Some(transaction)) => transaction,
            Ok(None) => {
                log::debug!("Capture source exhausted after {} transactions", read);
                break;
            }
            Err(e) => {
                log::error!("Capture stopped after {} transactions: {}", read, e);
                error = Some(e);
                break;
            }
        };
        read += 1;

        if !transaction.status.is_ok() {
            log::warn!(
                "Transaction {} status: {}",
                transaction.index,
                transaction.status
            );
        }

        on_transaction(&transaction);
        buffer.append(&transaction);
    }

    log::info!(
        "Captured {} bytes from {} transactions",
        buffer.len(),
        read
    );
    CaptureRun {
        buffer,
        transactions: read,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Transaction>);

    impl CaptureSource for Scripted {
        fn read_transaction(&mut self, _max_bytes: usize) -> Result<Option<Transaction>> {
            Ok(self.0.pop_front())
        }
    }

    /// Yields its transactions, then fails like a cut-off capture
    struct FailsAfter(VecDeque<Transaction>);

    impl CaptureSource for FailsAfter {
        fn read_transaction(&mut self, _max_bytes: usize) -> Result<Option<Transaction>> {
            match self.0.pop_front() {
                Some(t) => Ok(Some(t)),
                None => Err(DecoderError::Capture("truncated record".to_string())),
            }
        }
    }

    fn transaction(index: usize, mosi: &[u8]) -> Transaction {
        Transaction {
            index,
            timestamp_ns: index as u64 * 1000,
            status: StatusFlags::OK,
            mosi: mosi.to_vec(),
            miso: vec![0; mosi.len()],
        }
    }

    fn scripted() -> Scripted {
        Scripted(VecDeque::from(vec![
            transaction(0, &[0x30, 0x01]),
            transaction(1, &[]),
            transaction(2, &[0x70]),
            transaction(3, &[0x02, 0xb0, 0x03]),
        ]))
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StatusFlags::OK.to_string(), "OK");
        assert_eq!(StatusFlags::TIMEOUT.to_string(), "TIMEOUT");

        let mut status = StatusFlags::MIDDLE_OF_PACKET;
        status.insert(StatusFlags(0x800 | 5));
        assert_eq!(status.to_string(), "MIDDLE PARTIAL_BYTE(bit 5)");
        assert_eq!(status.partial_bits(), Some(5));
        assert!(!StatusFlags::OK.contains(StatusFlags::OK));
    }

    #[test]
    fn test_buffer_concatenates_in_arrival_order() {
        let mut source = scripted();
        let buffer = capture(&mut source, 16, 0, |_| {}).buffer;
        assert_eq!(buffer.as_bytes(), &[0x30, 0x01, 0x70, 0x02, 0xb0, 0x03]);
        assert_eq!(buffer.transaction_count(), 3);
    }

    #[test]
    fn test_capture_respects_count() {
        let mut source = scripted();
        let mut seen = Vec::new();
        let buffer = capture(&mut source, 16, 2, |t| seen.push(t.index)).buffer;
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(buffer.as_bytes(), &[0x30, 0x01]);
    }

    #[test]
    fn test_transaction_timestamp() {
        let start = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let t = transaction(3, &[0x30]);
        let at = t.timestamp(start);
        assert_eq!((at - start).num_microseconds(), Some(3));
    }

    #[test]
    fn test_read_failure_keeps_captured_bytes() {
        let mut source = FailsAfter(VecDeque::from(vec![
            transaction(0, &[0x30, 0x01]),
            transaction(1, &[0x70, 0x02]),
        ]));
        let mut seen = 0;
        let run = capture(&mut source, 16, 0, |_| seen += 1);

        assert_eq!(seen, 2);
        assert_eq!(run.transactions, 2);
        assert_eq!(run.buffer.as_bytes(), &[0x30, 0x01, 0x70, 0x02]);
        assert!(run.is_partial());
        assert!(matches!(run.error, Some(DecoderError::Capture(_))));
    }

    #[test]
    fn test_complete_run_has_no_error() {
        let run = capture(&mut scripted(), 16, 0, |_| {});
        assert!(!run.is_partial());
        assert_eq!(run.transactions, 4);
    }

    #[test]
    fn test_transaction_timestamp_saturates() {
        let start = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut t = transaction(0, &[0x30]);
        t.timestamp_ns = u64::MAX;
        let at = t.timestamp(start);
        assert!(at > start);
        assert_eq!((at - start).num_nanoseconds(), Some(i64::MAX));
    }
}
