//! Capture file reader and writer
//!
//! A capture file records analyzer transactions so that a session can be
//! decoded again later. All integers are little endian.
//!
//! ## Layout
//! - Header: magic `SPIC`, `u16` version (1), `i64` capture start in Unix
//!   nanoseconds
//! - Records, until end of file: `u64` timestamp (ns since capture start),
//!   `u32` status flags, `u32` byte count `n`, `n` MOSI bytes, `n` MISO bytes

use crate::capture::{CaptureSource, StatusFlags, Transaction};
use crate::types::{DecoderError, Result, Timestamp};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::DateTime;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"SPIC";
const VERSION: u16 = 1;

/// Upper bound on the byte count of a single record
pub const MAX_RECORD_BYTES: usize = 64 * 1024;

/// Replays transactions from a capture file
pub struct CaptureFileReader<R: BufRead> {
    reader: R,
    started_at_ns: i64,
    next_index: usize,
}

impl CaptureFileReader<BufReader<File>> {
    /// Open a capture file and validate its header
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Opening capture file: {:?}", path);

        if !path.exists() {
            return Err(DecoderError::Capture(format!(
                "Capture file not found: {:?}",
                path
            )));
        }

        let file = File::open(path).map_err(|e| {
            DecoderError::Capture(format!("Failed to open capture file: {}", e))
        })?;

        Self::from_reader(BufReader::new(file))
    }
}

impl<R: BufRead> CaptureFileReader<R> {
    /// Read the header from any buffered reader
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| truncated_or_io(e, "header"))?;
        if &magic != MAGIC {
            return Err(DecoderError::Capture(
                "Invalid capture file format (bad magic)".to_string(),
            ));
        }

        let version = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| truncated_or_io(e, "header"))?;
        if version != VERSION {
            return Err(DecoderError::Capture(format!(
                "Unsupported capture file version {}",
                version
            )));
        }

        let started_at_ns = reader
            .read_i64::<LittleEndian>()
            .map_err(|e| truncated_or_io(e, "header"))?;

        log::debug!("Capture file v{} started at {} ns", version, started_at_ns);

        Ok(Self {
            reader,
            started_at_ns,
            next_index: 0,
        })
    }

    /// Wall-clock start of the recorded capture
    pub fn started_at(&self) -> Timestamp {
        DateTime::from_timestamp_nanos(self.started_at_ns)
    }

    fn at_end(&mut self) -> Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }

    fn read_record(&mut self, max_bytes: usize) -> std::io::Result<Transaction> {
        let timestamp_ns = self.reader.read_u64::<LittleEndian>()?;
        let mut status = StatusFlags(self.reader.read_u32::<LittleEndian>()?);
        let count = self.reader.read_u32::<LittleEndian>()? as usize;

        if count > MAX_RECORD_BYTES {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("record of {} bytes exceeds {}", count, MAX_RECORD_BYTES),
            ));
        }

        let mut mosi = vec![0u8; count];
        self.reader.read_exact(&mut mosi)?;
        let mut miso = vec![0u8; count];
        self.reader.read_exact(&mut miso)?;

        if count > max_bytes {
            mosi.truncate(max_bytes);
            miso.truncate(max_bytes);
            status.insert(StatusFlags::SHORT_BUFFER);
        }

        Ok(Transaction {
            index: self.next_index,
            timestamp_ns,
            status,
            mosi,
            miso,
        })
    }
}

impl<R: BufRead> CaptureSource for CaptureFileReader<R> {
    fn read_transaction(&mut self, max_bytes: usize) -> Result<Option<Transaction>> {
        if self.at_end()? {
            return Ok(None);
        }

        let transaction = self.read_record(max_bytes).map_err(|e| {
            DecoderError::Capture(format!("Transaction {}: {}", self.next_index, describe(&e)))
        })?;
        self.next_index += 1;

        log::trace!(
            "Transaction {}: {} bytes, status {}",
            transaction.index,
            transaction.byte_count(),
            transaction.status
        );
        Ok(Some(transaction))
    }
}

/// Records transactions into a capture file
pub struct CaptureFileWriter<W: Write> {
    writer: W,
}

impl CaptureFileWriter<BufWriter<File>> {
    /// Create (or truncate) a capture file
    pub fn create(path: &Path, started_at: Timestamp) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), started_at)
    }
}

impl<W: Write> CaptureFileWriter<W> {
    /// Write the header and return a writer ready for records
    pub fn new(mut writer: W, started_at: Timestamp) -> Result<Self> {
        let started_at_ns = started_at.timestamp_nanos_opt().ok_or_else(|| {
            DecoderError::Capture(format!("Capture start {} out of range", started_at))
        })?;

        writer.write_all(MAGIC)?;
        writer.write_u16::<LittleEndian>(VERSION)?;
        writer.write_i64::<LittleEndian>(started_at_ns)?;
        Ok(Self { writer })
    }

    /// Append one transaction record
    pub fn write_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let count = transaction.mosi.len();
        if transaction.miso.len() != count {
            return Err(DecoderError::Capture(format!(
                "Transaction {}: {} MOSI bytes but {} MISO bytes",
                transaction.index,
                count,
                transaction.miso.len()
            )));
        }
        if count > MAX_RECORD_BYTES {
            return Err(DecoderError::Capture(format!(
                "Transaction {}: {} bytes exceeds {}",
                transaction.index, count, MAX_RECORD_BYTES
            )));
        }

        self.writer.write_u64::<LittleEndian>(transaction.timestamp_ns)?;
        self.writer.write_u32::<LittleEndian>(transaction.status.bits())?;
        self.writer.write_u32::<LittleEndian>(count as u32)?;
        self.writer.write_all(&transaction.mosi)?;
        self.writer.write_all(&transaction.miso)?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn truncated_or_io(e: std::io::Error, what: &str) -> DecoderError {
    if e.kind() == ErrorKind::UnexpectedEof {
        DecoderError::Capture(format!("Truncated capture file {}", what))
    } else {
        DecoderError::IoError(e)
    }
}

fn describe(e: &std::io::Error) -> String {
    match e.kind() {
        ErrorKind::UnexpectedEof => "truncated record".to_string(),
        _ => e.to_string(),
    }
}
