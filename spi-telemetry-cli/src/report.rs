//! Report generation
//!
//! Renders the transaction dump and the decode report as text or JSON.

use crate::config::OutputFormat;
use anyhow::Result;
use spi_telemetry_decoder::{DecodeReport, DecoderConfig, Timestamp, Transaction};
use std::io::Write;

/// Bytes per dump line
const DUMP_BYTES_PER_LINE: usize = 16;

/// Absolute time format used in the dump and report header
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Header line of the transaction dump
pub const DUMP_HEADER: &str = "index,time(ns),time(utc),SPI,status,mosi0/miso0 ... mosiN/misoN";

/// Write one transaction in analyzer dump form
///
/// `index,time(ns),time(utc),SPI,(status)` followed by `mosi/miso` byte
/// pairs, sixteen per indented line.
pub fn write_transaction<W: Write>(
    out: &mut W,
    transaction: &Transaction,
    started_at: Timestamp,
) -> std::io::Result<()> {
    write!(
        out,
        "{},{},{},SPI,({})",
        transaction.index,
        transaction.timestamp_ns,
        transaction.timestamp(started_at).format(TIME_FORMAT),
        transaction.status
    )?;

    for (n, (mosi, miso)) in transaction.mosi.iter().zip(&transaction.miso).enumerate() {
        if n != 0 {
            write!(out, ", ")?;
        }
        if n % DUMP_BYTES_PER_LINE == 0 {
            write!(out, "\n    ")?;
        }
        write!(out, "{:02x}/{:02x}", mosi, miso)?;
    }
    writeln!(out)
}

/// Render the decode report in the requested format
pub fn write_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    report: &DecodeReport,
    config: &DecoderConfig,
    started_at: Option<Timestamp>,
) -> Result<()> {
    match format {
        OutputFormat::Txt => write_txt(out, report, config, started_at)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_txt<W: Write>(
    out: &mut W,
    report: &DecodeReport,
    config: &DecoderConfig,
    started_at: Option<Timestamp>,
) -> std::io::Result<()> {
    let stats = report.stats();

    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  SPI Telemetry Decode Report")?;
    writeln!(out, "═══════════════════════════════════════════════")?;
    if let Some(started_at) = started_at {
        writeln!(out, "Capture started: {}", started_at.format("%Y-%m-%d %H:%M:%S%.3f UTC"))?;
    }
    writeln!(out, "Bytes:   {}", stats.bytes)?;
    writeln!(out, "Words:   {}", stats.words)?;
    writeln!(out, "Dropped: {}", stats.dropped)?;
    writeln!(out, "Errors:  {}", stats.errors)?;
    if report.discarded_trailing_byte() {
        writeln!(out, "Note: odd byte count, trailing byte discarded")?;
    }

    let words: Vec<&str> = report.words.iter().map(|w| w.as_str()).collect();
    writeln!(out, "\nWords: [{}]", words.join(", "))?;

    if !report.dropped.is_empty() {
        let dropped: Vec<&str> = report.dropped.iter().map(|w| w.as_str()).collect();
        writeln!(out, "Dropped (unknown tag): [{}]", dropped.join(", "))?;
    }

    for decoded in &report.channels {
        let channel_config = config.channel(decoded.channel);
        let unit = decoded.unit.as_deref().unwrap_or("");

        writeln!(out, "\n───────────────────────────────────────────────")?;
        write!(out, "{} (tag '{}')", decoded.channel, decoded.channel.tag())?;
        if let Some(label) = &decoded.label {
            write!(out, " - {}", label)?;
        }
        writeln!(out)?;
        writeln!(
            out,
            "  {} >> {} x {:e}",
            channel_config.type_descriptor,
            channel_config.scalefactor,
            channel_config.int_scale_factor
        )?;

        if decoded.is_empty() {
            writeln!(out, "  (no words)")?;
            continue;
        }

        for sample in &decoded.samples {
            writeln!(
                out,
                "  #{:<5} {}  code={:<12} {} {}",
                sample.index, sample.word, sample.code, sample.value, unit
            )?;
        }
        for error in &decoded.errors {
            writeln!(out, "  #{:<5} {}  ✗ not hexadecimal", error.index, error.word)?;
        }
    }

    Ok(())
}
