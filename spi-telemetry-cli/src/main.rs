//! SPI Telemetry CLI Application
//!
//! Command-line front end for the spi-telemetry-decoder library. It:
//! - Replays a recorded analyzer capture
//! - Prints the per-transaction dump (optional)
//! - Decodes the MOSI telemetry into per-channel physical values
//! - Writes a TXT or JSON report

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use spi_telemetry_decoder::{capture, CaptureFileReader, Decoder};

/// SPI Telemetry - decode multiplexed controller telemetry from SPI captures
#[derive(Parser, Debug)]
#[command(name = "spi-telemetry-cli")]
#[command(about = "Decode multiplexed telemetry from SPI analyzer captures", long_about = None)]
#[command(version)]
struct Args {
    /// Recorded capture file to replay
    #[arg(long, value_name = "FILE")]
    capture: Option<PathBuf>,

    /// Maximum bytes per transaction
    #[arg(long, value_name = "BYTES")]
    max_bytes: Option<usize>,

    /// Number of transactions to read (0 = until the capture ends)
    #[arg(short = 'n', long, value_name = "COUNT")]
    count: Option<usize>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print every transaction as it is read
    #[arg(long)]
    dump: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("SPI Telemetry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", spi_telemetry_decoder::VERSION);

    let config = resolve_config(&args)?;
    run(&config)
}

/// Load the config file (if any) and apply command line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(file) = &args.capture {
        config.capture.file = Some(file.clone());
    }
    if let Some(max_bytes) = args.max_bytes {
        config.capture.max_bytes = max_bytes;
    }
    if let Some(count) = args.count {
        config.capture.count = count;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(output) = &args.output {
        config.output.file = Some(output.clone());
    }
    config.output.dump |= args.dump;

    if config.capture.max_bytes == 0 {
        bail!("max_bytes must be at least 1");
    }

    Ok(config)
}

/// Replay the capture, decode it and write the report
fn run(config: &AppConfig) -> Result<()> {
    let Some(capture_path) = &config.capture.file else {
        bail!("No capture specified (use --capture <FILE> or [capture] file in the config)");
    };

    let decoder = Decoder::new(config.channels.clone()).context("Invalid channel configuration")?;

    let mut source = CaptureFileReader::open(capture_path)
        .with_context(|| format!("Failed to open capture {:?}", capture_path))?;
    let started_at = source.started_at();

    let stdout = io::stdout();
    let mut dump_out = stdout.lock();
    if config.output.dump {
        writeln!(dump_out, "{}", report::DUMP_HEADER)?;
    }

    let mut dump_error = None;
    let run = capture(
        &mut source,
        config.capture.max_bytes,
        config.capture.count,
        |transaction| {
            if config.output.dump && dump_error.is_none() {
                if let Err(e) = report::write_transaction(&mut dump_out, transaction, started_at) {
                    dump_error = Some(e);
                }
            }
        },
    );
    if let Some(e) = dump_error {
        return Err(e).context("Failed to write transaction dump");
    }
    dump_out.flush()?;
    drop(dump_out);

    // Keep what was captured before a read failure, as the analyzer tool does
    if let Some(e) = &run.error {
        log::warn!(
            "Capture {:?} ended early after {} transactions ({}); decoding what was read",
            capture_path,
            run.transactions,
            e
        );
    }
    let buffer = run.buffer;

    let report = decoder.decode_buffer(&buffer);
    for error in report.errors() {
        log::error!("{}", error);
    }

    match &config.output.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut out = BufWriter::new(file);
            report::write_report(&mut out, config.output.format, &report, &config.channels, Some(started_at))?;
            out.flush()?;
            log::info!("Report written to {:?}", path);
        }
        None => {
            let mut out = io::stdout().lock();
            report::write_report(&mut out, config.output.format, &report, &config.channels, Some(started_at))?;
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "spi-telemetry-cli",
            "--capture",
            "run.spic",
            "-n",
            "0",
            "--format",
            "json",
            "--dump",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.capture.file, Some(PathBuf::from("run.spic")));
        assert_eq!(config.capture.count, 0);
        assert_eq!(config.capture.max_bytes, 2);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.dump);
    }

    #[test]
    fn test_zero_max_bytes_rejected() {
        let args = Args::parse_from(["spi-telemetry-cli", "--max-bytes", "0"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_truncated_capture_still_reported() {
        use spi_telemetry_decoder::{CaptureFileWriter, StatusFlags, Timestamp, Transaction};

        let dir = tempfile::tempdir().unwrap();
        let capture_path = dir.path().join("cut.spic");
        let report_path = dir.path().join("report.json");

        let started_at = Timestamp::from_timestamp(0, 0).unwrap();
        let mut writer = CaptureFileWriter::create(&capture_path, started_at).unwrap();
        for (index, mosi) in [[0x31u8, 0x23], [0x78, 0x01], [0xb8, 0x00]].iter().enumerate() {
            let transaction = Transaction {
                index,
                timestamp_ns: 1000 * index as u64,
                status: StatusFlags::OK,
                mosi: mosi.to_vec(),
                miso: vec![0; 2],
            };
            writer.write_transaction(&transaction).unwrap();
        }
        writer.finish().unwrap();

        let mut bytes = std::fs::read(&capture_path).unwrap();
        bytes.pop();
        std::fs::write(&capture_path, bytes).unwrap();

        let mut config = AppConfig::default();
        config.capture.file = Some(capture_path);
        config.capture.count = 0;
        config.output.format = OutputFormat::Json;
        config.output.file = Some(report_path.clone());
        run(&config).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["byte_count"], 4);
        assert_eq!(json["words"][0], "3123");
        assert_eq!(json["words"][1], "7801");
    }

    #[test]
    fn test_missing_capture_reported() {
        let err = run(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No capture specified"));
    }
}
