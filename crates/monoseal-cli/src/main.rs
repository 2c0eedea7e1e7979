//! monoseal CLI — drive the tick-accurate sealing core from the command
//! line: run commits, export hash-chained record logs, verify them, and
//! print golden CRC vectors.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use monoseal_core::crc16::crc16_modbus;
use monoseal_core::engine::COMMIT_TICK_BUDGET;
use monoseal_core::record_log::{verify_chain, FileRecordLog};
use monoseal_core::sequencer::seal_message;
use monoseal_core::SealCore;

/// Tamper-evident monotonic record sealing.
#[derive(Parser)]
#[command(name = "monoseal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal one or more readings and print the resulting records as JSON
    Commit {
        /// Sensor id (0-255; accepts 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_u8)]
        sensor: u8,

        /// Candidate value (accepts 0x-prefixed hex)
        #[arg(long, value_parser = parse_u32)]
        value: u32,

        /// Number of commits to run; the value increments per commit
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Session counter input sampled at the first commit
        #[arg(long, value_parser = parse_u8, default_value = "0", env = "MONOSEAL_SESSION")]
        session: u8,

        /// Append each sealed record to this hash-chained JSONL log
        #[arg(short, long, env = "MONOSEAL_LOG")]
        log: Option<PathBuf>,
    },

    /// Verify a record log: hash chain, record hashes, and per-record CRCs
    Verify {
        /// Log file produced by `monoseal commit --log`
        log: PathBuf,
    },

    /// Print a deterministic golden-vector table (CSV)
    Vectors {
        /// Number of vectors
        #[arg(short = 'n', long, default_value_t = 16)]
        count: u32,
    },

    /// Run the built-in arbitration self-check
    Selfcheck,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    let v = parse_u32(s)?;
    u8::try_from(v).map_err(|_| format!("{v} does not fit in a byte"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Commit {
            sensor,
            value,
            count,
            session,
            log,
        } => cmd_commit(sensor, value, count, session, log),
        Commands::Verify { log } => cmd_verify(&log),
        Commands::Vectors { count } => cmd_vectors(count),
        Commands::Selfcheck => cmd_selfcheck(),
    }
}

fn cmd_commit(sensor: u8, value: u32, count: u32, session: u8, log: Option<PathBuf>) -> Result<()> {
    let mut core = SealCore::new();
    core.set_session_counter(session);
    let log = log.map(FileRecordLog::new);

    for i in 0..count {
        let v = value.wrapping_add(i);
        if !core.commit(sensor, v, COMMIT_TICK_BUDGET) {
            bail!("commit {i} did not complete within {COMMIT_TICK_BUDGET} ticks");
        }
        let rec = *core.sealed();
        if let Some(log) = &log {
            let entry = log
                .append(&rec)
                .with_context(|| format!("appending record {i} to {}", log.path().display()))?;
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!("{}", serde_json::to_string(&rec)?);
        }
    }
    Ok(())
}

fn cmd_verify(log: &PathBuf) -> Result<()> {
    let entries =
        verify_chain(log).with_context(|| format!("verifying {}", log.display()))?;
    match entries.last() {
        Some(last) => {
            println!(
                "ok: {} records, head mono={}, session={:#04x}",
                entries.len(),
                last.mono_count,
                last.session_id
            );
        }
        None => println!("ok: empty log"),
    }
    Ok(())
}

fn cmd_vectors(count: u32) -> Result<()> {
    // Deterministic sweep; mono equals the row index, matching the
    // auto-incrementing counter.
    println!("sensor_id,value,mono_count,crc16");
    for i in 0..count {
        let sensor = (i.wrapping_mul(37) & 0xFF) as u8;
        let value = 0x9E37_79B9u32.wrapping_mul(i.wrapping_add(1));
        let crc = crc16_modbus(&seal_message(sensor, value, i));
        println!("{sensor:#04x},{value:#010x},{i},{crc:#06x}");
    }
    Ok(())
}

fn cmd_selfcheck() -> Result<()> {
    use monoseal_core::host::{HOST_BUSY, HOST_INIT};

    let mut core = SealCore::new();
    core.set_session_counter(0x01);

    let host_crc = |core: &mut SealCore, data: &[u8]| -> u16 {
        core.host_write(HOST_INIT);
        for &b in data {
            while core.host_read() & HOST_BUSY != 0 {
                core.idle_tick();
            }
            core.host_write(u32::from(b));
        }
        while core.host_read() & HOST_BUSY != 0 {
            core.idle_tick();
        }
        (core.host_read() & 0xFFFF) as u16
    };

    let before = host_crc(&mut core, &[0x01, 0x02, 0x03]);
    if before != 0x6161 {
        bail!("host checksum self-check failed: got {before:#06x}, want 0x6161");
    }

    if !core.commit(0xAA, 0x0000_0000, COMMIT_TICK_BUDGET) {
        bail!("seal commit did not complete");
    }
    let sealed = core.sealed().crc16;
    if sealed != 0x578C {
        bail!("sealed CRC mismatch: got {sealed:#06x}, want 0x578C");
    }

    let after = host_crc(&mut core, &[0x01, 0x02, 0x03]);
    if after != 0x6161 {
        bail!("host checksum after seal failed: got {after:#06x}, want 0x6161");
    }

    println!("ok: host {before:#06x}, seal 0x578c, host {after:#06x}");
    Ok(())
}
