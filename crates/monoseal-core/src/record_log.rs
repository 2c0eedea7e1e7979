//! Sealed-record export log: append-only, hash-chained JSONL.
//!
//! The core keeps exactly one live sealed record; each commit fully
//! supersedes the previous one. Deployments that need history run an
//! external consumer that captures the record after every commit — this
//! module is that consumer:
//! - one JSON-encoded [`RecordLogEntryV1`] per line,
//! - hash-chained entries (anti-equivocation within the log),
//! - deterministic, domain-separated record hashes,
//! - a verifier that replays a log file, re-deriving both the chain and
//!   each record's CRC from its own fields.
//!
//! The log is host-side tooling. It is not core state and does not extend
//! the core's tamper-evidence across power cycles by itself; the session id
//! in each entry is what distinguishes records from different cycles.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::crc16::crc16_modbus;
use crate::hash::sha256;
use crate::sequencer::{seal_message, SealedRecord};
use crate::Hash32;

/// Domain separation tag for record hashes.
pub const RECORD_LOG_DOMAIN_V1: &[u8] = b"MONOSEAL_RECORD_LOG_V1";

#[derive(Debug, Error)]
pub enum RecordLogError {
    #[error("record log io: {0}")]
    Io(#[from] std::io::Error),
    #[error("record log encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("unsupported record version {version} at line {line}")]
    UnsupportedVersion { version: u32, line: usize },
    #[error("hash chain broken at line {line}")]
    ChainBroken { line: usize },
    #[error("record hash mismatch at line {line}")]
    HashMismatch { line: usize },
    #[error("crc16 mismatch at line {line}: recorded {recorded:#06x}, recomputed {recomputed:#06x}")]
    CrcMismatch {
        line: usize,
        recorded: u16,
        recomputed: u16,
    },
}

/// One exported sealed record, bound into the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLogEntryV1 {
    pub record_version: u32,
    pub prev_record_hash: Hash32,
    pub record_hash: Hash32,

    pub value: u32,
    pub sensor_id: u8,
    pub mono_count: u32,
    pub session_id: u8,
    pub crc16: u16,
}

/// Deterministic hash of one record under the chain: domain tag, version,
/// previous hash, then the record fields in little-endian order.
pub fn record_hash_v1(prev: &Hash32, rec: &SealedRecord) -> Hash32 {
    let mut bytes = Vec::with_capacity(64);
    bytes.extend_from_slice(RECORD_LOG_DOMAIN_V1);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&prev.0);
    bytes.extend_from_slice(&rec.value.to_le_bytes());
    bytes.push(rec.sensor_id);
    bytes.extend_from_slice(&rec.mono_count.to_le_bytes());
    bytes.push(rec.session_id);
    bytes.extend_from_slice(&rec.crc16.to_le_bytes());
    sha256(&bytes)
}

/// Append-only file log of sealed records.
///
/// Each line is one JSON-encoded [`RecordLogEntryV1`]. Writes are
/// serialized per process and fsynced per append.
pub struct FileRecordLog {
    path: PathBuf,
    /// Hash of the last entry appended by this process (genesis is zero).
    last_hash: Mutex<Hash32>,
}

impl FileRecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileRecordLog {
            path: path.into(),
            last_hash: Mutex::new(Hash32::ZERO),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_record_hash(&self) -> Hash32 {
        *self.last_hash.lock().expect("lock poisoned")
    }

    /// Append one sealed record, extending the chain.
    pub fn append(&self, rec: &SealedRecord) -> Result<RecordLogEntryV1, RecordLogError> {
        let mut last = self.last_hash.lock().expect("lock poisoned");
        let record_hash = record_hash_v1(&last, rec);
        let entry = RecordLogEntryV1 {
            record_version: 1,
            prev_record_hash: *last,
            record_hash,
            value: rec.value,
            sensor_id: rec.sensor_id,
            mono_count: rec.mono_count,
            session_id: rec.session_id,
            crc16: rec.crc16,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_vec(&entry)?;
        file.write_all(&line)?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        *last = record_hash;
        Ok(entry)
    }
}

/// Replay a log file from genesis: verify the version, the hash chain, the
/// per-entry record hash, and that each recorded `crc16` re-derives from
/// the entry's own `(sensor_id, value, mono_count)`. Returns the entries on
/// success.
pub fn verify_chain(path: &Path) -> Result<Vec<RecordLogEntryV1>, RecordLogError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    let mut expect_prev = Hash32::ZERO;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let entry: RecordLogEntryV1 = serde_json::from_str(&line)?;
        let line_no = idx + 1;

        if entry.record_version != 1 {
            return Err(RecordLogError::UnsupportedVersion {
                version: entry.record_version,
                line: line_no,
            });
        }
        if entry.prev_record_hash != expect_prev {
            return Err(RecordLogError::ChainBroken { line: line_no });
        }
        let rec = SealedRecord {
            value: entry.value,
            sensor_id: entry.sensor_id,
            mono_count: entry.mono_count,
            session_id: entry.session_id,
            crc16: entry.crc16,
        };
        if record_hash_v1(&entry.prev_record_hash, &rec) != entry.record_hash {
            return Err(RecordLogError::HashMismatch { line: line_no });
        }
        let recomputed = crc16_modbus(&seal_message(entry.sensor_id, entry.value, entry.mono_count));
        if recomputed != entry.crc16 {
            return Err(RecordLogError::CrcMismatch {
                line: line_no,
                recorded: entry.crc16,
                recomputed,
            });
        }

        expect_prev = entry.record_hash;
        entries.push(entry);
    }
    Ok(entries)
}
