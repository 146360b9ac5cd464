//! Binary wall-clock telemetry, one file per run.
//!
//! Layout (all fields native-endian):
//! ```text
//! u64                      number of domains (file header)
//! repeated until EOF:
//!   u64                    sub-iteration count `n` of this outer step
//!   f64 * n * n_domains    runtimes, sub-iteration major, domain minor
//! ```
//! Records carry no step index or timestamp; the i-th record is outer step i+1.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SchwarzError};

/// Appends one self-delimited runtime record per outer step.
pub struct RuntimeRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    n_domains: usize,
    records: usize,
}

impl RuntimeRecorder {
    /// Creates (truncates) `path` and writes the domain-count header.
    pub fn create(path: &Path, n_domains: usize) -> Result<Self> {
        if n_domains == 0 {
            return Err(SchwarzError::config(
                "nDomains",
                "runtime recorder needs at least one domain",
            ));
        }
        let file = File::create(path).map_err(|e| SchwarzError::io(path, e))?;
        let mut recorder = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            n_domains,
            records: 0,
        };
        recorder.write_u64(n_domains as u64)?;
        Ok(recorder)
    }

    /// Recorder for a non-decomposed run (`n_domains = 1`).
    pub fn create_single(path: &Path) -> Result<Self> {
        Self::create(path, 1)
    }

    pub fn n_domains(&self) -> usize {
        self.n_domains
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Writes a decomposed record from a `[domain][sub_iteration]` runtime matrix.
    ///
    /// The record header is the length of the first domain's row.
    pub fn record_decomposed(&mut self, runtimes: &[Vec<f64>]) -> Result<()> {
        if runtimes.len() != self.n_domains {
            return Err(SchwarzError::MalformedRecord(format!(
                "runtime matrix has {} domain rows, recorder expects {}",
                runtimes.len(),
                self.n_domains
            )));
        }
        let n_iters = runtimes[0].len();
        if let Some(bad) = runtimes.iter().position(|row| row.len() != n_iters) {
            return Err(SchwarzError::MalformedRecord(format!(
                "domain {bad} has {} sub-iteration runtimes, domain 0 has {n_iters}",
                runtimes[bad].len()
            )));
        }

        self.write_u64(n_iters as u64)?;
        for iter_idx in 0..n_iters {
            for row in runtimes {
                self.write_f64(row[iter_idx])?;
            }
        }
        self.records += 1;
        Ok(())
    }

    /// Writes a single-value record (`count = 1`) for a non-decomposed run.
    pub fn record_total(&mut self, seconds: f64) -> Result<()> {
        if self.n_domains != 1 {
            return Err(SchwarzError::MalformedRecord(format!(
                "total-runtime records need a single-domain recorder, this one has {}",
                self.n_domains
            )));
        }
        self.write_u64(1)?;
        self.write_f64(seconds)?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| SchwarzError::io(&self.path, e))
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer
            .write_all(&value.to_ne_bytes())
            .map_err(|e| SchwarzError::io(&self.path, e))
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.writer
            .write_all(&value.to_ne_bytes())
            .map_err(|e| SchwarzError::io(&self.path, e))
    }
}

/// One parsed runtime record.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeRecord {
    pub sub_iterations: usize,
    /// Runtimes in file order (sub-iteration major, domain minor).
    pub values: Vec<f64>,
}

impl RuntimeRecord {
    /// Runtime of `domain` during sub-iteration `iter`, or `None` when either
    /// index is out of range.
    pub fn runtime(&self, iter: usize, domain: usize, n_domains: usize) -> Option<f64> {
        if domain >= n_domains || iter >= self.sub_iterations {
            return None;
        }
        self.values.get(iter * n_domains + domain).copied()
    }
}

/// A whole runtime file read back sequentially.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeTrace {
    pub n_domains: usize,
    pub records: Vec<RuntimeRecord>,
}

impl RuntimeTrace {
    /// Sum of all runtimes of each record.
    pub fn step_totals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.values.iter().sum()).collect()
    }
}

pub fn read_runtime_trace(path: &Path) -> Result<RuntimeTrace> {
    let file = File::open(path).map_err(|e| SchwarzError::io(path, e))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| SchwarzError::io(path, e))?;

    let mut cursor = WordCursor::new(&bytes);
    let header = cursor
        .next_word()
        .map(u64::from_ne_bytes)
        .ok_or_else(|| SchwarzError::MalformedRecord("missing domain-count header".into()))?;
    let n_domains = usize::try_from(header)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| SchwarzError::MalformedRecord(format!("invalid domain count {header}")))?;

    let mut records = Vec::new();
    while let Some(word) = cursor.next_word() {
        let declared = u64::from_ne_bytes(word);
        // The count is untrusted until the file proves it holds that many values.
        let count = usize::try_from(declared)
            .ok()
            .and_then(|k| k.checked_mul(n_domains))
            .filter(|&c| c <= cursor.remaining() / 8)
            .ok_or_else(|| {
                SchwarzError::MalformedRecord(format!(
                    "record {}: {declared} sub-iterations x {n_domains} domains exceeds the {} bytes left",
                    records.len(),
                    cursor.remaining()
                ))
            })?;
        let sub_iterations = count / n_domains;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(word) = cursor.next_word() else {
                return Err(SchwarzError::MalformedRecord(format!(
                    "record {} truncated: expected {count} values",
                    records.len()
                )));
            };
            values.push(f64::from_ne_bytes(word));
        }
        records.push(RuntimeRecord {
            sub_iterations,
            values,
        });
    }

    if cursor.remaining() != 0 {
        return Err(SchwarzError::MalformedRecord(format!(
            "{} trailing bytes after last record",
            cursor.remaining()
        )));
    }

    Ok(RuntimeTrace { n_domains, records })
}

/// Reads consecutive 8-byte words.
struct WordCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WordCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next_word(&mut self) -> Option<[u8; 8]> {
        let end = self.pos + 8;
        if end > self.bytes.len() {
            return None;
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes[self.pos..end]);
        self.pos = end;
        Some(word)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
