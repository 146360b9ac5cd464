//! Periodic raw state snapshots, one file per subdomain.
//!
//! The file has no header. Each sampled outer step appends the full state vector
//! as consecutive native-endian `f64` values. Nothing else is stored, so a reader
//! must independently know:
//! - the state length of the subdomain,
//! - the sampling frequency (records are steps `0, freq, 2*freq, ...`),
//! - the outer step size `dtMax` to map step indices back to time.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SchwarzError};

/// Writes a subdomain's state every `freq` outer steps.
pub struct StateRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    freq: usize,
    records: usize,
}

impl StateRecorder {
    /// Creates (truncates) the output file at `path`.
    pub fn create(path: &Path, freq: usize) -> Result<Self> {
        if freq == 0 {
            return Err(SchwarzError::config(
                "stateSamplingFreq",
                "sampling frequency must be positive",
            ));
        }
        let file = File::create(path).map_err(|e| SchwarzError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            freq,
            records: 0,
        })
    }

    /// Number of snapshots written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Appends `state` when `step` is a multiple of the sampling frequency.
    ///
    /// `_time` is not persisted. Returns whether a record was written.
    pub fn record(&mut self, step: usize, _time: f64, state: &[f64]) -> Result<bool> {
        if step % self.freq != 0 {
            return Ok(false);
        }
        for value in state {
            self.writer
                .write_all(&value.to_ne_bytes())
                .map_err(|e| SchwarzError::io(&self.path, e))?;
        }
        self.records += 1;
        Ok(true)
    }

    /// Flushes buffered bytes to disk, surfacing any write error.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| SchwarzError::io(&self.path, e))
    }
}

/// Reads every snapshot of a state file whose vectors have `state_len` entries.
pub fn read_state_snapshots(path: &Path, state_len: usize) -> Result<Vec<Vec<f64>>> {
    if state_len == 0 {
        return Err(SchwarzError::MalformedRecord(
            "state length must be positive".to_string(),
        ));
    }
    let file = File::open(path).map_err(|e| SchwarzError::io(path, e))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| SchwarzError::io(path, e))?;

    let record_bytes = state_len * size_of::<f64>();
    if bytes.len() % record_bytes != 0 {
        return Err(SchwarzError::MalformedRecord(format!(
            "{}: {} bytes is not a whole number of {}-value records",
            path.display(),
            bytes.len(),
            state_len
        )));
    }

    let snapshots = bytes
        .chunks_exact(record_bytes)
        .map(|record| {
            record
                .chunks_exact(size_of::<f64>())
                .map(|b| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(b);
                    f64::from_ne_bytes(raw)
                })
                .collect()
        })
        .collect();
    Ok(snapshots)
}
