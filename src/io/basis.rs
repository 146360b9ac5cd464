//! Trial-space files for reduced-order subdomains.
//!
//! Basis and affine-shift files share one binary layout (native-endian):
//! ```text
//! u64              rows
//! u64              cols
//! f64 * rows*cols  entries, column major
//! ```
//! A shift file is a single column. Decomposed runs read `{root}_{domain}.bin`.
//!
//! Sample and stencil files are plain text: whitespace-separated cell indices.
//! Decomposed runs read samples from `{root}_{domain}.txt`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SchwarzError};

/// Path of subdomain `domain`'s file under `root`.
pub fn domain_file(root: &Path, domain: usize) -> PathBuf {
    with_suffix(root, domain, "bin")
}

/// Path of subdomain `domain`'s sample list under `root`.
pub fn domain_sample_file(root: &Path, domain: usize) -> PathBuf {
    with_suffix(root, domain, "txt")
}

fn with_suffix(root: &Path, domain: usize, ext: &str) -> PathBuf {
    let mut name = root.as_os_str().to_owned();
    name.push(format!("_{domain}.{ext}"));
    PathBuf::from(name)
}

/// Reads a basis file and keeps its first `modes` columns.
pub fn read_basis(path: &Path, modes: usize) -> Result<DMatrix<f64>> {
    let full = read_matrix(path)?;
    if modes == 0 || modes > full.ncols() {
        return Err(SchwarzError::config(
            "numModes",
            format!(
                "{}: asked for {modes} modes, file holds {}",
                path.display(),
                full.ncols()
            ),
        ));
    }
    Ok(full.columns(0, modes).into_owned())
}

/// Reads an affine-shift file (a single column).
pub fn read_shift(path: &Path) -> Result<DVector<f64>> {
    let m = read_matrix(path)?;
    if m.ncols() != 1 {
        return Err(SchwarzError::MalformedRecord(format!(
            "{}: shift vector has {} columns",
            path.display(),
            m.ncols()
        )));
    }
    Ok(m.column(0).into_owned())
}

pub fn read_matrix(path: &Path) -> Result<DMatrix<f64>> {
    let bytes = std::fs::read(path).map_err(|e| SchwarzError::io(path, e))?;
    let word = |i: usize| -> Option<[u8; 8]> {
        bytes.get(8 * i..8 * (i + 1)).and_then(|w| w.try_into().ok())
    };
    let (Some(rows), Some(cols)) = (word(0), word(1)) else {
        return Err(SchwarzError::MalformedRecord(format!(
            "{}: missing rows/cols header",
            path.display()
        )));
    };
    let rows = u64::from_ne_bytes(rows);
    let cols = u64::from_ne_bytes(cols);
    let payload = bytes.len() - 16;
    let count = usize::try_from(rows)
        .ok()
        .zip(usize::try_from(cols).ok())
        .and_then(|(r, c)| r.checked_mul(c))
        .filter(|&n| n.checked_mul(8) == Some(payload))
        .ok_or_else(|| {
            SchwarzError::MalformedRecord(format!(
                "{}: header says {rows}x{cols}, file has {payload} bytes of entries",
                path.display()
            ))
        })?;

    let values: Vec<f64> = (0..count)
        .filter_map(|i| word(i + 2))
        .map(f64::from_ne_bytes)
        .collect();
    Ok(DMatrix::from_column_slice(rows as usize, cols as usize, &values))
}

/// Writes `m` in the layout [`read_matrix`] expects.
pub fn write_matrix(path: &Path, m: &DMatrix<f64>) -> Result<()> {
    let file = File::create(path).map_err(|e| SchwarzError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut put = |bytes: [u8; 8]| writer.write_all(&bytes).map_err(|e| SchwarzError::io(path, e));
    put((m.nrows() as u64).to_ne_bytes())?;
    put((m.ncols() as u64).to_ne_bytes())?;
    for value in m.iter() {
        put(value.to_ne_bytes())?;
    }
    writer.flush().map_err(|e| SchwarzError::io(path, e))
}

/// Reads a whitespace-separated list of cell indices.
pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path).map_err(|e| SchwarzError::io(path, e))?;
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<usize>().map_err(|_| {
                SchwarzError::MalformedRecord(format!(
                    "{}: '{tok}' is not a cell index",
                    path.display()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_column_major_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basis_0.bin");
        let m = DMatrix::from_row_slice(3, 2, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        write_matrix(&path, &m).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16 + 6 * 8);
        assert_eq!(&bytes[0..8], &3_u64.to_ne_bytes());
        assert_eq!(&bytes[16..24], &1.0_f64.to_ne_bytes());
        assert_eq!(&bytes[24..32], &2.0_f64.to_ne_bytes());

        assert_eq!(read_matrix(&path).unwrap(), m);
        let first = read_basis(&path, 1).unwrap();
        assert_eq!(first.as_slice(), &[1.0, 2.0, 3.0]);
        assert!(read_basis(&path, 3).unwrap_err().is_configuration());
    }

    #[test]
    fn test_shift_must_be_one_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("center.bin");
        write_matrix(&path, &DMatrix::from_element(4, 1, 0.5)).unwrap();
        assert_eq!(read_shift(&path).unwrap().len(), 4);
        write_matrix(&path, &DMatrix::from_element(2, 2, 0.5)).unwrap();
        assert!(read_shift(&path).is_err());
    }

    #[test]
    fn test_header_must_match_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(1_u64 << 40).to_ne_bytes());
        bytes.extend_from_slice(&(1_u64 << 40).to_ne_bytes());
        bytes.extend_from_slice(&1.0_f64.to_ne_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_matrix(&path),
            Err(SchwarzError::MalformedRecord(_))
        ));
        std::fs::write(&path, [0u8; 12]).unwrap();
        assert!(read_matrix(&path).is_err());
    }

    #[test]
    fn test_domain_file_appends_index() {
        assert_eq!(
            domain_file(Path::new("pod/basis"), 3),
            PathBuf::from("pod/basis_3.bin")
        );
        assert_eq!(
            domain_sample_file(Path::new("sample"), 0),
            PathBuf::from("sample_0.txt")
        );
    }

    #[test]
    fn test_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "0 3\n7\n").unwrap();
        assert_eq!(read_indices(&path).unwrap(), vec![0, 3, 7]);
        std::fs::write(&path, "1 x").unwrap();
        assert!(read_indices(&path).is_err());
    }
}
