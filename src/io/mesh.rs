//! Mesh and tiling metadata stored as JSON in a mesh directory.
//!
//! - `mesh.json`: `{ "cells": 200, "length": 1.0 }`
//! - `tiling.json`: `{ "domains": [[0, 104], [96, 200]] }`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::sim::tiling::Tiling;

pub const MESH_FILE: &str = "mesh.json";
pub const TILING_FILE: &str = "tiling.json";

/// Uniform 1D grid description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub cells: usize,
    pub length: f64,
}

impl MeshInfo {
    pub fn dx(&self) -> f64 {
        self.length / self.cells as f64
    }

    /// Centroid coordinate of global cell `cell`.
    pub fn centroid(&self, cell: usize) -> f64 {
        (cell as f64 + 0.5) * self.dx()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TilingFile {
    domains: Vec<[usize; 2]>,
}

/// Writes `mesh.json` into `dir`, creating the directory if needed.
pub fn write_mesh(dir: &Path, mesh: &MeshInfo) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create mesh directory: {}", dir.display()))?;
    let path = dir.join(MESH_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), mesh)
        .with_context(|| format!("Failed to serialize mesh to: {}", path.display()))?;
    Ok(())
}

/// Reads and validates `mesh.json` from `dir`.
pub fn read_mesh(dir: &Path) -> Result<MeshInfo> {
    let path = dir.join(MESH_FILE);
    let file =
        File::open(&path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mesh: MeshInfo = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize mesh from: {}", path.display()))?;
    anyhow::ensure!(
        mesh.cells > 0 && mesh.length > 0.0 && mesh.length.is_finite(),
        "{}: mesh needs a positive cell count and length (got cells={}, length={})",
        path.display(),
        mesh.cells,
        mesh.length
    );
    Ok(mesh)
}

pub fn write_tiling(dir: &Path, tiling: &Tiling) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create mesh directory: {}", dir.display()))?;
    let path = dir.join(TILING_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let raw = TilingFile {
        domains: tiling.ranges().iter().map(|r| [r.start, r.end]).collect(),
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &raw)
        .with_context(|| format!("Failed to serialize tiling to: {}", path.display()))?;
    Ok(())
}

/// Reads `tiling.json` and checks it against the mesh cell count.
pub fn read_tiling(dir: &Path, mesh: &MeshInfo) -> Result<Tiling> {
    let path = dir.join(TILING_FILE);
    let file =
        File::open(&path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let raw: TilingFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize tiling from: {}", path.display()))?;
    let tiling = Tiling::new(raw.domains.iter().map(|[s, e]| *s..*e).collect())
        .with_context(|| format!("Invalid tiling in: {}", path.display()))?;
    anyhow::ensure!(
        tiling.cells() == mesh.cells,
        "{}: tiling covers {} cells but the mesh has {}",
        path.display(),
        tiling.cells(),
        mesh.cells
    );
    Ok(tiling)
}
