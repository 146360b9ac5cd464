use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::RawInput;
use crate::error::{Result, SchwarzError, required};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawRom {
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub num_modes: Option<i64>,
    #[serde(default)]
    pub basis_file: Option<String>,
    #[serde(default)]
    pub trans_file: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawHyper {
    #[serde(default)]
    pub mesh_dir_hyper: Option<String>,
    #[serde(default)]
    pub sample_file: Option<String>,
    #[serde(default)]
    pub stencil_file: Option<String>,
}

/// Projection used by a monolithic reduced-order run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomAlgorithm {
    Galerkin,
    Lspg,
}

impl FromStr for RomAlgorithm {
    type Err = SchwarzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Galerkin" => Ok(RomAlgorithm::Galerkin),
            "LSPG" => Ok(RomAlgorithm::Lspg),
            other => Err(SchwarzError::config(
                "rom.algorithm",
                format!("unknown ROM algorithm '{other}' (expected Galerkin or LSPG)"),
            )),
        }
    }
}

impl fmt::Display for RomAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomAlgorithm::Galerkin => f.write_str("Galerkin"),
            RomAlgorithm::Lspg => f.write_str("LSPG"),
        }
    }
}

/// `rom:` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RomConfig {
    pub algorithm: RomAlgorithm,
    pub num_modes: usize,
    pub basis_file: PathBuf,
    pub trans_file: PathBuf,
}

/// `hyper:` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperConfig {
    pub mesh_dir_hyper: PathBuf,
    pub sample_file: PathBuf,
    pub stencil_file: PathBuf,
}

pub fn parse_rom(raw: &RawInput) -> Result<(Option<RomConfig>, Option<HyperConfig>)> {
    let rom = raw.rom.as_ref().map(parse_rom_section).transpose()?;
    let hyper = raw.hyper.as_ref().map(parse_hyper_section).transpose()?;
    Ok((rom, hyper))
}

fn parse_rom_section(raw: &RawRom) -> Result<RomConfig> {
    let algorithm = required(raw.algorithm.as_deref(), "rom.algorithm")?.parse()?;
    let num_modes = required(raw.num_modes, "rom.numModes")?;
    if num_modes <= 0 {
        return Err(SchwarzError::config(
            "rom.numModes",
            format!("must be positive, got {num_modes}"),
        ));
    }
    Ok(RomConfig {
        algorithm,
        num_modes: num_modes as usize,
        basis_file: required(raw.basis_file.as_deref(), "rom.basisFile")?.into(),
        trans_file: required(raw.trans_file.as_deref(), "rom.transFile")?.into(),
    })
}

fn parse_hyper_section(raw: &RawHyper) -> Result<HyperConfig> {
    Ok(HyperConfig {
        mesh_dir_hyper: required(raw.mesh_dir_hyper.as_deref(), "hyper.meshDirHyper")?.into(),
        sample_file: required(raw.sample_file.as_deref(), "hyper.sampleFile")?.into(),
        stencil_file: required(raw.stencil_file.as_deref(), "hyper.stencilFile")?.into(),
    })
}
