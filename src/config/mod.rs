//! Run configuration.
//!
//! The YAML input is deserialized once into [`RawInput`], then each concern is
//! parsed by its own step into a typed section:
//!
//! ```text
//! RawInput ──► parse_common()   ──► CommonConfig
//!          ──► parse_problem()  ──► HeatProblem
//!          ──► parse_stepping() ──► Option<TimeStepping>
//!          ──► parse_rom()      ──► Option<RomConfig>, Option<HyperConfig>
//!          ──► parse_decomp()   ──► Option<DecompConfig>
//!                                        │
//!                         RunConfig::assemble() (cross-field checks)
//! ```

pub mod common;
pub mod decomp;
pub mod mono;
pub mod problem;
pub mod rom;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SchwarzError};
use crate::sim::heat_transfer::HeatProblem;

pub use common::{CommonConfig, ProblemKind};
pub use decomp::{DecompConfig, DecompRomConfig};
pub use mono::TimeStepping;
pub use problem::parse_problem;
pub use rom::{HyperConfig, RomAlgorithm, RomConfig};

/// Input file as written, before validation.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawInput {
    #[serde(default, alias = "meshDirFull")]
    pub mesh_dir: Option<String>,
    #[serde(default)]
    pub final_time: Option<f64>,
    #[serde(default)]
    pub state_sampling_freq: Option<i64>,
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub problem_name: Option<String>,
    #[serde(default)]
    pub ic_flag: Option<i64>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub time_step_size: Option<f64>,
    #[serde(default)]
    pub ode_scheme: Option<String>,
    #[serde(default)]
    pub rom: Option<rom::RawRom>,
    #[serde(default)]
    pub hyper: Option<rom::RawHyper>,
    #[serde(default)]
    pub decomp: Option<decomp::RawDecomp>,
    /// Problem parameters (`diffusivity`, `pulseX`, ...).
    #[serde(flatten)]
    pub params: HashMap<String, Value>,
}

/// Fully validated, immutable run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub common: CommonConfig,
    pub problem: HeatProblem,
    /// Top-level time stepping. Required for monolithic runs.
    pub stepping: Option<TimeStepping>,
    pub rom: Option<RomConfig>,
    pub hyper: Option<HyperConfig>,
    pub decomp: Option<DecompConfig>,
}

impl RunConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawInput = serde_saphyr::from_str(content)
            .map_err(|e| SchwarzError::config("input", e.to_string()))?;
        Self::assemble(&raw)
    }

    /// Runs every parse step, then the cross-section checks.
    pub fn assemble(raw: &RawInput) -> Result<Self> {
        let common = common::parse_common(raw)?;
        let problem = problem::parse_problem(&common, &raw.params)?;
        let stepping = mono::parse_stepping(raw)?;
        let (rom, hyper) = rom::parse_rom(raw)?;
        let decomp = decomp::parse_decomp(raw)?;

        if rom.is_some() && decomp.is_some() {
            return Err(SchwarzError::config(
                "rom",
                "cannot set rom and decomp fields in the same input file",
            ));
        }
        if decomp.is_none() {
            if raw.time_step_size.is_none() {
                return Err(SchwarzError::config("timeStepSize", "missing"));
            }
            if raw.ode_scheme.is_none() {
                return Err(SchwarzError::config("odeScheme", "missing"));
            }
        }

        Ok(Self {
            common,
            problem,
            stepping,
            rom,
            hyper,
            decomp,
        })
    }

    pub fn is_decomposed(&self) -> bool {
        self.decomp.is_some()
    }
}

/// Reads and validates a YAML input file.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SchwarzError::io(path, e))?;
    RunConfig::from_yaml_str(&content)
}
