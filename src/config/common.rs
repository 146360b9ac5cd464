use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::RawInput;
use crate::error::{Result, SchwarzError, required};
use crate::sim::heat_transfer::Walls;

/// Physics problem to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// 1D conduction, `1d_heat`.
    Heat1d,
}

impl FromStr for ProblemKind {
    type Err = SchwarzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1d_heat" => Ok(ProblemKind::Heat1d),
            other => Err(SchwarzError::config(
                "problem",
                format!("unknown problem '{other}' (expected 1d_heat)"),
            )),
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::Heat1d => f.write_str("1d_heat"),
        }
    }
}

/// Fields every run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonConfig {
    pub mesh_dir: PathBuf,
    pub final_time: f64,
    /// Outer steps between state snapshots.
    pub state_sampling_freq: usize,
    pub problem: ProblemKind,
    pub walls: Walls,
    pub ic_flag: u8,
    pub output_dir: PathBuf,
}

pub fn parse_common(raw: &RawInput) -> Result<CommonConfig> {
    let mesh_dir = PathBuf::from(required(raw.mesh_dir.as_deref(), "meshDir")?);

    let final_time = required(raw.final_time, "finalTime")?;
    if !(final_time.is_finite() && final_time > 0.0) {
        return Err(SchwarzError::config(
            "finalTime",
            format!("must be positive, got {final_time}"),
        ));
    }

    let freq = required(raw.state_sampling_freq, "stateSamplingFreq")?;
    if freq <= 0 {
        return Err(SchwarzError::config(
            "stateSamplingFreq",
            format!("must be a positive integer, got {freq}"),
        ));
    }

    let problem: ProblemKind = required(raw.problem.as_deref(), "problem")?.parse()?;

    let walls = match required(raw.problem_name.as_deref(), "problemName")? {
        "InsulatedRod" => Walls::Insulated,
        "FixedEnds" => Walls::Fixed,
        other => {
            return Err(SchwarzError::config(
                "problemName",
                format!("invalid problemName '{other}' for {problem} (expected InsulatedRod or FixedEnds)"),
            ));
        }
    };

    let ic_flag = match required(raw.ic_flag, "icFlag")? {
        1 => 1,
        2 => 2,
        other => {
            return Err(SchwarzError::config(
                "icFlag",
                format!("invalid icFlag {other} for {problem} (expected 1 or 2)"),
            ));
        }
    };

    let output_dir = raw
        .output_dir
        .as_deref()
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    Ok(CommonConfig {
        mesh_dir,
        final_time,
        state_sampling_freq: freq as usize,
        problem,
        walls,
        ic_flag,
        output_dir,
    })
}
