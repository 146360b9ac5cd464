use std::collections::HashMap;

use serde_json::Value;

use crate::config::common::CommonConfig;
use crate::error::{Result, SchwarzError};
use crate::sim::heat_transfer::{GaussianPulse, HeatProblem, InitialCondition};

fn param(params: &HashMap<String, Value>, name: &str) -> Result<f64> {
    let value = params
        .get(name)
        .ok_or_else(|| SchwarzError::config(name, "missing"))?;
    value
        .as_f64()
        .ok_or_else(|| SchwarzError::config(name, format!("must be a number, got {value}")))
}

fn positive(params: &HashMap<String, Value>, name: &str) -> Result<f64> {
    let v = param(params, name)?;
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(SchwarzError::config(name, format!("must be positive, got {v}")))
    }
}

/// Reads the physical parameters the selected problem and `icFlag` need.
pub fn parse_problem(common: &CommonConfig, params: &HashMap<String, Value>) -> Result<HeatProblem> {
    let diffusivity = positive(params, "diffusivity")?;
    let width = positive(params, "pulseWidth")?;

    let initial = match common.ic_flag {
        1 => InitialCondition::Pulse(GaussianPulse {
            magnitude: param(params, "pulseMagnitude")?,
            center: param(params, "pulseX")?,
            width,
        }),
        2 => InitialCondition::TwoPulses(
            GaussianPulse {
                magnitude: param(params, "pulseMagnitude1")?,
                center: param(params, "pulseX1")?,
                width,
            },
            GaussianPulse {
                magnitude: param(params, "pulseMagnitude2")?,
                center: param(params, "pulseX2")?,
                width,
            },
        ),
        other => {
            return Err(SchwarzError::config(
                "icFlag",
                format!("invalid icFlag {other}"),
            ));
        }
    };

    Ok(HeatProblem {
        diffusivity,
        walls: common.walls,
        initial,
    })
}
