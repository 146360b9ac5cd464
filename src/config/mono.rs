use crate::config::RawInput;
use crate::error::{Result, SchwarzError};
use crate::sim::heat_transfer::OdeScheme;

/// Top-level `timeStepSize` and `odeScheme`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStepping {
    pub dt: f64,
    pub scheme: OdeScheme,
}

/// Parses the top-level stepping fields. Absence is not an error here; the
/// monolithic path checks for it once all sections are known.
pub fn parse_stepping(raw: &RawInput) -> Result<Option<TimeStepping>> {
    let dt = match raw.time_step_size {
        Some(dt) if !(dt.is_finite() && dt > 0.0) => {
            return Err(SchwarzError::config(
                "timeStepSize",
                format!("must be positive, got {dt}"),
            ));
        }
        other => other,
    };
    let scheme = raw.ode_scheme.as_deref().map(str::parse::<OdeScheme>).transpose()?;

    Ok(match (dt, scheme) {
        (Some(dt), Some(scheme)) => Some(TimeStepping { dt, scheme }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_parsed_and_checked() {
        let raw = RawInput {
            time_step_size: Some(0.5),
            ode_scheme: Some("CrankNicolson".into()),
            ..Default::default()
        };
        let s = parse_stepping(&raw).unwrap().unwrap();
        assert_eq!(s.scheme, OdeScheme::CrankNicolson);

        let raw = RawInput {
            time_step_size: Some(-0.5),
            ..Default::default()
        };
        assert!(parse_stepping(&raw).is_err());

        let raw = RawInput {
            ode_scheme: Some("Euler".into()),
            ..Default::default()
        };
        assert!(parse_stepping(&raw).is_err());
    }
}
