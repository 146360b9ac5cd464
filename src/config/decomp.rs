use std::path::PathBuf;

use serde::Deserialize;

use crate::config::RawInput;
use crate::error::{Result, SchwarzError, required};
use crate::sim::heat_transfer::OdeScheme;
use crate::sim::schwarz::{IterationControl, ScheduleMode};
use crate::sim::subdomain::DomainKind;

const DEFAULT_TOLERANCE: f64 = 1e-11;
const DEFAULT_CONV_STEP_MAX: i64 = 10;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawDecomp {
    #[serde(default)]
    pub domain_types: Option<Vec<String>>,
    #[serde(default)]
    pub time_step_size: Option<Vec<f64>>,
    #[serde(default)]
    pub ode_scheme: Option<Vec<String>>,
    #[serde(default)]
    pub schwarz_mode: Option<String>,
    #[serde(default)]
    pub additive: Option<bool>,
    #[serde(default)]
    pub rel_tol: Option<f64>,
    #[serde(default)]
    pub abs_tol: Option<f64>,
    #[serde(default)]
    pub conv_step_max: Option<i64>,
    #[serde(default)]
    pub num_threads: Option<i64>,
    #[serde(default)]
    pub num_modes: Option<Vec<i64>>,
    #[serde(default)]
    pub basis_file_root: Option<String>,
    #[serde(default)]
    pub trans_file_root: Option<String>,
    #[serde(default)]
    pub sample_file_root: Option<String>,
}

/// Reduced-order settings shared by all ROM subdomains.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompRomConfig {
    /// Modes per domain; FOM entries are ignored.
    pub num_modes: Vec<usize>,
    pub basis_file_root: PathBuf,
    pub trans_file_root: PathBuf,
    /// Sampled local cells of each `LSPGHyper` domain, read from `{root}_{i}.txt`.
    pub sample_file_root: Option<PathBuf>,
}

/// `decomp:` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompConfig {
    pub kinds: Vec<DomainKind>,
    pub dt_vec: Vec<f64>,
    pub schemes: Vec<OdeScheme>,
    pub control: IterationControl,
    /// Worker threads for additive sweeps. `None` uses rayon's default pool.
    pub num_threads: Option<usize>,
    pub rom: Option<DecompRomConfig>,
}

impl DecompConfig {
    pub fn domain_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn has_rom(&self) -> bool {
        self.kinds.iter().any(DomainKind::is_rom)
    }
}

/// Parses the `decomp:` section. Per-domain lists fall back to the top-level
/// scalar when absent.
pub fn parse_decomp(raw: &RawInput) -> Result<Option<DecompConfig>> {
    let Some(d) = &raw.decomp else {
        return Ok(None);
    };

    let kinds = required(d.domain_types.as_ref(), "decomp.domainTypes")?
        .iter()
        .map(|s| s.parse::<DomainKind>())
        .collect::<Result<Vec<_>>>()?;
    let n = kinds.len();
    if n < 2 {
        return Err(SchwarzError::config(
            "decomp.domainTypes",
            format!("fewer than 2 subdomains ({n})"),
        ));
    }

    let dt_vec = match (&d.time_step_size, raw.time_step_size) {
        (Some(list), _) => per_domain(list.clone(), n, "decomp.timeStepSize")?,
        (None, Some(dt)) => vec![dt; n],
        (None, None) => return Err(SchwarzError::config("timeStepSize", "missing")),
    };
    for (i, dt) in dt_vec.iter().enumerate() {
        if !(dt.is_finite() && *dt > 0.0) {
            return Err(SchwarzError::config(
                "decomp.timeStepSize",
                format!("domain {i}: must be positive, got {dt}"),
            ));
        }
    }

    let schemes = match (&d.ode_scheme, &raw.ode_scheme) {
        (Some(list), _) => per_domain(list.clone(), n, "decomp.odeScheme")?
            .iter()
            .map(|s| s.parse::<OdeScheme>())
            .collect::<Result<Vec<_>>>()?,
        (None, Some(s)) => vec![s.parse::<OdeScheme>()?; n],
        (None, None) => return Err(SchwarzError::config("odeScheme", "missing")),
    };

    let mode = resolve_mode(d.schwarz_mode.as_deref(), d.additive)?;

    let conv_step_max = d.conv_step_max.unwrap_or(DEFAULT_CONV_STEP_MAX);
    if conv_step_max < 1 {
        return Err(SchwarzError::config(
            "convStepMax",
            format!("must be at least 1, got {conv_step_max}"),
        ));
    }
    let control = IterationControl::new(
        d.rel_tol.unwrap_or(DEFAULT_TOLERANCE),
        d.abs_tol.unwrap_or(DEFAULT_TOLERANCE),
        conv_step_max as usize,
        mode,
    )?;

    let num_threads = match d.num_threads {
        Some(t) if t < 1 => {
            return Err(SchwarzError::config(
                "decomp.numThreads",
                format!("must be at least 1, got {t}"),
            ));
        }
        other => other.map(|t| t as usize),
    };

    let rom = if kinds.iter().any(DomainKind::is_rom) {
        let modes = per_domain(
            required(d.num_modes.clone(), "decomp.numModes")?,
            n,
            "decomp.numModes",
        )?;
        let mut num_modes = Vec::with_capacity(n);
        for (i, (m, kind)) in modes.iter().zip(&kinds).enumerate() {
            if kind.is_rom() && *m <= 0 {
                return Err(SchwarzError::config(
                    "decomp.numModes",
                    format!("domain {i} ({kind}) needs a positive mode count, got {m}"),
                ));
            }
            num_modes.push((*m).max(0) as usize);
        }
        Some(DecompRomConfig {
            num_modes,
            basis_file_root: required(d.basis_file_root.as_deref(), "decomp.basisFileRoot")?.into(),
            trans_file_root: required(d.trans_file_root.as_deref(), "decomp.transFileRoot")?.into(),
            sample_file_root: if kinds.iter().any(DomainKind::is_hyper) {
                Some(required(d.sample_file_root.as_deref(), "decomp.sampleFileRoot")?.into())
            } else {
                None
            },
        })
    } else {
        None
    };

    Ok(Some(DecompConfig {
        kinds,
        dt_vec,
        schemes,
        control,
        num_threads,
        rom,
    }))
}

fn per_domain<T>(list: Vec<T>, n: usize, field: &str) -> Result<Vec<T>> {
    if list.len() != n {
        return Err(SchwarzError::config(
            field,
            format!("{} entries for {n} subdomains", list.len()),
        ));
    }
    Ok(list)
}

/// `schwarzMode` wins; `additive: true|false` is accepted when it agrees.
fn resolve_mode(name: Option<&str>, additive: Option<bool>) -> Result<ScheduleMode> {
    let from_flag = additive.map(|a| {
        if a {
            ScheduleMode::Additive
        } else {
            ScheduleMode::Multiplicative
        }
    });
    match (name.map(str::parse::<ScheduleMode>).transpose()?, from_flag) {
        (Some(m), Some(f)) if m != f => Err(SchwarzError::config(
            "decomp.additive",
            format!("additive: {} contradicts schwarzMode: {m}", f == ScheduleMode::Additive),
        )),
        (Some(m), _) => Ok(m),
        (None, Some(f)) => Ok(f),
        (None, None) => Ok(ScheduleMode::default()),
    }
}
