use std::fmt;
use std::str::FromStr;

use crate::error::SchwarzError;

/// The outer time window a subdomain is asked to cover: `[time, time + dt]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuterStep {
    /// 1-based outer step index.
    pub index: usize,
    /// Global time at the start of the window.
    pub time: f64,
    /// Outer step size (`dtMax`).
    pub dt: f64,
}

/// Read-only view of the other subdomains' states during one advance.
///
/// The entry for the subdomain being advanced is always `None`. The view may
/// also carry every state as it was when the outer window began.
pub struct BoundaryView<'a> {
    states: Vec<Option<&'a [f64]>>,
    window_start: Option<&'a [Vec<f64>]>,
}

impl<'a> BoundaryView<'a> {
    pub fn new(states: Vec<Option<&'a [f64]>>) -> Self {
        Self {
            states,
            window_start: None,
        }
    }

    /// View over frozen copies of every state, hiding `current`.
    pub fn from_snapshots(snapshots: &'a [Vec<f64>], current: usize) -> Self {
        let states = snapshots
            .iter()
            .enumerate()
            .map(|(j, s)| (j != current).then_some(s.as_slice()))
            .collect();
        Self::new(states)
    }

    /// Attaches the states committed at the start of the outer window.
    pub fn with_window_start(mut self, states: &'a [Vec<f64>]) -> Self {
        self.window_start = Some(states);
        self
    }

    /// State of `domain`, or `None` if it is the subdomain being advanced.
    pub fn state(&self, domain: usize) -> Option<&'a [f64]> {
        self.states.get(domain).copied().flatten()
    }

    /// Value of `domain` at `local` when the outer window began.
    pub fn window_start_value(&self, domain: usize, local: usize) -> Option<f64> {
        self.state(domain)?;
        self.window_start?.get(domain)?.get(local).copied()
    }

    /// Single value of `domain`'s state at local index `local`.
    pub fn value(&self, domain: usize, local: usize) -> Option<f64> {
        self.state(domain).and_then(|s| s.get(local).copied())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// A stateful piece of the decomposed problem.
///
/// Implementations own their state vector and know how to bring it from the
/// state committed at the start of an outer step to the end of that step,
/// given the neighbors' current boundary data. Calling [`Subdomain::advance`]
/// again with the same step index redoes the step from the committed state; a
/// new step index commits the current state first.
pub trait Subdomain: Send {
    /// Human-readable identifier for logs.
    fn name(&self) -> &str;

    /// Current state. Its length never changes.
    fn state(&self) -> &[f64];

    /// Own time-step size. `dtMax` must be an integer multiple of it.
    fn dt(&self) -> f64;

    /// Advances over `window`, reading neighbor data from `boundary`.
    fn advance(&mut self, window: &OuterStep, boundary: &BoundaryView<'_>);
}

/// Kind of solve a subdomain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainKind {
    /// Full-order model.
    Fom,
    Galerkin,
    Lspg,
    /// LSPG with hyper-reduction sampling.
    LspgHyper,
}

impl DomainKind {
    pub fn is_rom(&self) -> bool {
        !matches!(self, DomainKind::Fom)
    }

    pub fn is_hyper(&self) -> bool {
        matches!(self, DomainKind::LspgHyper)
    }
}

impl FromStr for DomainKind {
    type Err = SchwarzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOM" => Ok(DomainKind::Fom),
            "Galerkin" => Ok(DomainKind::Galerkin),
            "LSPG" => Ok(DomainKind::Lspg),
            "LSPGHyper" => Ok(DomainKind::LspgHyper),
            other => Err(SchwarzError::config(
                "domainTypes",
                format!("unknown domain type '{other}' (expected FOM, Galerkin, LSPG, LSPGHyper)"),
            )),
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomainKind::Fom => "FOM",
            DomainKind::Galerkin => "Galerkin",
            DomainKind::Lspg => "LSPG",
            DomainKind::LspgHyper => "LSPGHyper",
        };
        f.write_str(s)
    }
}
