//! Outer Schwarz iteration controller.
//!
//! One outer step brings every subdomain from `t` to `t + dtMax` and repeats
//! the sweep over all subdomains until successive sweeps agree:
//!
//! ```text
//! for k in 1..=max_sub_iters
//!     snapshot all states
//!     sweep   (Multiplicative: in visit order, each advance sees the newest neighbors)
//!             (Additive:       all at once, each advance sees only the snapshots)
//!     residual = max_i ||state_i - snapshot_i||_2
//!     stop if residual <= abs_tol + rel_tol * max_i ||snapshot_i||_2
//! ```
//!
//! Hitting `max_sub_iters` is not an error. The step report says
//! `converged: false` and the run carries on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Result, SchwarzError};
use crate::sim::subdomain::{BoundaryView, OuterStep, Subdomain};
use crate::sim::tiling::Tiling;

/// Relative slack allowed when checking that `dtMax / dt` is an integer.
const SUBCYCLE_TOLERANCE: f64 = 1e-9;

/// Subdomain update schedule within one sub-iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    /// Sequential sweep in visit order with immediate propagation.
    #[default]
    Multiplicative,
    /// Concurrent sweep against the previous sub-iteration's data.
    Additive,
}

impl FromStr for ScheduleMode {
    type Err = SchwarzError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Multiplicative" => Ok(ScheduleMode::Multiplicative),
            "Additive" => Ok(ScheduleMode::Additive),
            other => Err(SchwarzError::config(
                "schwarzMode",
                format!("unknown schedule '{other}' (expected Multiplicative or Additive)"),
            )),
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMode::Multiplicative => f.write_str("Multiplicative"),
            ScheduleMode::Additive => f.write_str("Additive"),
        }
    }
}

/// Loop-invariant settings of the sub-iteration loop, passed by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationControl {
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub max_sub_iters: usize,
    pub mode: ScheduleMode,
}

impl IterationControl {
    pub fn new(rel_tol: f64, abs_tol: f64, max_sub_iters: usize, mode: ScheduleMode) -> Result<Self> {
        if !(rel_tol.is_finite() && rel_tol >= 0.0) {
            return Err(SchwarzError::config(
                "relTol",
                format!("must be finite and non-negative, got {rel_tol}"),
            ));
        }
        if !(abs_tol.is_finite() && abs_tol >= 0.0) {
            return Err(SchwarzError::config(
                "absTol",
                format!("must be finite and non-negative, got {abs_tol}"),
            ));
        }
        if max_sub_iters == 0 {
            return Err(SchwarzError::config("convStepMax", "must be at least 1"));
        }
        Ok(Self {
            rel_tol,
            abs_tol,
            max_sub_iters,
            mode,
        })
    }

    fn threshold(&self, reference: f64) -> f64 {
        self.abs_tol + self.rel_tol * reference
    }
}

/// Outcome of one outer step.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Sub-iterations performed, `1..=max_sub_iters`.
    pub sub_iterations: usize,
    /// False when the loop stopped at the cap.
    pub converged: bool,
    /// Residual after each sub-iteration.
    pub residuals: Vec<f64>,
    /// Convergence threshold of the last sub-iteration.
    pub tolerance: f64,
    /// Wall-clock time of the sub-iteration loop.
    pub elapsed: Duration,
    /// Per-advance wall-clock seconds, indexed `[domain][sub_iteration]`.
    pub runtimes: Vec<Vec<f64>>,
}

impl StepReport {
    /// Residual of the last sub-iteration.
    pub fn residual(&self) -> f64 {
        self.residuals.last().copied().unwrap_or(0.0)
    }
}

/// Residual of one sub-iteration, combined across subdomains by maximum.
#[derive(Debug, Clone, Copy)]
struct ConvergenceCheck {
    residual: f64,
    reference: f64,
    /// Subdomain that set `residual`.
    worst: usize,
}

impl ConvergenceCheck {
    fn measure(subdomains: &[Box<dyn Subdomain>], snapshots: &[Vec<f64>]) -> Self {
        let mut check = Self {
            residual: 0.0,
            reference: 0.0,
            worst: 0,
        };
        for (i, (sub, snap)) in subdomains.iter().zip(snapshots).enumerate() {
            let diff = sub
                .state()
                .iter()
                .zip(snap)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            if diff > check.residual {
                check.residual = diff;
                check.worst = i;
            }
            check.reference = check.reference.max(l2_norm(snap));
        }
        check
    }
}

fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Drives the outer Schwarz iteration over a fixed set of subdomains.
pub struct SchwarzController {
    subdomains: Vec<Box<dyn Subdomain>>,
    tiling: Arc<Tiling>,
    dt_max: f64,
    /// Multiplicative visit order (a permutation of `0..n`).
    order: Vec<usize>,
    /// `rank[i]` = position of subdomain `i` in `order`.
    rank: Vec<usize>,
}

impl SchwarzController {
    pub fn new(
        subdomains: Vec<Box<dyn Subdomain>>,
        tiling: Arc<Tiling>,
        dt_vec: Vec<f64>,
    ) -> Result<Self> {
        let n = tiling.count();
        if subdomains.len() != n {
            return Err(SchwarzError::config(
                "subdomains",
                format!("{} subdomain handles for a tiling of {n}", subdomains.len()),
            ));
        }
        if dt_vec.len() != n {
            return Err(SchwarzError::config(
                "timeStepSize",
                format!("{} time steps for {n} subdomains", dt_vec.len()),
            ));
        }
        for (i, &dt) in dt_vec.iter().enumerate() {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(SchwarzError::config(
                    "timeStepSize",
                    format!("subdomain {i} has non-positive time step {dt}"),
                ));
            }
            let own = subdomains[i].dt();
            if (own - dt).abs() > SUBCYCLE_TOLERANCE * dt {
                return Err(SchwarzError::config(
                    "timeStepSize",
                    format!("subdomain {i} steps with {own}, configured {dt}"),
                ));
            }
        }

        let dt_max = dt_vec.iter().copied().fold(0.0, f64::max);
        for (i, &dt) in dt_vec.iter().enumerate() {
            let ratio = dt_max / dt;
            if (ratio - ratio.round()).abs() > SUBCYCLE_TOLERANCE * ratio {
                return Err(SchwarzError::config(
                    "timeStepSize",
                    format!("subdomain {i}: time step {dt} does not divide dtMax {dt_max}"),
                ));
            }
        }

        Ok(Self {
            subdomains,
            tiling,
            dt_max,
            order: (0..n).collect(),
            rank: (0..n).collect(),
        })
    }

    /// Replaces the visiting order. Must be a permutation of the subdomain indices.
    ///
    /// Changes multiplicative results; additive results do not depend on it.
    pub fn with_visit_order(mut self, order: Vec<usize>) -> Result<Self> {
        let n = self.subdomains.len();
        let mut rank = vec![usize::MAX; n];
        if order.len() != n {
            return Err(SchwarzError::config(
                "visitOrder",
                format!("order lists {} subdomains, expected {n}", order.len()),
            ));
        }
        for (pos, &i) in order.iter().enumerate() {
            if i >= n || rank[i] != usize::MAX {
                return Err(SchwarzError::config(
                    "visitOrder",
                    format!("{order:?} is not a permutation of 0..{n}"),
                ));
            }
            rank[i] = pos;
        }
        self.order = order;
        self.rank = rank;
        Ok(self)
    }

    pub fn domain_count(&self) -> usize {
        self.tiling.count()
    }

    pub fn dt_max(&self) -> f64 {
        self.dt_max
    }

    /// Current state of subdomain `domain`.
    ///
    /// # Panics
    ///
    /// If `domain >= self.domain_count()`. Use [`SchwarzController::try_state`]
    /// for an unchecked index.
    pub fn state(&self, domain: usize) -> &[f64] {
        self.subdomains[domain].state()
    }

    pub fn try_state(&self, domain: usize) -> Option<&[f64]> {
        self.subdomains.get(domain).map(|s| s.state())
    }

    /// Runs the sub-iteration loop of outer step `step` starting at `time`.
    ///
    /// The wall clock covers exactly the loop.
    pub fn run_outer_step(
        &mut self,
        step: usize,
        time: f64,
        control: IterationControl,
    ) -> StepReport {
        let n = self.subdomains.len();
        let window = OuterStep {
            index: step,
            time,
            dt: self.dt_max,
        };
        let mut runtimes = vec![Vec::with_capacity(control.max_sub_iters); n];
        let mut residuals = Vec::with_capacity(control.max_sub_iters);
        let mut tolerance = 0.0;
        let mut converged = false;
        let window_start = self.collect_states();

        let start = Instant::now();
        for k in 1..=control.max_sub_iters {
            let snapshots = self.collect_states();

            let sweep_times = match control.mode {
                ScheduleMode::Multiplicative => self.sweep_multiplicative(&window, &window_start),
                ScheduleMode::Additive => self.sweep_additive(&window, &snapshots, &window_start),
            };
            for (row, t) in runtimes.iter_mut().zip(sweep_times) {
                row.push(t);
            }

            let check = ConvergenceCheck::measure(&self.subdomains, &snapshots);
            tolerance = control.threshold(check.reference);
            residuals.push(check.residual);
            debug!(
                step,
                k,
                residual = check.residual,
                tolerance,
                worst = self.subdomains[check.worst].name(),
                "sub-iteration"
            );

            if check.residual <= tolerance {
                converged = true;
                break;
            }
        }
        let elapsed = start.elapsed();

        if !converged {
            let check = ConvergenceCheck::measure(&self.subdomains, &window_start);
            warn!(
                step,
                sub_iterations = control.max_sub_iters,
                residual = residuals.last().copied().unwrap_or(0.0),
                tolerance,
                most_changed = self.subdomains[check.worst].name(),
                "sub-iteration cap reached without convergence"
            );
        }

        StepReport {
            sub_iterations: residuals.len(),
            converged,
            residuals,
            tolerance,
            elapsed,
            runtimes,
        }
    }

    fn collect_states(&self) -> Vec<Vec<f64>> {
        self.subdomains.iter().map(|s| s.state().to_vec()).collect()
    }

    /// Advances subdomains one after another in visit order.
    fn sweep_multiplicative(&mut self, window: &OuterStep, window_start: &[Vec<f64>]) -> Vec<f64> {
        let mut times = vec![0.0; self.subdomains.len()];
        for &i in &self.order {
            let (before, rest) = self.subdomains.split_at_mut(i);
            let Some((current, after)) = rest.split_first_mut() else {
                continue;
            };
            let states = before
                .iter()
                .map(|s| Some(s.state()))
                .chain(std::iter::once(None))
                .chain(after.iter().map(|s| Some(s.state())))
                .collect();
            let boundary = BoundaryView::new(states).with_window_start(window_start);

            let t0 = Instant::now();
            current.advance(window, &boundary);
            times[i] = t0.elapsed().as_secs_f64();
        }
        times
    }

    /// Advances all subdomains concurrently; each sees only `snapshots`.
    fn sweep_additive(
        &mut self,
        window: &OuterStep,
        snapshots: &[Vec<f64>],
        window_start: &[Vec<f64>],
    ) -> Vec<f64> {
        let n = self.subdomains.len();
        let rank = &self.rank;
        let mut dispatch: Vec<(usize, &mut Box<dyn Subdomain>)> =
            self.subdomains.iter_mut().enumerate().collect();
        dispatch.sort_by_key(|(i, _)| rank[*i]);

        let timed: Vec<(usize, f64)> = dispatch
            .into_par_iter()
            .map(|(i, sub)| {
                let boundary = BoundaryView::from_snapshots(snapshots, i).with_window_start(window_start);
                let t0 = Instant::now();
                sub.advance(window, &boundary);
                (i, t0.elapsed().as_secs_f64())
            })
            .collect();

        let mut times = vec![0.0; n];
        for (i, t) in timed {
            times[i] = t;
        }
        times
    }
}
