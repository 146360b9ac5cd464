//! Projection-based reduced-order rod segments.
//!
//! The full state is approximated in an affine trial space,
//! `u ≈ shift + basis * q`, and each implicit step `A u = b` of the
//! full-order solver is reduced to a small dense system for `q`:
//!
//! ```text
//! Galerkin:  basisᵀ A basis q = basisᵀ (b - A shift)
//! LSPG:      min_q || P (A (shift + basis q) - b) ||₂
//! ```
//!
//! `P` keeps all rows, or only the sampled cells under hyper-reduction. The
//! step operator is linear, so one Gauss-Newton iteration solves LSPG exactly;
//! it is done through the normal equations.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::error::{Result, SchwarzError};
use crate::sim::heat_transfer::ghosts::{InterfaceGhosts, commit_or_restore, substeps};
use crate::sim::heat_transfer::solver::{RodSolver, RodSolverSnapshot, TridiagonalSystem};
use crate::sim::subdomain::{BoundaryView, OuterStep, Subdomain};

/// Affine trial space `shift + span(basis)`.
///
/// Basis columns are expected to be orthonormal; the initial condition is
/// projected with `basisᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSpace {
    basis: DMatrix<f64>,
    shift: DVector<f64>,
}

impl TrialSpace {
    pub fn new(basis: DMatrix<f64>, shift: DVector<f64>) -> Result<Self> {
        if basis.nrows() != shift.len() {
            return Err(SchwarzError::config(
                "transFile",
                format!(
                    "shift has {} entries, basis has {} rows",
                    shift.len(),
                    basis.nrows()
                ),
            ));
        }
        if basis.ncols() == 0 || basis.ncols() > basis.nrows() {
            return Err(SchwarzError::config(
                "numModes",
                format!("{} modes for a state of {}", basis.ncols(), basis.nrows()),
            ));
        }
        Ok(Self { basis, shift })
    }

    /// Full-order state length.
    pub fn cells(&self) -> usize {
        self.basis.nrows()
    }

    pub fn modes(&self) -> usize {
        self.basis.ncols()
    }

    /// Reduced coordinates of `full`.
    pub fn project(&self, full: &[f64]) -> DVector<f64> {
        let centered = DVector::from_column_slice(full) - &self.shift;
        self.basis.tr_mul(&centered)
    }

    pub fn reconstruct(&self, reduced: &DVector<f64>) -> Vec<f64> {
        (&self.shift + &self.basis * reduced).as_slice().to_vec()
    }
}

/// How the reduced step equations are formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Galerkin,
    /// Least-squares Petrov-Galerkin. `sample` restricts the residual to those
    /// local cells (hyper-reduction); `None` keeps every cell.
    Lspg { sample: Option<Vec<usize>> },
}

impl Projection {
    /// Reduced update `q` for one assembled full-order step.
    fn solve(&self, space: &TrialSpace, sys: &TridiagonalSystem) -> Option<DVector<f64>> {
        let n = space.cells();
        let mut a_basis = DMatrix::<f64>::zeros(n, space.modes());
        for (j, column) in space.basis.column_iter().enumerate() {
            let col: Vec<f64> = column.iter().copied().collect();
            for (i, v) in sys.apply(&col).into_iter().enumerate() {
                a_basis[(i, j)] = v;
            }
        }
        let r0 = DVector::from_vec(sys.residual(space.shift.as_slice()));

        match self {
            Projection::Galerkin => {
                let lhs = space.basis.tr_mul(&a_basis);
                let rhs = space.basis.tr_mul(&r0);
                lhs.lu().solve(&rhs)
            }
            Projection::Lspg { sample } => {
                let (j, r) = match sample {
                    Some(rows) => (a_basis.select_rows(rows.iter()), r0.select_rows(rows.iter())),
                    None => (a_basis, r0),
                };
                let lhs = j.tr_mul(&j);
                let rhs = j.tr_mul(&r);
                match lhs.clone().cholesky() {
                    Some(chol) => Some(chol.solve(&rhs)),
                    None => lhs.lu().solve(&rhs),
                }
            }
        }
    }
}

/// Trial space and projection of one reduced-order segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedModel {
    pub space: TrialSpace,
    pub projection: Projection,
}

/// Checks that `stencil` holds every sampled cell and its neighbors.
pub fn check_stencil(sample: &[usize], stencil: &[usize], cells: usize) -> Result<()> {
    let have: HashSet<usize> = stencil.iter().copied().collect();
    for &s in sample {
        let needed = s.saturating_sub(1)..=(s + 1).min(cells.saturating_sub(1));
        if let Some(missing) = needed.into_iter().find(|c| !have.contains(c)) {
            return Err(SchwarzError::config(
                "stencilFile",
                format!("cell {missing} next to sampled cell {s} is not in the stencil"),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct RomSnapshot {
    solver: RodSolverSnapshot,
    reduced: DVector<f64>,
}

/// Reduced-order rod segment. Its visible state is the reconstructed full
/// state, so neighbors couple to it exactly as to a full-order segment.
pub struct RomRodSubdomain {
    name: String,
    /// Assembles the full-order step and keeps the reconstructed history.
    solver: RodSolver,
    space: TrialSpace,
    projection: Projection,
    reduced: DVector<f64>,
    dt: f64,
    ghosts: InterfaceGhosts,
    committed: Option<(usize, RomSnapshot)>,
}

impl RomRodSubdomain {
    /// Projects the solver's initial values onto `space` and starts from
    /// their reconstruction.
    pub fn new(
        name: impl Into<String>,
        mut solver: RodSolver,
        space: TrialSpace,
        projection: Projection,
        dt: f64,
        ghosts: InterfaceGhosts,
    ) -> Result<Self> {
        let name = name.into();
        if space.cells() != solver.values().len() {
            return Err(SchwarzError::config(
                "basisFile",
                format!(
                    "{name}: basis has {} rows, segment has {} cells",
                    space.cells(),
                    solver.values().len()
                ),
            ));
        }
        if let Projection::Lspg { sample: Some(rows) } = &projection {
            if rows.len() < space.modes() || rows.iter().any(|&r| r >= space.cells()) {
                return Err(SchwarzError::config(
                    "sampleFile",
                    format!(
                        "{name}: {} sample cells for {} modes on {} cells",
                        rows.len(),
                        space.modes(),
                        space.cells()
                    ),
                ));
            }
        }

        let reduced = space.project(solver.values());
        solver.reset(space.reconstruct(&reduced));
        Ok(Self {
            name,
            solver,
            space,
            projection,
            reduced,
            dt,
            ghosts,
            committed: None,
        })
    }

    /// Current reduced coordinates.
    pub fn reduced_state(&self) -> &DVector<f64> {
        &self.reduced
    }

    fn step(&mut self, theta_old: f64, theta_new: f64) {
        let old = self.ghosts.boundary_at(theta_old);
        let new = self.ghosts.boundary_at(theta_new);
        let sys = self.solver.assemble(self.dt, &old, &new);
        match self.projection.solve(&self.space, &sys) {
            Some(q) => {
                self.solver.accept(self.space.reconstruct(&q));
                self.reduced = q;
            }
            None => {
                warn!(subdomain = %self.name, "singular reduced system, state held");
                self.solver.accept(self.solver.values().to_vec());
            }
        }
    }
}

impl Subdomain for RomRodSubdomain {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &[f64] {
        self.solver.values()
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn advance(&mut self, window: &OuterStep, boundary: &BoundaryView<'_>) {
        let save = || RomSnapshot {
            solver: self.solver.snapshot(),
            reduced: self.reduced.clone(),
        };
        match commit_or_restore(&mut self.committed, window, save) {
            Some(saved) => {
                self.solver.restore(&saved.solver);
                self.reduced.clone_from(&saved.reduced);
            }
            None => self.ghosts.begin_window(boundary),
        }
        self.ghosts.end_values(boundary);

        let n = substeps(window, self.dt);
        for k in 0..n {
            self.step(k as f64 / n as f64, (k + 1) as f64 / n as f64);
        }
    }
}
