use std::fmt;
use std::str::FromStr;

use crate::error::SchwarzError;
use crate::sim::heat_transfer::boundary::{BoundaryCondition, RodBoundary};
use crate::sim::heat_transfer::mesh::{BOUNDARY, FvmMesh};

/// Implicit time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdeScheme {
    /// Backward Euler.
    Bdf1,
    CrankNicolson,
    /// Second-order backward difference. The first step uses BDF1.
    Bdf2,
}

impl FromStr for OdeScheme {
    type Err = SchwarzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BDF1" => Ok(OdeScheme::Bdf1),
            "CrankNicolson" => Ok(OdeScheme::CrankNicolson),
            "BDF2" => Ok(OdeScheme::Bdf2),
            other => Err(SchwarzError::config(
                "odeScheme",
                format!("unknown scheme '{other}' (expected BDF1, CrankNicolson, BDF2)"),
            )),
        }
    }
}

impl fmt::Display for OdeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OdeScheme::Bdf1 => "BDF1",
            OdeScheme::CrankNicolson => "CrankNicolson",
            OdeScheme::Bdf2 => "BDF2",
        };
        f.write_str(s)
    }
}

/// Saved solver state, enough to redo a step exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RodSolverSnapshot {
    values: Vec<f64>,
    previous: Option<Vec<f64>>,
}

/// 1D FVM conduction solver for `du/dt = alpha * u_xx`.
///
/// Assembles a tridiagonal system each step and solves it with the Thomas
/// algorithm.
#[derive(Debug, Clone)]
pub struct RodSolver {
    mesh: FvmMesh,
    scheme: OdeScheme,
    values: Vec<f64>,
    /// Values one step back, kept for BDF2.
    previous: Option<Vec<f64>>,
}

impl RodSolver {
    pub fn new(mesh: FvmMesh, scheme: OdeScheme, initial: Vec<f64>) -> Self {
        debug_assert_eq!(mesh.cells.len(), initial.len());
        Self {
            mesh,
            scheme,
            values: initial,
            previous: None,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Integral of the solution over the segment.
    pub fn total_content(&self) -> f64 {
        self.mesh
            .cells
            .iter()
            .zip(&self.values)
            .map(|(c, u)| c.capacity() * u)
            .sum()
    }

    pub fn snapshot(&self) -> RodSolverSnapshot {
        RodSolverSnapshot {
            values: self.values.clone(),
            previous: self.previous.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: &RodSolverSnapshot) {
        self.values.clone_from(&snapshot.values);
        self.previous.clone_from(&snapshot.previous);
    }

    /// Advance one time step of size `dt`.
    ///
    /// `old` holds the boundary values at the start of the step (used by
    /// Crank-Nicolson only), `new` those at the end.
    pub fn step(&mut self, dt: f64, old: &RodBoundary, new: &RodBoundary) -> &[f64] {
        let next = self.assemble(dt, old, new).solve();
        self.accept(next);
        &self.values
    }

    /// Implicit system of one step from the current values.
    pub fn assemble(&self, dt: f64, old: &RodBoundary, new: &RodBoundary) -> TridiagonalSystem {
        let n = self.values.len();
        let mut sys = TridiagonalSystem::zeros(n);
        if n == 0 {
            return sys;
        }

        let scheme = match (self.scheme, &self.previous) {
            (OdeScheme::Bdf2, None) => OdeScheme::Bdf1,
            (s, _) => s,
        };

        // Weight of the implicit operator.
        let w = match scheme {
            OdeScheme::CrankNicolson => 0.5,
            OdeScheme::Bdf1 | OdeScheme::Bdf2 => 1.0,
        };

        let explicit = match scheme {
            OdeScheme::CrankNicolson => Some(self.net_inflow(old)),
            _ => None,
        };

        for i in 0..n {
            let cap = self.mesh.cells[i].capacity() / dt;
            match (scheme, &self.previous) {
                (OdeScheme::Bdf2, Some(prev)) => {
                    sys.diag[i] += 1.5 * cap;
                    sys.rhs[i] += cap * (2.0 * self.values[i] - 0.5 * prev[i]);
                }
                _ => {
                    sys.diag[i] += cap;
                    sys.rhs[i] += cap * self.values[i];
                }
            }
            if let Some(flux) = &explicit {
                sys.rhs[i] += 0.5 * flux[i];
            }
        }

        for face in &self.mesh.faces {
            if face.cell_left == BOUNDARY || face.cell_right == BOUNDARY {
                continue;
            }
            let il = face.cell_left;
            let ir = face.cell_right;
            let k = w * face.conductance;
            sys.diag[il] += k;
            sys.diag[ir] += k;
            if ir == il + 1 {
                sys.upper[il] -= k;
                sys.lower[ir] -= k;
            }
        }

        if let Some(fi) = self.mesh.left_boundary_face() {
            let face = &self.mesh.faces[fi];
            apply_bc(&new.left, face.cell_right, w * face.conductance, &mut sys);
        }
        if let Some(fi) = self.mesh.right_boundary_face() {
            let face = &self.mesh.faces[fi];
            apply_bc(&new.right, face.cell_left, w * face.conductance, &mut sys);
        }
        sys
    }

    /// Replaces the values and forgets the step history.
    pub fn reset(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values = values;
        self.previous = None;
    }

    /// Makes `next` the current values; the current ones become the history.
    pub fn accept(&mut self, next: Vec<f64>) {
        debug_assert_eq!(next.len(), self.values.len());
        let old_values = std::mem::replace(&mut self.values, next);
        self.previous = Some(old_values);
    }

    /// Net inflow into each cell for the current values under `bc`.
    fn net_inflow(&self, bc: &RodBoundary) -> Vec<f64> {
        let u = &self.values;
        let mut r = vec![0.0; u.len()];
        for face in &self.mesh.faces {
            match (face.cell_left, face.cell_right) {
                (BOUNDARY, cell) => r[cell] += boundary_inflow(&bc.left, face.conductance, u[cell]),
                (cell, BOUNDARY) => r[cell] += boundary_inflow(&bc.right, face.conductance, u[cell]),
                (il, ir) => {
                    let q = face.conductance * (u[ir] - u[il]);
                    r[il] += q;
                    r[ir] -= q;
                }
            }
        }
        r
    }
}

fn boundary_inflow(bc: &BoundaryCondition, conductance: f64, u_cell: f64) -> f64 {
    match bc {
        BoundaryCondition::Insulated => 0.0,
        BoundaryCondition::Dirichlet { value } => conductance * (value - u_cell),
    }
}

fn apply_bc(bc: &BoundaryCondition, cell_idx: usize, conductance: f64, sys: &mut TridiagonalSystem) {
    match bc {
        BoundaryCondition::Insulated => {}
        BoundaryCondition::Dirichlet { value } => {
            sys.diag[cell_idx] += conductance;
            sys.rhs[cell_idx] += conductance * value;
        }
    }
}

/// `lower[i]*u[i-1] + diag[i]*u[i] + upper[i]*u[i+1] = rhs[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalSystem {
    pub lower: Vec<f64>,
    pub diag: Vec<f64>,
    pub upper: Vec<f64>,
    pub rhs: Vec<f64>,
}

impl TridiagonalSystem {
    fn zeros(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
            rhs: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// Matrix-vector product with the left-hand side.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let n = self.len();
        (0..n)
            .map(|i| {
                let mut y = self.diag[i] * x[i];
                if i > 0 {
                    y += self.lower[i] * x[i - 1];
                }
                if i + 1 < n {
                    y += self.upper[i] * x[i + 1];
                }
                y
            })
            .collect()
    }

    /// `rhs - A x`
    pub fn residual(&self, x: &[f64]) -> Vec<f64> {
        self.apply(x)
            .iter()
            .zip(&self.rhs)
            .map(|(ax, b)| b - ax)
            .collect()
    }

    pub fn solve(mut self) -> Vec<f64> {
        thomas_solve(&self.lower, &mut self.diag, &self.upper, &mut self.rhs);
        self.rhs
    }
}

/// Solve a tridiagonal system in place. The solution ends up in `d`.
fn thomas_solve(a: &[f64], b: &mut [f64], c: &[f64], d: &mut [f64]) {
    let n = b.len();
    if n == 0 {
        return;
    }

    // Forward sweep
    for i in 1..n {
        if b[i - 1].abs() < 1e-30 {
            continue;
        }
        let w = a[i] / b[i - 1];
        b[i] -= w * c[i - 1];
        d[i] -= w * d[i - 1];
    }

    // Back substitution
    d[n - 1] /= b[n - 1];
    for i in (0..n - 1).rev() {
        d[i] = (d[i] - c[i] * d[i + 1]) / b[i];
    }
}
