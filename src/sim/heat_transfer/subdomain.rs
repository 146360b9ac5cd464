use crate::sim::heat_transfer::ghosts::{EndSource, InterfaceGhosts, commit_or_restore, substeps};
use crate::sim::heat_transfer::solver::{RodSolver, RodSolverSnapshot};
use crate::sim::subdomain::{BoundaryView, OuterStep, Subdomain};

/// Full-order rod segment coupled to its neighbors through Dirichlet ghosts.
pub struct RodSubdomain {
    name: String,
    solver: RodSolver,
    dt: f64,
    ghosts: InterfaceGhosts,
    /// Outer step index and solver state at the start of that step.
    committed: Option<(usize, RodSolverSnapshot)>,
}

impl RodSubdomain {
    /// `ghost_init` holds the initial ghost values (ignored at walls).
    pub fn new(
        name: impl Into<String>,
        solver: RodSolver,
        dt: f64,
        left: EndSource,
        right: EndSource,
        ghost_init: [f64; 2],
    ) -> Self {
        Self {
            name: name.into(),
            solver,
            dt,
            ghosts: InterfaceGhosts::new(left, right, ghost_init),
            committed: None,
        }
    }
}

impl Subdomain for RodSubdomain {
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
        match commit_or_restore(&mut self.committed, window, || self.solver.snapshot()) {
            Some(saved) => self.solver.restore(saved),
            None => self.ghosts.begin_window(boundary),
        }
        self.ghosts.end_values(boundary);

        let n = substeps(window, self.dt);
        for k in 0..n {
            let old = self.ghosts.boundary_at(k as f64 / n as f64);
            let new = self.ghosts.boundary_at((k + 1) as f64 / n as f64);
            self.solver.step(self.dt, &old, &new);
        }
    }
}
