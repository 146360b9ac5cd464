//! Built-in 1D heat problem: physical walls, initial pulses, and assembly of
//! rod subdomains over a tiling.

use tracing::debug;

use crate::error::{Result, SchwarzError};
use crate::io::mesh::MeshInfo;
use crate::sim::heat_transfer::boundary::BoundaryCondition;
use crate::sim::heat_transfer::ghosts::{EndSource, GhostLink, InterfaceGhosts};
use crate::sim::heat_transfer::mesh_1d::{RodEnd, build_rod_mesh};
use crate::sim::heat_transfer::rom::{ReducedModel, RomRodSubdomain};
use crate::sim::heat_transfer::solver::{OdeScheme, RodSolver};
use crate::sim::heat_transfer::subdomain::RodSubdomain;
use crate::sim::subdomain::Subdomain;
use crate::sim::tiling::Tiling;

/// Condition at both physical ends of the rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walls {
    /// `InsulatedRod`: zero flux.
    Insulated,
    /// `FixedEnds`: held at zero.
    Fixed,
}

impl Walls {
    pub fn condition(&self) -> BoundaryCondition {
        match self {
            Walls::Insulated => BoundaryCondition::Insulated,
            Walls::Fixed => BoundaryCondition::Dirichlet { value: 0.0 },
        }
    }
}

/// `magnitude * exp(-((x - center) / width)^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPulse {
    pub magnitude: f64,
    pub center: f64,
    pub width: f64,
}

impl GaussianPulse {
    pub fn value(&self, x: f64) -> f64 {
        let s = (x - self.center) / self.width;
        self.magnitude * (-s * s).exp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialCondition {
    /// `icFlag: 1`
    Pulse(GaussianPulse),
    /// `icFlag: 2`
    TwoPulses(GaussianPulse, GaussianPulse),
}

impl InitialCondition {
    pub fn value(&self, x: f64) -> f64 {
        match self {
            InitialCondition::Pulse(p) => p.value(x),
            InitialCondition::TwoPulses(a, b) => a.value(x) + b.value(x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatProblem {
    pub diffusivity: f64,
    pub walls: Walls,
    pub initial: InitialCondition,
}

impl HeatProblem {
    /// Initial values sampled at the centroids of global cells `cells`.
    pub fn initial_values(&self, mesh: &MeshInfo, cells: std::ops::Range<usize>) -> Vec<f64> {
        cells.map(|c| self.initial.value(mesh.centroid(c))).collect()
    }
}

/// Builds one rod segment per tiling range: full order where `models[i]` is
/// `None`, reduced order on its trial space otherwise.
///
/// Every interface end reads its ghost value from the first cell beyond the
/// local range, as held by the nearest overlapping neighbor.
pub fn build_subdomains(
    problem: &HeatProblem,
    mesh: &MeshInfo,
    tiling: &Tiling,
    dt_vec: &[f64],
    schemes: &[OdeScheme],
    models: Vec<Option<ReducedModel>>,
) -> Result<Vec<Box<dyn Subdomain>>> {
    let n = tiling.count();
    if dt_vec.len() != n || schemes.len() != n || models.len() != n {
        return Err(SchwarzError::config(
            "decomp",
            format!(
                "per-domain settings for {} / {} / {} domains, tiling has {n}",
                dt_vec.len(),
                schemes.len(),
                models.len()
            ),
        ));
    }
    if tiling.cells() != mesh.cells {
        return Err(SchwarzError::config(
            "tiling",
            format!("tiling covers {} cells, mesh has {}", tiling.cells(), mesh.cells),
        ));
    }

    let wall = problem.walls.condition();
    let mut subdomains: Vec<Box<dyn Subdomain>> = Vec::with_capacity(n);
    for (i, model) in models.into_iter().enumerate() {
        let range = tiling.range(i);

        let left_ghost = range.start.checked_sub(1);
        let right_ghost = (range.end < mesh.cells).then_some(range.end);
        let left = end_source(tiling, i, left_ghost, wall)?;
        let right = end_source(tiling, i, right_ghost, wall)?;

        let ghost_init = [
            left_ghost.map_or(0.0, |c| problem.initial.value(mesh.centroid(c))),
            right_ghost.map_or(0.0, |c| problem.initial.value(mesh.centroid(c))),
        ];

        let rod_mesh = build_rod_mesh(
            range.len(),
            mesh.dx(),
            problem.diffusivity,
            rod_end(&left),
            rod_end(&right),
        );
        let solver = RodSolver::new(rod_mesh, schemes[i], problem.initial_values(mesh, range.clone()));
        debug!(
            domain = i,
            cells = ?range,
            ?left,
            ?right,
            scheme = %schemes[i],
            modes = model.as_ref().map(|m| m.space.modes()),
            "built rod subdomain"
        );

        let sub: Box<dyn Subdomain> = match model {
            None => Box::new(RodSubdomain::new(format!("rod[{i}]"), solver, dt_vec[i], left, right, ghost_init)),
            Some(model) => Box::new(RomRodSubdomain::new(
                format!("rom[{i}]"),
                solver,
                model.space,
                model.projection,
                dt_vec[i],
                InterfaceGhosts::new(left, right, ghost_init),
            )?),
        };
        subdomains.push(sub);
    }
    Ok(subdomains)
}

fn monolithic_solver(problem: &HeatProblem, mesh: &MeshInfo, scheme: OdeScheme) -> RodSolver {
    let rod_mesh = build_rod_mesh(mesh.cells, mesh.dx(), problem.diffusivity, RodEnd::Wall, RodEnd::Wall);
    RodSolver::new(rod_mesh, scheme, problem.initial_values(mesh, 0..mesh.cells))
}

/// Single rod covering the whole mesh, walls on both ends.
pub fn build_monolithic(problem: &HeatProblem, mesh: &MeshInfo, dt: f64, scheme: OdeScheme) -> RodSubdomain {
    let wall = EndSource::Wall(problem.walls.condition());
    RodSubdomain::new("rod", monolithic_solver(problem, mesh, scheme), dt, wall, wall, [0.0, 0.0])
}

/// Reduced-order counterpart of [`build_monolithic`].
pub fn build_monolithic_rom(
    problem: &HeatProblem,
    mesh: &MeshInfo,
    dt: f64,
    scheme: OdeScheme,
    model: ReducedModel,
) -> Result<RomRodSubdomain> {
    let wall = EndSource::Wall(problem.walls.condition());
    RomRodSubdomain::new(
        "rom",
        monolithic_solver(problem, mesh, scheme),
        model.space,
        model.projection,
        dt,
        InterfaceGhosts::new(wall, wall, [0.0, 0.0]),
    )
}

fn end_source(tiling: &Tiling, domain: usize, ghost: Option<usize>, wall: BoundaryCondition) -> Result<EndSource> {
    let Some(cell) = ghost else {
        return Ok(EndSource::Wall(wall));
    };
    let (neighbor, local) = tiling.locate_in_neighbor(domain, cell).ok_or_else(|| {
        SchwarzError::config(
            "tiling",
            format!("domain {domain}: ghost cell {cell} is not held by any neighbor"),
        )
    })?;
    Ok(EndSource::Neighbor(GhostLink {
        domain: neighbor,
        local,
    }))
}

fn rod_end(source: &EndSource) -> RodEnd {
    match source {
        EndSource::Wall(_) => RodEnd::Wall,
        EndSource::Neighbor(_) => RodEnd::Interface,
    }
}
