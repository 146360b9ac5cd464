//! Finite Volume Method (FVM) conduction on a 1D rod.
//!
//! The built-in subdomains used by the Schwarz driver.
//!
//! # Architecture
//!
//! ```text
//! MeshInfo + Tiling ──► build_rod_mesh() ──► FvmMesh ──► RodSolver ──► TridiagonalSystem
//!                                                          │
//!                  RodSubdomain     (full order: Thomas solve)
//!                  RomRodSubdomain  (trial space: Galerkin / LSPG reduced solve)
//!                        └── InterfaceGhosts, commit/restore, sub-cycling
//! ```
//!
//! The solver sees only cells and faces. Whether a boundary face ends at a
//! wall or at a ghost cell of a neighboring subdomain is decided when the
//! mesh is built.

pub mod boundary;
pub mod ghosts;
pub mod mesh;
pub mod mesh_1d;
pub mod problem;
pub mod rom;
pub mod solver;
pub mod subdomain;

pub use boundary::{BoundaryCondition, RodBoundary};
pub use ghosts::{EndSource, GhostLink, InterfaceGhosts};
pub use mesh::{FvmCell, FvmFace, FvmMesh};
pub use mesh_1d::{RodEnd, build_rod_mesh};
pub use problem::{
    GaussianPulse, HeatProblem, InitialCondition, Walls, build_monolithic, build_monolithic_rom, build_subdomains,
};
pub use rom::{Projection, ReducedModel, RomRodSubdomain, TrialSpace, check_stencil};
pub use solver::{OdeScheme, RodSolver, RodSolverSnapshot, TridiagonalSystem};
pub use subdomain::RodSubdomain;
