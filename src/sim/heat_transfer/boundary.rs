/// Boundary condition applied at a mesh boundary face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryCondition {
    /// Zero flux through the face.
    Insulated,
    /// Fixed value at the far side of the boundary face.
    ///
    /// At a wall this is the wall value; at a subdomain interface it is the
    /// neighbor's value in the ghost cell.
    Dirichlet { value: f64 },
}

/// Boundary conditions at both ends of a rod segment at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RodBoundary {
    pub left: BoundaryCondition,
    pub right: BoundaryCondition,
}

impl RodBoundary {
    pub fn insulated() -> Self {
        Self {
            left: BoundaryCondition::Insulated,
            right: BoundaryCondition::Insulated,
        }
    }
}
