use crate::sim::heat_transfer::mesh::{BOUNDARY, FvmCell, FvmFace, FvmMesh};

/// What lies beyond one end of a rod segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RodEnd {
    /// Physical wall half a cell away from the end centroid.
    Wall,
    /// Subdomain interface: the boundary value is a ghost cell one full cell away.
    Interface,
}

/// Build a uniform 1D finite-volume mesh with `n_cells` cells of length `dx`.
///
/// Interior faces couple neighboring centroids (distance `dx`). Boundary face
/// distances depend on [`RodEnd`].
pub fn build_rod_mesh(
    n_cells: usize,
    dx: f64,
    diffusivity: f64,
    left: RodEnd,
    right: RodEnd,
) -> FvmMesh {
    let cells = vec![FvmCell { length: dx }; n_cells];
    let mut faces = Vec::with_capacity(n_cells + 1);
    if n_cells == 0 {
        return FvmMesh { cells, faces };
    }

    faces.push(boundary_face(BOUNDARY, 0, dx, diffusivity, left));

    for i in 0..n_cells - 1 {
        faces.push(FvmFace {
            cell_left: i,
            cell_right: i + 1,
            distance: dx,
            conductance: diffusivity / dx,
        });
    }

    faces.push(boundary_face(n_cells - 1, BOUNDARY, dx, diffusivity, right));

    FvmMesh { cells, faces }
}

fn boundary_face(cell_left: usize, cell_right: usize, dx: f64, diffusivity: f64, end: RodEnd) -> FvmFace {
    let distance = match end {
        RodEnd::Wall => dx / 2.0,
        RodEnd::Interface => dx,
    };
    FvmFace {
        cell_left,
        cell_right,
        distance,
        conductance: diffusivity / distance,
    }
}
