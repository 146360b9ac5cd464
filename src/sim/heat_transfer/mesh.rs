/// Cell index standing for "outside the segment".
pub const BOUNDARY: usize = usize::MAX;

/// A single finite-volume cell of the rod.
#[derive(Debug, Clone)]
pub struct FvmCell {
    /// Cell length in the same unit as the rod length.
    pub length: f64,
}

impl FvmCell {
    /// Capacity of this cell (unit volumetric capacity times length).
    pub fn capacity(&self) -> f64 {
        self.length
    }
}

/// Face between two neighboring rod cells, or between an end cell and
/// whatever lies past the end of the segment ([`BOUNDARY`] on that side).
#[derive(Debug, Clone)]
pub struct FvmFace {
    pub cell_left: usize,
    pub cell_right: usize,
    /// Distance from the adjacent centroid to the point where the face's
    /// neighbor value lives: a centroid for interior faces, the wall or a
    /// ghost-cell centroid for boundary faces.
    pub distance: f64,
    /// Precomputed `diffusivity / distance`.
    pub conductance: f64,
}

/// 1D finite-volume mesh of one rod segment.
#[derive(Debug, Clone)]
pub struct FvmMesh {
    pub cells: Vec<FvmCell>,
    pub faces: Vec<FvmFace>,
}

impl FvmMesh {
    /// Index of the left boundary face (first face whose `cell_left` is [`BOUNDARY`]).
    pub fn left_boundary_face(&self) -> Option<usize> {
        self.faces.iter().position(|f| f.cell_left == BOUNDARY)
    }

    /// Index of the right boundary face (last face whose `cell_right` is [`BOUNDARY`]).
    pub fn right_boundary_face(&self) -> Option<usize> {
        self.faces.iter().rposition(|f| f.cell_right == BOUNDARY)
    }

    pub fn total_capacity(&self) -> f64 {
        self.cells.iter().map(FvmCell::capacity).sum()
    }
}
