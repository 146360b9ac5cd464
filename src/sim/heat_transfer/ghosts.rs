use crate::sim::heat_transfer::boundary::{BoundaryCondition, RodBoundary};
use crate::sim::subdomain::{BoundaryView, OuterStep};

/// Where one end of a rod segment gets its boundary value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndSource {
    /// Physical wall with a fixed condition.
    Wall(BoundaryCondition),
    /// Ghost cell held by another subdomain.
    Neighbor(GhostLink),
}

/// Location of a ghost value in a neighbor's state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostLink {
    pub domain: usize,
    pub local: usize,
}

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// Dirichlet ghost values at both ends of a segment over one outer window.
///
/// The value at the start of the window is read from the neighbors' committed
/// states, the value at the end from their current states. Sub-steps use the
/// straight line between the two.
#[derive(Debug, Clone)]
pub struct InterfaceGhosts {
    ends: [EndSource; 2],
    start: [f64; 2],
    last: [f64; 2],
}

impl InterfaceGhosts {
    /// `init` holds the values used until a neighbor provides one (ignored at walls).
    pub fn new(left: EndSource, right: EndSource, init: [f64; 2]) -> Self {
        Self {
            ends: [left, right],
            start: init,
            last: init,
        }
    }

    /// Moves to a new window.
    pub fn begin_window(&mut self, boundary: &BoundaryView<'_>) {
        self.start = self.read(|link| boundary.window_start_value(link.domain, link.local));
    }

    /// End-of-window ghost values for this advance.
    pub fn end_values(&mut self, boundary: &BoundaryView<'_>) -> [f64; 2] {
        self.last = self.read(|link| boundary.value(link.domain, link.local));
        self.last
    }

    /// Boundary at fraction `theta` of the window.
    pub fn boundary_at(&self, theta: f64) -> RodBoundary {
        let side = |s: usize| match self.ends[s] {
            EndSource::Wall(bc) => bc,
            EndSource::Neighbor(_) => BoundaryCondition::Dirichlet {
                value: self.start[s] + theta * (self.last[s] - self.start[s]),
            },
        };
        RodBoundary {
            left: side(LEFT),
            right: side(RIGHT),
        }
    }

    /// Neighbor values from `lookup`, the last ghosts where it has none.
    fn read(&self, lookup: impl Fn(&GhostLink) -> Option<f64>) -> [f64; 2] {
        let mut out = self.last;
        for (s, end) in self.ends.iter().enumerate() {
            if let EndSource::Neighbor(link) = end {
                if let Some(v) = lookup(link) {
                    out[s] = v;
                }
            }
        }
        out
    }
}

/// On a repeated step index, returns the state saved for it. On a new index,
/// commits `save()` under it and returns `None`.
pub(crate) fn commit_or_restore<'c, S>(
    committed: &'c mut Option<(usize, S)>,
    window: &OuterStep,
    save: impl FnOnce() -> S,
) -> Option<&'c S> {
    let repeat = matches!(committed, Some((index, _)) if *index == window.index);
    if !repeat {
        *committed = Some((window.index, save()));
        return None;
    }
    committed.as_ref().map(|(_, saved)| saved)
}

/// Number of own steps that cover `window`.
pub(crate) fn substeps(window: &OuterStep, dt: f64) -> usize {
    ((window.dt / dt).round() as usize).max(1)
}
