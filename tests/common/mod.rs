//! Shared helpers for integration tests: mock subdomains and case files.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schwarz_driver::io::{MeshInfo, write_mesh, write_tiling};
use schwarz_driver::{BoundaryView, OuterStep, SchwarzController, Subdomain, Tiling};

/// Linear fixed-point map: `x_i[j] = source_i[j] + coupling * sum_{k != i} x_k[j]`.
///
/// Converges for `coupling * (n - 1) < 1`. Coupled whenever `coupling != 0`.
pub struct LinearCoupled {
    pub source: Vec<f64>,
    pub state: Vec<f64>,
    pub coupling: f64,
    pub dt: f64,
}

impl Subdomain for LinearCoupled {
    fn name(&self) -> &str {
        "linear"
    }

    fn state(&self) -> &[f64] {
        &self.state
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn advance(&mut self, _window: &OuterStep, boundary: &BoundaryView<'_>) {
        for j in 0..self.state.len() {
            let others: f64 = (0..boundary.len())
                .filter_map(|k| boundary.value(k, j))
                .sum();
            self.state[j] = self.source[j] + self.coupling * others;
        }
    }
}

/// State `[sweeps, seen_0, .., seen_{n-1}]`: counts its own advances and
/// records the sweep counters it observed in the others (`-1` for itself).
pub struct SweepCounter {
    pub state: Vec<f64>,
}

impl SweepCounter {
    pub fn new(n: usize) -> Self {
        Self {
            state: vec![0.0; n + 1],
        }
    }
}

impl Subdomain for SweepCounter {
    fn name(&self) -> &str {
        "counter"
    }

    fn state(&self) -> &[f64] {
        &self.state
    }

    fn dt(&self) -> f64 {
        0.1
    }

    fn advance(&mut self, _window: &OuterStep, boundary: &BoundaryView<'_>) {
        for k in 0..boundary.len() {
            self.state[k + 1] = boundary.value(k, 0).unwrap_or(-1.0);
        }
        self.state[0] += 1.0;
    }
}

/// Ignores its neighbors; its state is the index of the last outer step.
pub struct StepStamp {
    pub state: Vec<f64>,
    pub dt: f64,
}

impl Subdomain for StepStamp {
    fn name(&self) -> &str {
        "stamp"
    }

    fn state(&self) -> &[f64] {
        &self.state
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn advance(&mut self, window: &OuterStep, _boundary: &BoundaryView<'_>) {
        self.state.fill(window.index as f64);
    }
}

pub fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// `n` linear subdomains of length `len` with seeded random sources and states.
pub fn linear_controller(n: usize, len: usize, coupling: f64, seed: u64) -> SchwarzController {
    let mut rng = StdRng::seed_from_u64(seed);
    let subs: Vec<Box<dyn Subdomain>> = (0..n)
        .map(|_| {
            Box::new(LinearCoupled {
                source: random_vec(&mut rng, len),
                state: random_vec(&mut rng, len),
                coupling,
                dt: 0.1,
            }) as Box<dyn Subdomain>
        })
        .collect();
    controller(subs, vec![0.1; n])
}

pub fn controller(subs: Vec<Box<dyn Subdomain>>, dt_vec: Vec<f64>) -> SchwarzController {
    let n = subs.len();
    let tiling = Arc::new(Tiling::line(10 * n, n, 1).unwrap());
    SchwarzController::new(subs, tiling, dt_vec).unwrap()
}

pub fn states(ctrl: &SchwarzController) -> Vec<Vec<f64>> {
    (0..ctrl.domain_count()).map(|i| ctrl.state(i).to_vec()).collect()
}

/// Writes a mesh of `cells` cells on `[0, 1]` split into `domains` with `overlap`.
pub fn write_case_mesh(dir: &Path, cells: usize, domains: usize, overlap: usize) -> PathBuf {
    let mesh_dir = dir.join("mesh");
    write_mesh(&mesh_dir, &MeshInfo { cells, length: 1.0 }).unwrap();
    if domains > 1 {
        write_tiling(&mesh_dir, &Tiling::line(cells, domains, overlap).unwrap()).unwrap();
    }
    mesh_dir
}

/// YAML for the insulated rod with a centered pulse. `extra` is appended verbatim.
pub fn heat_input(mesh_dir: &Path, out_dir: &Path, final_time: f64, freq: usize, extra: &str) -> String {
    format!(
        "meshDir: {}
outputDir: {}
finalTime: {final_time:?}
stateSamplingFreq: {freq}
problem: 1d_heat
problemName: InsulatedRod
icFlag: 1
diffusivity: 0.01
pulseMagnitude: 1.0
pulseX: 0.5
pulseWidth: 0.1
{extra}",
        mesh_dir.display(),
        out_dir.display()
    )
}
