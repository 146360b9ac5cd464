//! Outer time loop: announces each step, runs the controller, and feeds the
//! recorders.
//!
//! All telemetry happens on the thread that calls into this module. Worker
//! threads only ever run inside an additive sweep, which has joined before the
//! sweep returns, so every state read here sees the finished sub-iteration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{DecompConfig, HyperConfig, RomAlgorithm, RomConfig, RunConfig};
use crate::error::SchwarzError;
use crate::io::basis::{domain_file, domain_sample_file, read_basis, read_indices, read_shift};
use crate::io::mesh::{read_mesh, read_tiling};
use crate::io::runtime::RuntimeRecorder;
use crate::io::state::StateRecorder;
use crate::sim::heat_transfer::{
    Projection, ReducedModel, TrialSpace, build_monolithic, build_monolithic_rom, build_subdomains, check_stencil,
};
use crate::sim::schwarz::{IterationControl, SchwarzController};
use crate::sim::subdomain::{BoundaryView, DomainKind, OuterStep, Subdomain};

pub const RUNTIME_FILE: &str = "runtime.bin";
pub const MONO_STATE_FILE: &str = "state_snapshots.bin";

/// Relative slack when truncating `finalTime / dtMax`.
const STEP_COUNT_SLACK: f64 = 1e-9;

/// State file of subdomain `domain`.
pub fn state_file_name(domain: usize) -> String {
    format!("state_snapshots_{domain}.bin")
}

/// Number of outer steps: `finalTime / dtMax`, truncated.
///
/// A quotient within a relative 1e-9 below an integer counts as that integer,
/// so `0.3 / 0.1` gives 3 steps.
pub fn outer_step_count(final_time: f64, dt_max: f64) -> usize {
    let ratio = final_time / dt_max;
    (ratio * (1.0 + STEP_COUNT_SLACK)).floor() as usize
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    /// Sub-iterations per outer step.
    pub sub_iterations: Vec<usize>,
    /// Steps that hit the sub-iteration cap.
    pub unconverged_steps: usize,
    pub final_time: f64,
}

impl RunSummary {
    pub fn total_sub_iterations(&self) -> usize {
        self.sub_iterations.iter().sum()
    }
}

/// Runs `num_steps` outer steps of a decomposed problem and records telemetry.
///
/// `states` holds one recorder per subdomain. Step 0 states are recorded
/// before the first step.
pub fn run_schwarz(
    controller: &mut SchwarzController,
    control: IterationControl,
    num_steps: usize,
    states: &mut [StateRecorder],
    runtime: &mut RuntimeRecorder,
) -> crate::error::Result<RunSummary> {
    let n = controller.domain_count();
    if states.len() != n {
        return Err(SchwarzError::config(
            "stateRecorders",
            format!("{} state recorders for {n} subdomains", states.len()),
        ));
    }
    if runtime.n_domains() != n {
        return Err(SchwarzError::config(
            "nDomains",
            format!("runtime recorder expects {} domains, controller has {n}", runtime.n_domains()),
        ));
    }

    let dt_max = controller.dt_max();
    let mut time = 0.0;
    for (i, rec) in states.iter_mut().enumerate() {
        rec.record(0, time, controller.state(i))?;
    }

    let mut summary = RunSummary {
        steps: 0,
        sub_iterations: Vec::with_capacity(num_steps),
        unconverged_steps: 0,
        final_time: time,
    };

    for step in 1..=num_steps {
        println!("Step {step}");

        let report = controller.run_outer_step(step, time, control);
        time += dt_max;

        for (i, rec) in states.iter_mut().enumerate() {
            rec.record(step, time, controller.state(i))?;
        }
        runtime.record_decomposed(&report.runtimes)?;

        debug!(
            step,
            sub_iterations = report.sub_iterations,
            residual = report.residual(),
            elapsed_ms = report.elapsed.as_secs_f64() * 1e3,
            "outer step done"
        );
        summary.steps = step;
        summary.sub_iterations.push(report.sub_iterations);
        if !report.converged {
            summary.unconverged_steps += 1;
        }
    }
    summary.final_time = time;

    for rec in states.iter_mut() {
        rec.flush()?;
    }
    runtime.flush()?;
    Ok(summary)
}

/// Runs a single undecomposed subdomain, one Operation-B runtime record per step.
pub fn run_single(
    subdomain: &mut dyn Subdomain,
    num_steps: usize,
    state: &mut StateRecorder,
    runtime: &mut RuntimeRecorder,
) -> crate::error::Result<RunSummary> {
    let dt = subdomain.dt();
    let mut time = 0.0;
    state.record(0, time, subdomain.state())?;
    let boundary = BoundaryView::new(Vec::new());

    for step in 1..=num_steps {
        println!("Step {step}");

        let window = OuterStep {
            index: step,
            time,
            dt,
        };
        let start = Instant::now();
        subdomain.advance(&window, &boundary);
        let elapsed = start.elapsed().as_secs_f64();
        time += dt;

        state.record(step, time, subdomain.state())?;
        runtime.record_total(elapsed)?;
    }

    state.flush()?;
    runtime.flush()?;
    Ok(RunSummary {
        steps: num_steps,
        sub_iterations: vec![1; num_steps],
        unconverged_steps: 0,
        final_time: time,
    })
}

/// Trial space and projection of every ROM subdomain, `None` for FOM ones.
fn load_decomposed_models(decomp: &DecompConfig) -> crate::error::Result<Vec<Option<ReducedModel>>> {
    decomp
        .kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| -> crate::error::Result<Option<ReducedModel>> {
            if !kind.is_rom() {
                return Ok(None);
            }
            let rom = decomp
                .rom
                .as_ref()
                .ok_or_else(|| SchwarzError::config("decomp.numModes", format!("domain {i} ({kind}) has no ROM settings")))?;
            let projection = match kind {
                DomainKind::Galerkin => Projection::Galerkin,
                DomainKind::LspgHyper => {
                    let root = rom
                        .sample_file_root
                        .as_ref()
                        .ok_or_else(|| SchwarzError::config("decomp.sampleFileRoot", "missing"))?;
                    Projection::Lspg {
                        sample: Some(read_indices(&domain_sample_file(root, i))?),
                    }
                }
                _ => Projection::Lspg { sample: None },
            };
            let space = TrialSpace::new(
                read_basis(&domain_file(&rom.basis_file_root, i), rom.num_modes.get(i).copied().unwrap_or(0))?,
                read_shift(&domain_file(&rom.trans_file_root, i))?,
            )?;
            debug!(domain = i, %kind, modes = space.modes(), "loaded trial space");
            Ok(Some(ReducedModel { space, projection }))
        })
        .collect()
}

/// Trial space and projection of a monolithic ROM run over `cells` cells.
///
/// Hyper-reduction reads the sample and stencil lists relative to
/// `meshDirHyper` and needs LSPG.
fn load_monolithic_model(
    rom: &RomConfig,
    hyper: Option<&HyperConfig>,
    cells: usize,
) -> crate::error::Result<ReducedModel> {
    let projection = match (rom.algorithm, hyper) {
        (RomAlgorithm::Galerkin, None) => Projection::Galerkin,
        (RomAlgorithm::Galerkin, Some(_)) => {
            return Err(SchwarzError::config(
                "hyper",
                "hyper-reduction needs rom.algorithm: LSPG",
            ));
        }
        (RomAlgorithm::Lspg, None) => Projection::Lspg { sample: None },
        (RomAlgorithm::Lspg, Some(h)) => {
            let sample = read_indices(&h.mesh_dir_hyper.join(&h.sample_file))?;
            let stencil = read_indices(&h.mesh_dir_hyper.join(&h.stencil_file))?;
            check_stencil(&sample, &stencil, cells)?;
            Projection::Lspg { sample: Some(sample) }
        }
    };
    let space = TrialSpace::new(read_basis(&rom.basis_file, rom.num_modes)?, read_shift(&rom.trans_file)?)?;
    Ok(ReducedModel { space, projection })
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Decomposed run described by `config.decomp`.
pub fn run_decomposed(config: &RunConfig) -> Result<RunSummary> {
    let decomp = config
        .decomp
        .as_ref()
        .ok_or_else(|| SchwarzError::config("decomp", "missing"))?;
    let common = &config.common;

    let mesh = read_mesh(&common.mesh_dir)?;
    let tiling = read_tiling(&common.mesh_dir, &mesh)?;
    if tiling.count() != decomp.domain_count() {
        return Err(SchwarzError::config(
            "decomp.domainTypes",
            format!(
                "{} domain types for a tiling of {} subdomains",
                decomp.domain_count(),
                tiling.count()
            ),
        )
        .into());
    }

    let models = load_decomposed_models(decomp)?;
    let subdomains = build_subdomains(
        &config.problem,
        &mesh,
        &tiling,
        &decomp.dt_vec,
        &decomp.schemes,
        models,
    )?;
    let mut controller = SchwarzController::new(subdomains, Arc::new(tiling), decomp.dt_vec.clone())?;
    let num_steps = outer_step_count(common.final_time, controller.dt_max());

    prepare_output_dir(&common.output_dir)?;
    let mut states = (0..decomp.domain_count())
        .map(|i| StateRecorder::create(&common.output_dir.join(state_file_name(i)), common.state_sampling_freq))
        .collect::<crate::error::Result<Vec<_>>>()?;
    let mut runtime = RuntimeRecorder::create(&common.output_dir.join(RUNTIME_FILE), decomp.domain_count())?;

    info!(
        domains = decomp.domain_count(),
        dt_max = controller.dt_max(),
        steps = num_steps,
        mode = %decomp.control.mode,
        rom = decomp.has_rom(),
        output = %common.output_dir.display(),
        "starting decomposed run"
    );

    let control = decomp.control;
    let summary = match decomp.num_threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("Failed to build worker pool")?;
            pool.install(|| run_schwarz(&mut controller, control, num_steps, &mut states, &mut runtime))?
        }
        None => run_schwarz(&mut controller, control, num_steps, &mut states, &mut runtime)?,
    };

    info!(
        steps = summary.steps,
        sub_iterations = summary.total_sub_iterations(),
        unconverged = summary.unconverged_steps,
        "decomposed run finished"
    );
    Ok(summary)
}

/// Single rod over the whole mesh, reduced order when a `rom:` section is set.
pub fn run_monolithic(config: &RunConfig) -> Result<RunSummary> {
    if config.hyper.is_some() && config.rom.is_none() {
        return Err(SchwarzError::config("hyper", "hyper-reduction needs a rom section").into());
    }
    let stepping = config
        .stepping
        .ok_or_else(|| SchwarzError::config("timeStepSize", "missing"))?;
    let common = &config.common;

    let mesh = read_mesh(&common.mesh_dir)?;
    let mut rod: Box<dyn Subdomain> = match &config.rom {
        Some(rom) => {
            let model = load_monolithic_model(rom, config.hyper.as_ref(), mesh.cells)?;
            Box::new(build_monolithic_rom(&config.problem, &mesh, stepping.dt, stepping.scheme, model)?)
        }
        None => Box::new(build_monolithic(&config.problem, &mesh, stepping.dt, stepping.scheme)),
    };
    let num_steps = outer_step_count(common.final_time, stepping.dt);

    prepare_output_dir(&common.output_dir)?;
    let mut state = StateRecorder::create(&common.output_dir.join(MONO_STATE_FILE), common.state_sampling_freq)?;
    let mut runtime = RuntimeRecorder::create_single(&common.output_dir.join(RUNTIME_FILE))?;

    info!(
        cells = mesh.cells,
        dt = stepping.dt,
        scheme = %stepping.scheme,
        steps = num_steps,
        rom = ?config.rom.as_ref().map(|r| r.algorithm),
        "starting monolithic run"
    );
    let summary = run_single(rod.as_mut(), num_steps, &mut state, &mut runtime)?;
    info!(steps = summary.steps, "monolithic run finished");
    Ok(summary)
}

/// Dispatches on whether the configuration has a `decomp:` section.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    if config.is_decomposed() {
        run_decomposed(config)
    } else {
        run_monolithic(config)
    }
}

/// Loads `input` and runs it.
pub fn run_file(input: &Path) -> Result<RunSummary> {
    let config = crate::config::load_config(input)
        .with_context(|| format!("Failed to load input file: {}", input.display()))?;
    run(&config)
}

/// Output paths a decomposed run with `n` subdomains writes into `dir`.
pub fn decomposed_outputs(dir: &Path, n: usize) -> (Vec<PathBuf>, PathBuf) {
    let states = (0..n).map(|i| dir.join(state_file_name(i))).collect();
    (states, dir.join(RUNTIME_FILE))
}
