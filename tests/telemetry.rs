//! Binary telemetry written by the outer loop and read back.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schwarz_driver::io::{RuntimeRecorder, StateRecorder, read_runtime_trace, read_state_snapshots};
use schwarz_driver::sim::driver::{run_schwarz, run_single};
use schwarz_driver::{IterationControl, ScheduleMode, SchwarzError, Subdomain};

mod common;
use common::{StepStamp, controller, linear_controller};

#[test]
fn test_runtime_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runtime.bin");
    let mut rng = StdRng::seed_from_u64(3);
    let n_domains = 3;

    let mut written = Vec::new();
    {
        let mut rec = RuntimeRecorder::create(&path, n_domains).unwrap();
        for _ in 0..17 {
            let iters = rng.random_range(1..8);
            let matrix: Vec<Vec<f64>> = (0..n_domains)
                .map(|_| (0..iters).map(|_| rng.random_range(0.0..1e-3)).collect())
                .collect();
            rec.record_decomposed(&matrix).unwrap();
            written.push(matrix);
        }
        rec.flush().unwrap();
        assert_eq!(rec.records(), 17);
    }

    let trace = read_runtime_trace(&path).unwrap();
    assert_eq!(trace.n_domains, n_domains);
    assert_eq!(trace.records.len(), written.len());
    for (record, matrix) in trace.records.iter().zip(&written) {
        assert_eq!(record.sub_iterations, matrix[0].len());
        for (d, row) in matrix.iter().enumerate() {
            for (k, value) in row.iter().enumerate() {
                assert_eq!(record.runtime(k, d, n_domains), Some(*value));
            }
        }
    }
}

#[test]
fn test_state_cadence_over_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let subs: Vec<Box<dyn Subdomain>> = vec![
        Box::new(StepStamp { state: vec![0.0; 4], dt: 0.1 }),
        Box::new(StepStamp { state: vec![0.0; 2], dt: 0.1 }),
    ];
    let mut ctrl = controller(subs, vec![0.1, 0.1]);
    let control = IterationControl::new(1e-11, 1e-11, 10, ScheduleMode::Multiplicative).unwrap();

    let paths = [dir.path().join("s0.bin"), dir.path().join("s1.bin")];
    let mut states: Vec<StateRecorder> = paths
        .iter()
        .map(|p| StateRecorder::create(p, 5).unwrap())
        .collect();
    let mut runtime = RuntimeRecorder::create(&dir.path().join("runtime.bin"), 2).unwrap();

    let total_steps = 23;
    let summary = run_schwarz(&mut ctrl, control, total_steps, &mut states, &mut runtime).unwrap();
    assert_eq!(summary.steps, total_steps);
    assert!((summary.final_time - 2.3).abs() < 1e-12);

    for (path, len) in paths.iter().zip([4, 2]) {
        let snaps = read_state_snapshots(path, len).unwrap();
        assert_eq!(snaps.len(), total_steps / 5 + 1);
        let steps: Vec<f64> = snaps.iter().map(|s| s[0]).collect();
        assert_eq!(steps, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    }

    // A stationary subdomain converges on its second pass every step.
    let trace = read_runtime_trace(&dir.path().join("runtime.bin")).unwrap();
    assert_eq!(trace.records.len(), total_steps);
    assert!(trace.records.iter().all(|r| r.sub_iterations == 2));
    assert_eq!(summary.sub_iterations, vec![2; total_steps]);
}

#[test]
fn test_capped_steps_are_recorded_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctrl = linear_controller(2, 3, 0.4, 8);
    let control = IterationControl::new(0.0, 0.0, 3, ScheduleMode::Additive).unwrap();
    let mut states: Vec<StateRecorder> = (0..2)
        .map(|i| StateRecorder::create(&dir.path().join(format!("s{i}.bin")), 1).unwrap())
        .collect();
    let path = dir.path().join("runtime.bin");
    let mut runtime = RuntimeRecorder::create(&path, 2).unwrap();

    let summary = run_schwarz(&mut ctrl, control, 4, &mut states, &mut runtime).unwrap();
    assert_eq!(summary.unconverged_steps, 4);
    let trace = read_runtime_trace(&path).unwrap();
    assert!(trace.records.iter().all(|r| r.sub_iterations == 3));
}

#[test]
fn test_recorder_count_must_match_domains() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctrl = linear_controller(3, 2, 0.1, 1);
    let control = IterationControl::new(1e-8, 1e-8, 5, ScheduleMode::Additive).unwrap();
    let mut states = vec![StateRecorder::create(&dir.path().join("s.bin"), 1).unwrap()];
    let mut runtime = RuntimeRecorder::create(&dir.path().join("r.bin"), 3).unwrap();
    let err = run_schwarz(&mut ctrl, control, 1, &mut states, &mut runtime).unwrap_err();
    assert!(matches!(err, SchwarzError::Configuration { .. }));
}

#[test]
fn test_single_domain_run_writes_total_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut stamp = StepStamp { state: vec![0.0; 3], dt: 0.25 };
    let state_path = dir.path().join("state_snapshots.bin");
    let runtime_path = dir.path().join("runtime.bin");
    let mut state = StateRecorder::create(&state_path, 2).unwrap();
    let mut runtime = RuntimeRecorder::create_single(&runtime_path).unwrap();

    let summary = run_single(&mut stamp, 4, &mut state, &mut runtime).unwrap();
    assert_eq!(summary.final_time, 1.0);

    let trace = read_runtime_trace(&runtime_path).unwrap();
    assert_eq!(trace.n_domains, 1);
    assert_eq!(trace.records.len(), 4);
    assert!(trace.records.iter().all(|r| r.sub_iterations == 1 && r.values.len() == 1));

    let snaps = read_state_snapshots(&state_path, 3).unwrap();
    assert_eq!(snaps, vec![vec![0.0; 3], vec![2.0; 3], vec![4.0; 3]]);
}
