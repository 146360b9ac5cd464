//! End-to-end runs of the built-in heat problem from YAML input files.

use std::path::Path;

use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use schwarz_driver::io::{read_runtime_trace, read_state_snapshots, write_matrix};
use schwarz_driver::sim::driver::{MONO_STATE_FILE, RUNTIME_FILE, decomposed_outputs, run_file};
use schwarz_driver::{RunConfig, SchwarzError, run};

mod common;
use common::{heat_input, write_case_mesh};

fn write_input(dir: &Path, yaml: &str) -> std::path::PathBuf {
    let path = dir.join("input.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_two_domain_additive_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 40, 2, 2);
    let out = dir.path().join("out");
    let yaml = heat_input(
        &mesh_dir,
        &out,
        1.0,
        10,
        "decomp:
  domainTypes: [FOM, FOM]
  timeStepSize: [0.1, 0.1]
  odeScheme: [BDF1, BDF1]
  schwarzMode: Additive
  relTol: 1.0e-11
  absTol: 1.0e-11
  convStepMax: 10
",
    );
    let summary = run_file(&write_input(dir.path(), &yaml)).unwrap();
    assert_eq!(summary.steps, 10);

    let (state_paths, runtime_path) = decomposed_outputs(&out, 2);
    let trace = read_runtime_trace(&runtime_path).unwrap();
    assert_eq!(trace.n_domains, 2);
    assert_eq!(trace.records.len(), 10);
    for r in &trace.records {
        assert!((1..=10).contains(&r.sub_iterations));
        assert_eq!(r.values.len(), 2 * r.sub_iterations);
    }

    // Tiling::line(40, 2, 2): both subdomains hold 22 cells.
    for path in &state_paths {
        let snaps = read_state_snapshots(path, 22).unwrap();
        assert_eq!(snaps.len(), 2);
    }
}

#[test]
fn test_decomposed_matches_monolithic() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 40, 2, 2);

    let mono_out = dir.path().join("mono");
    let mono = heat_input(&mesh_dir, &mono_out, 0.2, 20, "timeStepSize: 0.01\nodeScheme: BDF1\n");
    run(&RunConfig::from_yaml_str(&mono).unwrap()).unwrap();
    let mono_states = read_state_snapshots(&mono_out.join(MONO_STATE_FILE), 40).unwrap();
    assert_eq!(mono_states.len(), 2);
    let reference = &mono_states[1];

    let dec_out = dir.path().join("decomp");
    let dec = heat_input(
        &mesh_dir,
        &dec_out,
        0.2,
        20,
        "timeStepSize: 0.01
odeScheme: BDF1
decomp:
  domainTypes: [FOM, FOM]
  relTol: 1.0e-13
  absTol: 1.0e-13
  convStepMax: 50
",
    );
    let summary = run(&RunConfig::from_yaml_str(&dec).unwrap()).unwrap();
    assert_eq!(summary.unconverged_steps, 0);

    let (state_paths, _) = decomposed_outputs(&dec_out, 2);
    let left = read_state_snapshots(&state_paths[0], 22).unwrap();
    let right = read_state_snapshots(&state_paths[1], 22).unwrap();
    for (i, u) in left[1].iter().enumerate() {
        assert_abs_diff_eq!(*u, reference[i], epsilon = 1e-8);
    }
    for (i, u) in right[1].iter().enumerate() {
        assert_abs_diff_eq!(*u, reference[18 + i], epsilon = 1e-8);
    }
}

#[test]
fn test_subcycled_domain_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 30, 3, 2);
    let out = dir.path().join("out");
    let yaml = heat_input(
        &mesh_dir,
        &out,
        0.5,
        1,
        "decomp:
  domainTypes: [FOM, FOM, FOM]
  timeStepSize: [0.05, 0.025, 0.05]
  odeScheme: [BDF2, CrankNicolson, BDF1]
  additive: true
  numThreads: 2
",
    );
    let summary = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    assert_eq!(summary.steps, 10);
    assert_eq!(summary.sub_iterations.len(), 10);
    assert!(summary.sub_iterations.iter().all(|k| (1..=10).contains(k)));

    let trace = read_runtime_trace(&out.join(RUNTIME_FILE)).unwrap();
    assert_eq!(trace.n_domains, 3);
    assert_eq!(trace.records.len(), 10);
}

#[test]
fn test_monolithic_runtime_uses_total_records() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 20, 1, 0);
    let out = dir.path().join("out");
    let yaml = heat_input(&mesh_dir, &out, 0.1, 5, "timeStepSize: 0.01\nodeScheme: CrankNicolson\n");
    let summary = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    assert_eq!(summary.steps, 10);

    let trace = read_runtime_trace(&out.join(RUNTIME_FILE)).unwrap();
    assert_eq!(trace.n_domains, 1);
    assert_eq!(trace.records.len(), 10);
    assert!(trace.records.iter().all(|r| r.sub_iterations == 1));
    assert_eq!(read_state_snapshots(&out.join(MONO_STATE_FILE), 20).unwrap().len(), 3);
}

/// Identity basis of `modes` columns and a zero shift for a segment of `rows` cells.
fn write_identity_space(basis: &Path, shift: &Path, rows: usize, modes: usize) {
    write_matrix(basis, &DMatrix::identity(rows, modes)).unwrap();
    write_matrix(shift, &DMatrix::zeros(rows, 1)).unwrap();
}

/// Runs a two-domain case on 40 cells and returns the final state of each domain.
fn final_decomposed_states(dir: &Path, mesh_dir: &Path, name: &str, decomp: &str) -> Vec<Vec<f64>> {
    let out = dir.join(name);
    let yaml = heat_input(
        mesh_dir,
        &out,
        0.2,
        20,
        &format!("timeStepSize: 0.01\nodeScheme: BDF1\ndecomp:\n  relTol: 1.0e-13\n  absTol: 1.0e-13\n  convStepMax: 50\n{decomp}"),
    );
    let summary = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    assert_eq!(summary.unconverged_steps, 0);
    let (state_paths, _) = decomposed_outputs(&out, 2);
    state_paths
        .iter()
        .map(|p| read_state_snapshots(p, 22).unwrap().pop().unwrap())
        .collect()
}

#[test]
fn test_mixed_fom_rom_matches_full_order() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 40, 2, 2);
    let pod = dir.path().join("pod");
    std::fs::create_dir_all(&pod).unwrap();
    for i in 0..2 {
        write_identity_space(&pod.join(format!("basis_{i}.bin")), &pod.join(format!("center_{i}.bin")), 22, 22);
    }
    std::fs::write(pod.join("sample_0.txt"), (0..22).map(|c| c.to_string()).collect::<Vec<_>>().join(" ")).unwrap();

    let reference = final_decomposed_states(dir.path(), &mesh_dir, "fom", "  domainTypes: [FOM, FOM]\n");
    let roots = format!(
        "  basisFileRoot: {0}/basis\n  transFileRoot: {0}/center\n  sampleFileRoot: {0}/sample\n",
        pod.display()
    );
    let cases = [
        ("galerkin", "  domainTypes: [FOM, Galerkin]\n  numModes: [0, 22]\n"),
        ("lspg", "  domainTypes: [LSPG, FOM]\n  numModes: [22, 0]\n"),
        ("hyper", "  domainTypes: [LSPGHyper, Galerkin]\n  numModes: [22, 22]\n"),
    ];
    for (name, kinds) in cases {
        let states = final_decomposed_states(dir.path(), &mesh_dir, name, &format!("{kinds}{roots}"));
        for (got, want) in states.iter().zip(&reference) {
            for (a, b) in got.iter().zip(want) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_truncated_rom_state_stays_in_its_basis() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 40, 2, 2);
    write_identity_space(&dir.path().join("basis_1.bin"), &dir.path().join("center_1.bin"), 22, 22);
    let out = dir.path().join("out");
    let yaml = heat_input(
        &mesh_dir,
        &out,
        0.5,
        5,
        &format!(
            "timeStepSize: 0.05
odeScheme: BDF2
decomp:
  domainTypes: [FOM, LSPG]
  schwarzMode: Additive
  numModes: [0, 11]
  basisFileRoot: {0}/basis
  transFileRoot: {0}/center
",
            dir.path().display()
        ),
    );
    let summary = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap();
    assert_eq!(summary.steps, 10);

    let (state_paths, _) = decomposed_outputs(&out, 2);
    let rom = read_state_snapshots(&state_paths[1], 22).unwrap();
    assert_eq!(rom.len(), 3);
    // Cells 18..29 carry the heat that leaks in from the left segment.
    assert!(rom[2][..11].iter().any(|u| *u > 0.0));
    for snap in &rom {
        assert!(snap[11..].iter().all(|u| *u == 0.0));
    }
}

#[test]
fn test_monolithic_hyper_lspg_matches_full_order() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 20, 1, 0);
    let basis = dir.path().join("basis.bin");
    let center = dir.path().join("center.bin");
    write_identity_space(&basis, &center, 20, 20);
    let all: Vec<String> = (0..20).map(|c| c.to_string()).collect();
    std::fs::write(dir.path().join("sample.txt"), all.join("\n")).unwrap();
    std::fs::write(dir.path().join("stencil.txt"), all.join(" ")).unwrap();

    let fom_out = dir.path().join("fom");
    let fom = heat_input(&mesh_dir, &fom_out, 0.1, 5, "timeStepSize: 0.01\nodeScheme: CrankNicolson\n");
    run(&RunConfig::from_yaml_str(&fom).unwrap()).unwrap();
    let reference = read_state_snapshots(&fom_out.join(MONO_STATE_FILE), 20).unwrap();

    let rom_out = dir.path().join("rom");
    let rom = heat_input(
        &mesh_dir,
        &rom_out,
        0.1,
        5,
        &format!(
            "timeStepSize: 0.01
odeScheme: CrankNicolson
rom:
  algorithm: LSPG
  numModes: 20
  basisFile: {}
  transFile: {}
hyper:
  meshDirHyper: {}
  sampleFile: sample.txt
  stencilFile: stencil.txt
",
            basis.display(),
            center.display(),
            dir.path().display()
        ),
    );
    let summary = run(&RunConfig::from_yaml_str(&rom).unwrap()).unwrap();
    assert_eq!(summary.steps, 10);
    let states = read_state_snapshots(&rom_out.join(MONO_STATE_FILE), 20).unwrap();
    assert_eq!(states.len(), reference.len());
    for (got, want) in states.iter().zip(&reference) {
        for (a, b) in got.iter().zip(want) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_galerkin_hyper_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 20, 1, 0);
    let out = dir.path().join("out");
    let yaml = heat_input(
        &mesh_dir,
        &out,
        0.1,
        1,
        "timeStepSize: 0.01
odeScheme: BDF1
rom:
  algorithm: Galerkin
  numModes: 4
  basisFile: basis.bin
  transFile: center.bin
hyper:
  meshDirHyper: hyper
  sampleFile: sample.txt
  stencilFile: stencil.txt
",
    );
    let err = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap_err();
    assert!(err.downcast_ref::<SchwarzError>().unwrap().is_configuration());
    assert!(!out.exists());
}

#[test]
fn test_missing_basis_fails_before_writing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 20, 2, 2);
    let out = dir.path().join("out");
    let yaml = heat_input(
        &mesh_dir,
        &out,
        0.1,
        1,
        &format!(
            "timeStepSize: 0.01
odeScheme: BDF1
decomp:
  domainTypes: [FOM, Galerkin]
  numModes: [0, 8]
  basisFileRoot: {0}/basis
  transFileRoot: {0}/center
",
            dir.path().display()
        ),
    );
    let err = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap_err();
    assert!(format!("{err:#}").contains("basis_1.bin"));
    assert!(!out.exists());
}

#[test]
fn test_domain_count_must_match_tiling() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 30, 3, 2);
    let yaml = heat_input(
        &mesh_dir,
        &dir.path().join("out"),
        0.1,
        1,
        "timeStepSize: 0.01
odeScheme: BDF1
decomp:
  domainTypes: [FOM, FOM]
",
    );
    let err = run(&RunConfig::from_yaml_str(&yaml).unwrap()).unwrap_err();
    assert!(format!("{err:#}").contains("decomp.domainTypes"));
}

#[test]
fn test_invalid_inputs_are_configuration_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_dir = write_case_mesh(dir.path(), 20, 2, 2);
    let out = dir.path().join("out");

    let cases = [
        // unknown scheme
        "timeStepSize: 0.01\nodeScheme: RK4\n",
        // schedule mode is a closed set
        "timeStepSize: 0.01\nodeScheme: BDF1\ndecomp:\n  domainTypes: [FOM, FOM]\n  schwarzMode: Hybrid\n",
        // one domain is not a decomposition
        "timeStepSize: 0.01\nodeScheme: BDF1\ndecomp:\n  domainTypes: [FOM]\n",
        // non-positive step
        "odeScheme: BDF1\ndecomp:\n  domainTypes: [FOM, FOM]\n  timeStepSize: [0.1, 0.0]\n",
        // monolithic without stepping
        "",
    ];
    for extra in cases {
        let yaml = heat_input(&mesh_dir, &out, 0.1, 1, extra);
        let err = RunConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.is_configuration(), "{extra:?}: {err}");
    }
}

#[test]
fn test_missing_mesh_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = heat_input(
        &dir.path().join("nowhere"),
        &dir.path().join("out"),
        0.1,
        1,
        "timeStepSize: 0.01\nodeScheme: BDF1\n",
    );
    let err = run_file(&write_input(dir.path(), &yaml)).unwrap_err();
    assert!(format!("{err:#}").contains("mesh.json"));
}
