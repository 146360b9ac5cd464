//! File I/O for runs.
//!
//! Binary telemetry written during a run, and the inputs read before it: JSON
//! mesh metadata and the trial spaces of reduced-order subdomains.

pub mod basis;
pub mod mesh;
pub mod runtime;
pub mod state;

pub use basis::{domain_file, domain_sample_file, read_basis, read_indices, read_matrix, read_shift, write_matrix};
pub use mesh::{MeshInfo, read_mesh, read_tiling, write_mesh, write_tiling};
pub use runtime::{RuntimeRecord, RuntimeRecorder, RuntimeTrace, read_runtime_trace};
pub use state::{StateRecorder, read_state_snapshots};
