pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod sim;

// Prelude
pub use config::{RunConfig, load_config};
pub use error::{Result, SchwarzError};
pub use io::{RuntimeRecorder, StateRecorder, read_runtime_trace, read_state_snapshots};
pub use sim::driver::{RunSummary, run};
pub use sim::schwarz::{IterationControl, ScheduleMode, SchwarzController, StepReport};
pub use sim::subdomain::{BoundaryView, OuterStep, Subdomain};
pub use sim::tiling::Tiling;
