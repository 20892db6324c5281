//! Deterministic SEIR-V outbreak simulator
//!
//! Humans move through Susceptible, Exposed, Infectious and Recovered compartments, driven
//! by the fraction of infectious mosquitoes; mosquitoes are either Susceptible or Infectious,
//! with equal birth and death rates. The coupled system is integrated with an adaptive
//! Dormand-Prince 5(4) solver.
//!
//! ```no_run
//! use seirv::prelude::*;
//!
//! let params = Parameters::new(0.35, 0.15, 1.0 / 7.0, 1.0 / 5.0, 1.0 / 14.0, 100_000)?;
//! let initial = Compartments::new(99_990.0, 0.0, 10.0, 0.0, 200_000.0, 500.0)?;
//! let span = TimeSpan::new(0.0, 120.0)?;
//! let times = linspace(0.0, 120.0, 120);
//!
//! let trajectory = simulate(&params, &initial, span, Some(&times[..]))?;
//! let (peak_time, peak) = trajectory.peak(Compartment::I).unwrap();
//! # Ok::<(), SimulationError>(())
//! ```

pub mod entrypoints;
pub mod error;
pub mod routines {
    pub mod logger;
    pub mod output;
    pub mod settings;
}
pub mod simulator;
pub mod structs {
    pub mod compartments;
    pub mod parameters;
    pub mod trajectory;
}

pub mod prelude {
    pub use crate::entrypoints::{run, run_internal};
    pub use crate::error::{FailureReason, SimulationError};
    pub use crate::routines::output::{write_series, write_trajectory, Series};
    pub use crate::routines::settings::Settings;
    pub use crate::simulator::model::{derivative, Seirv};
    pub use crate::simulator::{
        linspace, simulate, simulate_batch, OutputGrid, Scenario, Simulator, SolverOptions,
        TimeSpan,
    };
    pub use crate::structs::compartments::{Compartment, Compartments};
    pub use crate::structs::parameters::Parameters;
    pub use crate::structs::trajectory::{SolverStats, Trajectory, Warning};
}
