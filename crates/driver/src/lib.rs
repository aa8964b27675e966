//! Runs host models through external interior-point optimizers.
//!
//! The crate adapts a host framework's model to a solver library it does not
//! implement itself:
//!
//! - [`options`] — the validated option set a run is configured with
//! - [`registry`] — the optimizers a backend may provide and what they require
//! - [`solver`] — the traits an external solver library is reached through
//! - [`bridge`] — serves solver callbacks by evaluating the host model
//! - [`driver`] — the run lifecycle, from configuration to a classified outcome
//!
//! A typical run configures a [`Driver`] from an [`OptionSet`] and hands it a
//! model:
//!
//! ```ignore
//! let mut driver = Driver::new(backend);
//! driver.configure(&OptionSet::new().with("max_iterations", 50))?;
//! let solution = driver.run(&mut model)?;
//! ```

pub mod bridge;
pub mod driver;
pub mod options;
pub mod registry;
pub mod solver;

pub use driver::{
    Action, Driver, Event, Failure, RunError, RunOutcome, Solution, SolverUnavailableError, State,
};
pub use options::{ConfigError, DerivativeMode, OptionSet, OptionValue, Options};
pub use solver::{Aborted, Backend, Callbacks, ExternalSolver, Setup, StatusCode};

pub use ipdriver_core::{
    ConstraintBounds, DesignSpace, DesignVector, Direction, Gradients, HostModel, Observer,
    SparseMatrix, SparsityPattern,
};
