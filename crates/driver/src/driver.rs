//! The run controller: configures a backend solver and drives one run.
//!
//! # Lifecycle
//!
//! A [`Driver`] moves through [`State`]s:
//!
//! ```text
//! Unconfigured -> Configured -> Running -> Converged
//!                                       -> MaxIterationsReached
//!                                       -> Failed
//! ```
//!
//! Configuration errors and errors that prevent a run from starting leave the
//! state unchanged. A finished driver stays finished until [`Driver::reset`].
//!
//! # Observer Events
//!
//! Every solver callback emits one [`Event`]:
//!
//! - [`Event::Evaluated`] — objective and constraints were computed
//! - [`Event::GradientsEvaluated`] — derivatives were served, possibly cached
//! - [`Event::Failed`] — the host model failed; the run stops
//!
//! Observers can return [`Action::Abort`] to stop the run, which then ends as
//! [`Failure::Aborted`].

mod error;
mod event;
mod outcome;
mod session;


pub use error::{RunError, SolverUnavailableError};
pub use event::{Action, Event};
pub use outcome::{Failure, RunOutcome, Solution};

use log::{debug, info};

use ipdriver_core::{HostModel, Observer};

use crate::bridge::{Bridge, Layout};
use crate::options::{ConfigError, OptionSet, Options};
use crate::registry::{self, Capability};
use crate::solver::{Backend, Setup};

use session::Session;

/// Where a driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Unconfigured,
    Configured,

    /// A run is in progress.
    Running,

    Converged,
    MaxIterationsReached,
    Failed,
}

impl State {
    /// Returns `true` once a run has ended, successfully or not.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Converged | Self::MaxIterationsReached | Self::Failed
        )
    }
}

/// Drives an external solver over a host model.
#[derive(Debug)]
pub struct Driver<B: Backend> {
    backend: B,
    state: State,
    options: Option<Options>,
}

impl<B: Backend> Driver<B> {
    /// Creates an unconfigured driver for `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: State::Unconfigured,
            options: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the validated options, once configured.
    #[must_use]
    pub fn options(&self) -> Option<&Options> {
        self.options.as_ref()
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validates `set` and stores the resulting options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyConfigured`] unless the driver is
    /// unconfigured, or the validation error for the first bad option. The
    /// state is unchanged on error.
    pub fn configure(&mut self, set: &OptionSet) -> Result<(), ConfigError> {
        self.ensure_unconfigured()?;
        let options = Options::from_set(set)?;
        self.configure_with(options)
    }

    /// Stores an already validated options snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyConfigured`] unless the driver is
    /// unconfigured.
    pub fn configure_with(&mut self, options: Options) -> Result<(), ConfigError> {
        self.ensure_unconfigured()?;
        debug!("configured {} ({})", options.optimizer(), options.title());
        self.options = Some(options);
        self.state = State::Configured;
        Ok(())
    }

    /// Returns the driver to the unconfigured state, discarding its options.
    pub fn reset(&mut self) {
        self.options = None;
        self.state = State::Unconfigured;
    }

    /// Runs the configured optimizer over `model`.
    ///
    /// This is a convenience wrapper around [`Driver::run_observed`] that uses
    /// a no-op observer.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot start. Failures during the run are
    /// reported in the returned [`Solution`].
    pub fn run<M: HostModel>(&mut self, model: &mut M) -> Result<Solution, RunError> {
        self.run_observed(model, ())
    }

    /// Runs the configured optimizer over `model`, showing each callback to
    /// `observer`.
    ///
    /// Blocks until the solver returns. The model is left evaluated at the
    /// reported solution unless the run failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not configured, has already
    /// finished, the model's layout is invalid, or the backend cannot run the
    /// configured optimizer on this problem. The state is unchanged on error.
    pub fn run_observed<M, Obs>(
        &mut self,
        model: &mut M,
        observer: Obs,
    ) -> Result<Solution, RunError>
    where
        M: HostModel,
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        let options = match (self.state, &self.options) {
            (State::Configured, Some(options)) => options,
            (state, _) if state.is_finished() => return Err(RunError::AlreadyFinished),
            _ => return Err(RunError::NotConfigured),
        };

        let layout = Layout::from_model(model)?;
        check_availability(&self.backend, options, &layout)?;

        let setup = Setup {
            title: options.title(),
            tolerance: options.tolerance(),
            max_iterations: options.max_iterations(),
            print_level: options.print_level(),
            design_space: layout.design_space(),
            constraint_bounds: layout.constraint_bounds(),
            sparsity: layout.sparsity(),
        };
        let mut solver = self
            .backend
            .construct(&setup)
            .map_err(|e| SolverUnavailableError::Construction {
                backend: self.backend.name().to_owned(),
                source: Box::new(e),
            })?;

        let direction = options
            .derivative_mode()
            .resolve(layout.num_variables(), layout.num_constraints());
        info!(
            "{}: {} on {} variables, {} constraints, {} Jacobian entries ({direction:?})",
            options.title(),
            options.optimizer(),
            layout.num_variables(),
            layout.num_constraints(),
            layout.sparsity().len(),
        );

        self.state = State::Running;
        let bridge = Bridge::new(model, &layout, direction);
        let solution = Session::new(bridge, observer).run(&mut solver, options);
        self.state = solution.outcome.state();

        if options.print_results() {
            print_results(options, &solution);
        }
        Ok(solution)
    }

    fn ensure_unconfigured(&self) -> Result<(), ConfigError> {
        if self.state == State::Unconfigured {
            Ok(())
        } else {
            Err(ConfigError::AlreadyConfigured)
        }
    }
}

/// Checks that `backend` can run the configured optimizer on `layout`.
fn check_availability<B: Backend>(
    backend: &B,
    options: &Options,
    layout: &Layout,
) -> Result<(), SolverUnavailableError> {
    let requested = options.optimizer();
    let descriptor =
        registry::descriptor(requested).ok_or_else(|| SolverUnavailableError::UnknownOptimizer {
            name: requested.to_owned(),
        })?;

    if !backend.name().eq_ignore_ascii_case(descriptor.name) {
        return Err(SolverUnavailableError::WrongBackend {
            requested: descriptor.name.to_owned(),
            backend: backend.name().to_owned(),
        });
    }

    let needed = [
        (layout.has_equality_constraints(), Capability::EqualityConstraints),
        (layout.has_inequality_constraints(), Capability::InequalityConstraints),
        (layout.design_space().is_bounded(), Capability::VariableBounds),
    ];
    let problem = needed
        .into_iter()
        .filter_map(|(needed, capability)| needed.then_some(capability));

    let provided = backend.capabilities();
    match descriptor
        .requires
        .iter()
        .copied()
        .chain(problem)
        .find(|capability| !provided.contains(capability))
    {
        Some(capability) => Err(SolverUnavailableError::MissingCapability {
            backend: backend.name().to_owned(),
            capability,
        }),
        None => Ok(()),
    }
}

fn print_results(options: &Options, solution: &Solution) {
    info!("{}: {:?}", options.title(), solution.outcome);
    if let Some(objective) = solution.objective {
        info!("objective: {objective:.10e}");
    }
    info!("design variables: {:?}", solution.x);
    if !solution.constraints.is_empty() {
        info!("constraints: {:?}", solution.constraints);
    }
    info!(
        "{} callbacks, {} model evaluations, {} gradient evaluations ({} cached)",
        solution.callbacks,
        solution.counts.model_evaluations,
        solution.counts.gradient_evaluations,
        solution.counts.cache_hits,
    );
    if options.optimizer() == "PAROPT" {
        debug!("if you use ParOpt in published work, please cite:\n{}", registry::CITATIONS);
    }
}
