use log::{debug, warn};

use ipdriver_core::{HostModel, Observer, ShapeError};

use crate::bridge::{Bridge, GradientCheck, ModelEvaluationError, Stage};
use crate::options::Options;
use crate::solver::{Aborted, Callbacks, ExternalSolver};

use super::{Action, Event, Failure, RunOutcome, Solution};

/// Serves solver callbacks for one run.
///
/// The first failure is recorded and every later callback is refused without
/// touching the model, so a solver can never resume past a failed evaluation.
pub(super) struct Session<'a, M: HostModel, Obs> {
    bridge: Bridge<'a, M>,
    observer: Obs,
    failure: Option<Failure>,
    callbacks: usize,
}

impl<'a, M, Obs> Session<'a, M, Obs>
where
    M: HostModel,
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    pub(super) fn new(bridge: Bridge<'a, M>, observer: Obs) -> Self {
        Self {
            bridge,
            observer,
            failure: None,
            callbacks: 0,
        }
    }

    /// Runs the optional gradient check and the solver, then classifies the result.
    pub(super) fn run<S: ExternalSolver>(
        mut self,
        solver: &mut S,
        options: &Options,
    ) -> Solution {
        let initial = self.bridge.layout().design_space().initial().to_vec();

        let gradient_check = if options.check_gradients() {
            match self.bridge.check_gradients(
                &initial,
                options.gradient_check_step(),
                options.gradient_check_tolerance(),
            ) {
                Ok(check) => {
                    for mismatch in &check.mismatches {
                        warn!(
                            "d{:?}/dx[{}]: analytic {:.6e}, finite difference {:.6e}",
                            mismatch.response,
                            mismatch.variable,
                            mismatch.analytic,
                            mismatch.finite_difference
                        );
                    }
                    Some(check)
                }
                Err(error) => {
                    warn!("gradient check failed: {error}");
                    return self.finish(RunOutcome::Failed(error.into()), initial, None);
                }
            }
        } else {
            None
        };

        let status = solver.optimize(&mut self);
        debug!(
            "solver returned status {status} after {} callbacks",
            self.callbacks
        );

        let outcome = match self.failure.take() {
            Some(failure) => RunOutcome::Failed(failure),
            None => RunOutcome::from_status(status),
        };
        let x = solver.design_point().to_vec();
        self.finish(outcome, x, gradient_check)
    }

    /// Leaves the model evaluated at the reported point and builds the solution.
    fn finish(
        mut self,
        outcome: RunOutcome,
        x: Vec<f64>,
        gradient_check: Option<GradientCheck>,
    ) -> Solution {
        let (outcome, objective, constraints) = if outcome.is_failed() {
            (outcome, None, Vec::new())
        } else {
            match self.bridge.evaluate_objective_and_constraints(&x) {
                Ok((objective, constraints)) => (outcome, Some(objective), constraints),
                Err(error) => (RunOutcome::Failed(error.into()), None, Vec::new()),
            }
        };

        Solution {
            outcome,
            x,
            objective,
            constraints,
            counts: self.bridge.counts(),
            callbacks: self.callbacks,
            gradient_check,
        }
    }

    /// Refuses the callback if the run has already failed.
    fn admit(&mut self, x: &[f64]) -> Result<(), Aborted> {
        if let Some(failure) = &self.failure {
            warn!("refusing callback at x = {x:?}: run already failed ({failure})");
            return Err(Aborted);
        }
        self.callbacks += 1;
        Ok(())
    }

    /// Records a model failure and tells the solver to stop.
    fn fail(&mut self, error: ModelEvaluationError) -> Aborted {
        warn!("{error}");
        let _action = self.observer.observe(&Event::Failed { error: &error });
        self.failure = Some(Failure::ModelEvaluation(error));
        Aborted
    }

    /// Shows an event to the observer, aborting if it asks to.
    fn notify(&mut self, event: &Event<'_>) -> Result<(), Aborted> {
        match self.observer.observe(event) {
            Some(Action::Abort) => {
                debug!("observer aborted the run at x = {:?}", event.x());
                self.failure = Some(Failure::Aborted {
                    design_vector: event.x().into(),
                });
                Err(Aborted)
            }
            None => Ok(()),
        }
    }
}

impl<M, Obs> Callbacks for Session<'_, M, Obs>
where
    M: HostModel,
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    fn objective_and_constraints(
        &mut self,
        x: &[f64],
        constraints: &mut [f64],
    ) -> Result<f64, Aborted> {
        self.admit(x)?;

        let (objective, values) = match self.bridge.evaluate_objective_and_constraints(x) {
            Ok(result) => result,
            Err(error) => return Err(self.fail(error)),
        };
        if constraints.len() != values.len() {
            let error = ShapeError::Length {
                expected: values.len(),
                actual: constraints.len(),
            };
            return Err(self.fail(ModelEvaluationError::new(x, Stage::Shape, error)));
        }
        constraints.copy_from_slice(&values);

        debug!("callback {}: objective {objective:.8e}", self.callbacks);
        self.notify(&Event::Evaluated {
            x,
            objective,
            constraints: &values,
        })?;
        Ok(objective)
    }

    fn gradients(
        &mut self,
        x: &[f64],
        objective: &mut [f64],
        jacobian: &mut [f64],
    ) -> Result<(), Aborted> {
        self.admit(x)?;

        let cached = match self.bridge.pack_gradients(x, objective, jacobian) {
            Ok(cached) => cached,
            Err(error) => return Err(self.fail(error)),
        };

        debug!("callback {}: gradients (cached: {cached})", self.callbacks);
        self.notify(&Event::GradientsEvaluated { x, cached })
    }
}
