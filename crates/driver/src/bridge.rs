//! The adapter between solver callbacks and the host model.
//!
//! A [`Bridge`] exclusively borrows the host model for the duration of a run.
//! Each request sets the model's design point, evaluates it, and reads values
//! back in the flat form a solver expects. Derivatives are cached by design
//! vector so that a solver asking for constraint values and gradients at the
//! same point in separate calls triggers only one derivative computation.
//!
//! Failures are returned as [`ModelEvaluationError`], carrying the offending
//! design vector. The bridge never retries: a solver's callback sequence must
//! stay deterministic and in order.

mod cache;
mod error;
mod gradient_check;
mod layout;


pub use error::{ModelEvaluationError, Stage};
pub use gradient_check::{GradientCheck, Mismatch, Response};
pub use layout::{Layout, LayoutError};

use log::{debug, trace};

use ipdriver_core::{DesignVector, Direction, Gradients, HostModel, ShapeError, SparseMatrix};

use cache::GradientCache;

/// Counts of the work the bridge has asked of the host model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Calls to [`HostModel::evaluate`].
    pub model_evaluations: usize,

    /// Calls to [`HostModel::gradients`].
    pub gradient_evaluations: usize,

    /// Gradient requests served from the cache.
    pub cache_hits: usize,
}

/// Serves solver requests by evaluating a host model.
pub struct Bridge<'a, M: HostModel> {
    model: &'a mut M,
    layout: &'a Layout,
    direction: Direction,
    cache: GradientCache,

    /// The design point the model was last evaluated at, if that evaluation
    /// succeeded.
    current: Option<DesignVector>,

    counts: Counts,
}

impl<'a, M: HostModel> Bridge<'a, M> {
    /// Creates a bridge over `model` with the dimensions in `layout`.
    ///
    /// Derivatives are requested from the model in `direction`.
    pub fn new(model: &'a mut M, layout: &'a Layout, direction: Direction) -> Self {
        Self {
            model,
            layout,
            direction,
            cache: GradientCache::default(),
            current: None,
            counts: Counts::default(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        self.layout
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn counts(&self) -> Counts {
        self.counts
    }

    /// Returns the host model, for reading state between requests.
    #[must_use]
    pub fn model(&self) -> &M {
        &*self.model
    }

    /// Evaluates the model at `x` and returns the objective and constraints.
    ///
    /// Cached derivatives computed at any other vector are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong length, any model call fails, or
    /// the model returns the wrong number of constraints.
    pub fn evaluate_objective_and_constraints(
        &mut self,
        x: &[f64],
    ) -> Result<(f64, Vec<f64>), ModelEvaluationError> {
        self.check_len(x)?;
        self.cache.retain_for(x);

        evaluate_at(&mut *self.model, &mut self.current, &mut self.counts, x)?;

        let objective = self
            .model
            .objective()
            .map_err(|e| ModelEvaluationError::new(x, Stage::Objective, e))?;
        let constraints = self
            .model
            .constraints()
            .map_err(|e| ModelEvaluationError::new(x, Stage::Constraints, e))?;

        if constraints.len() != self.layout.num_constraints() {
            return Err(shape_error(
                x,
                ShapeError::Length {
                    expected: self.layout.num_constraints(),
                    actual: constraints.len(),
                },
            ));
        }

        trace!("objective {objective} at x = {x:?}");
        Ok((objective, constraints))
    }

    /// Returns the objective gradient and constraint Jacobian at `x`.
    ///
    /// Served from the cache when the last derivatives were computed at `x`.
    /// Otherwise the model is moved to `x` (evaluating it if it is not already
    /// there) and asked for derivatives.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` has the wrong length, any model call fails, or
    /// the derivatives have the wrong shape or fall outside the declared
    /// sparsity pattern.
    pub fn evaluate_gradients(
        &mut self,
        x: &[f64],
    ) -> Result<(Vec<f64>, SparseMatrix), ModelEvaluationError> {
        let (gradients, _, _) = self.gradients_at(x)?;
        Ok((gradients.objective.clone(), gradients.jacobian.clone()))
    }

    /// Writes the derivatives at `x` into solver buffers, Jacobian values in
    /// sparsity order.
    ///
    /// Returns `true` if the values came from the cache.
    ///
    /// # Errors
    ///
    /// As for [`Bridge::evaluate_gradients`], plus a shape error if the buffers
    /// have the wrong length.
    pub fn pack_gradients(
        &mut self,
        x: &[f64],
        objective: &mut [f64],
        jacobian: &mut [f64],
    ) -> Result<bool, ModelEvaluationError> {
        let (gradients, packed, hit) = self.gradients_at(x)?;

        if objective.len() != gradients.objective.len() || jacobian.len() != packed.len() {
            let (expected, actual) = if objective.len() == gradients.objective.len() {
                (packed.len(), jacobian.len())
            } else {
                (gradients.objective.len(), objective.len())
            };
            return Err(shape_error(x, ShapeError::Length { expected, actual }));
        }

        objective.copy_from_slice(&gradients.objective);
        jacobian.copy_from_slice(packed);
        Ok(hit)
    }

    /// Compares analytic derivatives at `x` against forward differences.
    ///
    /// Costs one model evaluation per variable plus two. The model is left
    /// evaluated at `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if any evaluation fails.
    pub fn check_gradients(
        &mut self,
        x: &[f64],
        step: f64,
        tolerance: f64,
    ) -> Result<GradientCheck, ModelEvaluationError> {
        let (f0, c0) = self.evaluate_objective_and_constraints(x)?;
        let (grad, jacobian) = self.evaluate_gradients(x)?;
        let jacobian = jacobian.to_dense();

        let mut check = GradientCheck::default();
        let mut perturbed = x.to_vec();
        for j in 0..x.len() {
            perturbed[j] = x[j] + step;
            let (f, c) = self.evaluate_objective_and_constraints(&perturbed)?;
            perturbed[j] = x[j];

            check.record(Response::Objective, j, grad[j], (f - f0) / step, tolerance);
            for (i, (ci, ci0)) in c.iter().zip(&c0).enumerate() {
                check.record(
                    Response::Constraint(i),
                    j,
                    jacobian[i][j],
                    (ci - ci0) / step,
                    tolerance,
                );
            }
        }

        self.evaluate_objective_and_constraints(x)?;
        debug!(
            "gradient check at x = {x:?}: max abs error {:.3e}, max rel error {:.3e}",
            check.max_abs_error, check.max_rel_error
        );
        Ok(check)
    }

    fn gradients_at(
        &mut self,
        x: &[f64],
    ) -> Result<(&Gradients, &[f64], bool), ModelEvaluationError> {
        self.check_len(x)?;

        let Self {
            model,
            layout,
            direction,
            cache,
            current,
            counts,
        } = self;

        let (entry, hit) = cache.get_or_try_insert_with(x, || {
            if !current.as_ref().is_some_and(|c| c.matches(x)) {
                evaluate_at(&mut **model, current, counts, x)?;
            }

            counts.gradient_evaluations += 1;
            let gradients = model
                .gradients(*direction)
                .map_err(|e| ModelEvaluationError::new(x, Stage::Gradients, e))?;

            if gradients.objective.len() != layout.num_variables() {
                return Err(shape_error(
                    x,
                    ShapeError::Length {
                        expected: layout.num_variables(),
                        actual: gradients.objective.len(),
                    },
                ));
            }
            let packed = gradients
                .jacobian
                .pack(layout.sparsity())
                .map_err(|e| shape_error(x, e))?;

            Ok((gradients, packed))
        })?;

        if hit {
            counts.cache_hits += 1;
        }
        trace!("gradients at x = {x:?} (cached: {hit})");
        Ok((&entry.gradients, entry.packed.as_slice(), hit))
    }

    fn check_len(&self, x: &[f64]) -> Result<(), ModelEvaluationError> {
        let expected = self.layout.num_variables();
        if x.len() == expected {
            Ok(())
        } else {
            Err(shape_error(
                x,
                ShapeError::Length {
                    expected,
                    actual: x.len(),
                },
            ))
        }
    }
}

/// Moves the model to `x` and evaluates it, tracking the evaluated point.
fn evaluate_at<M: HostModel>(
    model: &mut M,
    current: &mut Option<DesignVector>,
    counts: &mut Counts,
    x: &[f64],
) -> Result<(), ModelEvaluationError> {
    *current = None;
    model
        .set_design_point(x)
        .map_err(|e| ModelEvaluationError::new(x, Stage::SetDesignPoint, e))?;

    counts.model_evaluations += 1;
    model
        .evaluate()
        .map_err(|e| ModelEvaluationError::new(x, Stage::Evaluate, e))?;

    *current = Some(DesignVector::from(x));
    Ok(())
}

fn shape_error(x: &[f64], error: ShapeError) -> ModelEvaluationError {
    ModelEvaluationError::new(x, Stage::Shape, error)
}
