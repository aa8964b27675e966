use crate::bridge::ModelEvaluationError;

/// Events emitted by the driver, one per solver callback.
///
/// Observers see every callback as it is served. Returning [`Action::Abort`]
/// from an observer raises an error inside the callback, which stops the
/// solver and fails the run.
#[derive(Debug)]
pub enum Event<'a> {
    /// The model was evaluated for objective and constraints.
    Evaluated {
        x: &'a [f64],
        objective: f64,
        constraints: &'a [f64],
    },

    /// Derivatives were served.
    GradientsEvaluated {
        x: &'a [f64],

        /// Whether the derivatives came from the cache.
        cached: bool,
    },

    /// A callback failed; the run will stop.
    Failed { error: &'a ModelEvaluationError },
}

impl Event<'_> {
    /// Returns the design vector the callback was issued at.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        match self {
            Self::Evaluated { x, .. } | Self::GradientsEvaluated { x, .. } => *x,
            Self::Failed { error } => error.design_vector.as_slice(),
        }
    }
}

/// Actions an observer can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the run. The solver is told to abort and the run fails.
    Abort,
}
