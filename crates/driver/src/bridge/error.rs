use std::{error::Error as StdError, fmt};

use thiserror::Error;

use ipdriver_core::DesignVector;

/// The step of a model evaluation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SetDesignPoint,
    Evaluate,
    Objective,
    Constraints,
    Gradients,

    /// The model returned values of the wrong shape.
    Shape,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetDesignPoint => "set design point",
            Self::Evaluate => "evaluate",
            Self::Objective => "objective",
            Self::Constraints => "constraints",
            Self::Gradients => "gradients",
            Self::Shape => "shape check",
        };
        f.write_str(name)
    }
}

/// The host model failed while serving a solver callback.
///
/// Carries the design vector the solver passed, so the caller can inspect the
/// point or restart from it.
#[derive(Debug, Error)]
#[error("model evaluation failed ({stage}) at x = {x:?}", x = .design_vector.as_slice())]
pub struct ModelEvaluationError {
    pub design_vector: DesignVector,
    pub stage: Stage,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl ModelEvaluationError {
    pub(crate) fn new<E>(x: &[f64], stage: Stage, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            design_vector: DesignVector::from(x),
            stage,
            source: Box::new(source),
        }
    }
}
