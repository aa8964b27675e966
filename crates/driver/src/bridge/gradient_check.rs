/// A response whose derivative was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Objective,

    /// A constraint, by index.
    Constraint(usize),
}

/// A derivative whose analytic value disagrees with its finite difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub response: Response,

    /// Index of the design variable.
    pub variable: usize,

    pub analytic: f64,
    pub finite_difference: f64,
}

impl Mismatch {
    #[must_use]
    pub fn abs_error(&self) -> f64 {
        (self.analytic - self.finite_difference).abs()
    }
}

/// Result of comparing analytic derivatives against forward differences.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradientCheck {
    /// Largest absolute difference over all checked derivatives.
    pub max_abs_error: f64,

    /// Largest difference relative to `max(1, |finite difference|)`.
    pub max_rel_error: f64,

    /// Derivatives whose relative error exceeds the tolerance.
    pub mismatches: Vec<Mismatch>,
}

impl GradientCheck {
    /// Returns `true` if every derivative is within tolerance.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub(super) fn record(
        &mut self,
        response: Response,
        variable: usize,
        analytic: f64,
        finite_difference: f64,
        tolerance: f64,
    ) {
        let abs_error = (analytic - finite_difference).abs();
        let rel_error = abs_error / finite_difference.abs().max(1.0);

        self.max_abs_error = self.max_abs_error.max(abs_error);
        self.max_rel_error = self.max_rel_error.max(rel_error);

        // Also catches a NaN on either side.
        if !(rel_error <= tolerance) {
            self.mismatches.push(Mismatch {
                response,
                variable,
                analytic,
                finite_difference,
            });
        }
    }
}
