#![allow(dead_code)]

use std::convert::Infallible;

use thiserror::Error;

use ipdriver::registry::Capability;
use ipdriver::{
    Backend, Callbacks, ConstraintBounds, DesignSpace, Direction, ExternalSolver, Gradients,
    HostModel, Setup, SparseMatrix, SparsityPattern, StatusCode,
};

/// Every capability a backend can declare.
pub const ALL_CAPABILITIES: &[Capability] = &[
    Capability::Gradients,
    Capability::SparseJacobian,
    Capability::EqualityConstraints,
    Capability::InequalityConstraints,
    Capability::VariableBounds,
];

/// Newton's method on the KKT system of an equality-constrained problem.
///
/// Stands in for an external interior-point library. The Hessian of the
/// objective is approximated by forward differences of gradient callbacks,
/// and range constraints are assumed inactive.
pub struct Newton;

impl Backend for Newton {
    type Solver = NewtonSolver;
    type Error = Infallible;

    fn name(&self) -> &str {
        "PAROPT"
    }

    fn capabilities(&self) -> &[Capability] {
        ALL_CAPABILITIES
    }

    fn construct(&self, setup: &Setup<'_>) -> Result<NewtonSolver, Infallible> {
        let equalities = setup
            .constraint_bounds
            .iter()
            .enumerate()
            .filter_map(|(i, bounds)| match bounds {
                ConstraintBounds::Equal(value) => Some((i, *value)),
                ConstraintBounds::Range { .. } => None,
            })
            .collect();

        Ok(NewtonSolver {
            x: setup.design_space.initial().to_vec(),
            tolerance: setup.tolerance,
            max_iterations: setup.max_iterations,
            num_constraints: setup.num_constraints(),
            sparsity: setup.sparsity.clone(),
            equalities,
            iterations: 0,
        })
    }
}

pub struct NewtonSolver {
    x: Vec<f64>,
    tolerance: f64,
    max_iterations: usize,
    num_constraints: usize,
    sparsity: SparsityPattern,
    equalities: Vec<(usize, f64)>,
    pub iterations: usize,
}

/// Status returned when the KKT matrix is singular.
pub const SINGULAR: StatusCode = StatusCode(2);

const HESSIAN_STEP: f64 = 1e-6;

impl NewtonSolver {
    fn gradient(&self, callbacks: &mut dyn Callbacks, x: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
        let mut objective = vec![0.0; x.len()];
        let mut jacobian = vec![0.0; self.sparsity.len()];
        callbacks
            .gradients(x, &mut objective, &mut jacobian)
            .ok()?;
        Some((objective, jacobian))
    }

    fn step(&self, callbacks: &mut dyn Callbacks) -> Result<Option<Vec<f64>>, StatusCode> {
        let n = self.x.len();
        let k = self.equalities.len();

        let mut constraints = vec![0.0; self.num_constraints];
        callbacks
            .objective_and_constraints(&self.x, &mut constraints)
            .map_err(|_| StatusCode::ABORTED)?;
        let (grad, packed) = self
            .gradient(callbacks, &self.x)
            .ok_or(StatusCode::ABORTED)?;

        let mut hessian = vec![vec![0.0; n]; n];
        let mut perturbed = self.x.clone();
        for j in 0..n {
            perturbed[j] += HESSIAN_STEP;
            let (grad_j, _) = self
                .gradient(callbacks, &perturbed)
                .ok_or(StatusCode::ABORTED)?;
            perturbed[j] = self.x[j];
            for i in 0..n {
                hessian[i][j] = (grad_j[i] - grad[i]) / HESSIAN_STEP;
            }
        }

        let mut jacobian = vec![vec![0.0; n]; self.num_constraints];
        for (&(row, col), value) in self.sparsity.entries().iter().zip(&packed) {
            jacobian[row][col] = *value;
        }

        // [H  Aᵀ] [dx]   [-g    ]
        // [A  0 ] [λ ] = [b - c ]
        let size = n + k;
        let mut kkt = vec![vec![0.0; size + 1]; size];
        for i in 0..n {
            kkt[i][..n].copy_from_slice(&hessian[i]);
            kkt[i][size] = -grad[i];
        }
        for (r, &(row, target)) in self.equalities.iter().enumerate() {
            for j in 0..n {
                kkt[n + r][j] = jacobian[row][j];
                kkt[j][n + r] = jacobian[row][j];
            }
            kkt[n + r][size] = target - constraints[row];
        }

        let solution = solve(kkt).ok_or(SINGULAR)?;
        let dx = &solution[..n];
        let feasible = self
            .equalities
            .iter()
            .all(|&(row, target)| (constraints[row] - target).abs() < self.tolerance);
        let norm = dx.iter().map(|v| v * v).sum::<f64>().sqrt();

        if feasible && norm < self.tolerance {
            Ok(None)
        } else {
            Ok(Some(self.x.iter().zip(dx).map(|(x, d)| x + d).collect()))
        }
    }
}

impl ExternalSolver for NewtonSolver {
    fn optimize(&mut self, callbacks: &mut dyn Callbacks) -> StatusCode {
        while self.iterations < self.max_iterations {
            match self.step(callbacks) {
                Ok(None) => return StatusCode::CONVERGED,
                Ok(Some(next)) => self.x = next,
                Err(status) => return status,
            }
            self.iterations += 1;
        }
        StatusCode::MAX_ITERATIONS
    }

    fn design_point(&self) -> &[f64] {
        &self.x
    }
}

/// Solves an augmented system by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let size = a.len();
    for col in 0..size {
        let pivot = (col..size).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        for row in col + 1..size {
            let factor = a[row][col] / a[col][col];
            for k in col..=size {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let mut x = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| a[row][k] * x[k]).sum();
        x[row] = (a[row][size] - tail) / a[row][row];
    }
    Some(x)
}

/// A backend that evaluates each listed point, then asks for its gradients
/// twice.
pub struct Probe(pub Vec<Vec<f64>>);

impl Backend for Probe {
    type Solver = ProbeSolver;
    type Error = Infallible;

    fn name(&self) -> &str {
        "PAROPT"
    }

    fn capabilities(&self) -> &[Capability] {
        ALL_CAPABILITIES
    }

    fn construct(&self, setup: &Setup<'_>) -> Result<ProbeSolver, Infallible> {
        Ok(ProbeSolver {
            points: self.0.clone(),
            x: setup.design_space.initial().to_vec(),
            num_constraints: setup.num_constraints(),
            nnz: setup.sparsity.len(),
        })
    }
}

pub struct ProbeSolver {
    points: Vec<Vec<f64>>,
    x: Vec<f64>,
    num_constraints: usize,
    nnz: usize,
}

impl ExternalSolver for ProbeSolver {
    fn optimize(&mut self, callbacks: &mut dyn Callbacks) -> StatusCode {
        let mut constraints = vec![0.0; self.num_constraints];
        let mut jacobian = vec![0.0; self.nnz];

        for point in &self.points {
            let mut gradient = vec![0.0; point.len()];
            let served = callbacks
                .objective_and_constraints(point, &mut constraints)
                .and_then(|_| callbacks.gradients(point, &mut gradient, &mut jacobian))
                .and_then(|()| callbacks.gradients(point, &mut gradient, &mut jacobian));
            if served.is_err() {
                return StatusCode::ABORTED;
            }
            self.x.clone_from(point);
        }
        StatusCode::CONVERGED
    }

    fn design_point(&self) -> &[f64] {
        &self.x
    }
}

#[derive(Debug, Error)]
#[error("evaluation {0} failed")]
pub struct EvaluationFailed(pub usize);

/// f(x) = (x0 - 1)² + (x1 - 2)² subject to x0 + x1 = 1.
///
/// Records every design point it is set to and every gradient request.
#[derive(Debug, Default)]
pub struct Quadratic {
    x: Vec<f64>,
    pub points: Vec<Vec<f64>>,
    pub evaluations: usize,
    pub gradient_requests: usize,

    /// Fail the evaluation with this 1-based index.
    pub fail_on: Option<usize>,
}

impl Quadratic {
    pub fn failing_on(evaluation: usize) -> Self {
        Self {
            fail_on: Some(evaluation),
            ..Self::default()
        }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }
}

impl HostModel for Quadratic {
    type Error = EvaluationFailed;

    fn design_space(&self) -> DesignSpace {
        DesignSpace::new(vec![0.0, 0.0], vec![-10.0, -10.0], vec![10.0, 10.0])
            .expect("bounds are ordered")
    }

    fn constraint_bounds(&self) -> Vec<ConstraintBounds> {
        vec![ConstraintBounds::Equal(1.0)]
    }

    fn set_design_point(&mut self, x: &[f64]) -> Result<(), EvaluationFailed> {
        self.x = x.to_vec();
        self.points.push(x.to_vec());
        Ok(())
    }

    fn evaluate(&mut self) -> Result<(), EvaluationFailed> {
        self.evaluations += 1;
        match self.fail_on {
            Some(n) if n == self.evaluations => Err(EvaluationFailed(n)),
            _ => Ok(()),
        }
    }

    fn objective(&self) -> Result<f64, EvaluationFailed> {
        Ok((self.x[0] - 1.0).powi(2) + (self.x[1] - 2.0).powi(2))
    }

    fn constraints(&self) -> Result<Vec<f64>, EvaluationFailed> {
        Ok(vec![self.x[0] + self.x[1]])
    }

    fn gradients(&mut self, _direction: Direction) -> Result<Gradients, EvaluationFailed> {
        self.gradient_requests += 1;
        let jacobian = SparseMatrix::from_triplets(1, 2, [(0, 0, 1.0), (0, 1, 1.0)])
            .expect("entries are in range");
        Ok(Gradients::new(
            vec![2.0 * (self.x[0] - 1.0), 2.0 * (self.x[1] - 2.0)],
            jacobian,
        ))
    }
}
