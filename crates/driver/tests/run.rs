mod common;

use approx::assert_relative_eq;

use ipdriver::bridge::Stage;
use ipdriver::{
    Action, ConfigError, Driver, Event, Failure, OptionSet, RunOutcome, State, StatusCode,
};

use common::{Newton, Probe, Quadratic};

fn options() -> OptionSet {
    OptionSet::new()
        .with("max_iterations", 50)
        .with("tolerance", 1e-6)
}

#[test]
fn converges_on_equality_constrained_quadratic() {
    let mut driver = Driver::new(Newton);
    driver.configure(&options()).unwrap();
    let mut model = Quadratic::default();

    let solution = driver.run(&mut model).unwrap();

    assert!(matches!(solution.outcome, RunOutcome::Converged));
    assert_eq!(driver.state(), State::Converged);
    assert_relative_eq!(solution.x[0], 0.0, epsilon = 1e-6);
    assert_relative_eq!(solution.x[1], 1.0, epsilon = 1e-6);
    assert_relative_eq!(solution.objective.unwrap(), 2.0, epsilon = 1e-6);
    assert_relative_eq!(solution.constraints[0], 1.0, epsilon = 1e-6);

    // The model is left at the reported solution.
    assert_eq!(model.x(), solution.x.as_slice());
}

#[test]
fn iteration_limit_is_reported() {
    let mut driver = Driver::new(Newton);
    driver
        .configure(&options().with("max_iterations", 1))
        .unwrap();

    let solution = driver.run(&mut Quadratic::default()).unwrap();

    assert!(matches!(solution.outcome, RunOutcome::MaxIterationsReached));
    assert_eq!(driver.state(), State::MaxIterationsReached);
    assert_relative_eq!(solution.x[1], 1.0, epsilon = 1e-6);
}

#[test]
fn zero_iterations_reports_initial_point() {
    let mut driver = Driver::new(Newton);
    driver
        .configure(&options().with("max_iterations", 0))
        .unwrap();
    let mut model = Quadratic::default();

    let solution = driver.run(&mut model).unwrap();

    assert!(matches!(solution.outcome, RunOutcome::MaxIterationsReached));
    assert_eq!(solution.callbacks, 0);
    assert_eq!(solution.x, vec![0.0, 0.0]);
    assert_relative_eq!(solution.objective.unwrap(), 5.0);
    assert_eq!(model.evaluations, 1);
}

#[test]
fn negative_iteration_limit_is_rejected() {
    let mut driver = Driver::new(Newton);

    let error = driver
        .configure(&options().with("max_iterations", -1))
        .unwrap_err();

    assert!(matches!(
        error,
        ConfigError::InvalidOptionValue { ref name, .. } if name == "max_iterations"
    ));
    assert_eq!(driver.state(), State::Unconfigured);
}

#[test]
fn unknown_option_is_rejected() {
    let mut driver = Driver::new(Newton);

    let error = driver
        .configure(&options().with("max_iter", 10))
        .unwrap_err();

    assert!(matches!(
        error,
        ConfigError::UnknownOption { ref name } if name == "max_iter"
    ));
    assert_eq!(driver.state(), State::Unconfigured);
}

#[test]
fn model_failure_carries_design_vector() {
    let mut driver = Driver::new(Newton);
    driver.configure(&options()).unwrap();
    let mut model = Quadratic::failing_on(3);

    let solution = driver.run(&mut model).unwrap();

    let Some(Failure::ModelEvaluation(error)) = solution.outcome.failure() else {
        panic!("expected a model failure, got {:?}", solution.outcome);
    };
    assert_eq!(error.design_vector.as_slice(), model.points[2].as_slice());
    assert_eq!(error.stage, Stage::Evaluate);
    assert_eq!(error.source.to_string(), "evaluation 3 failed");
    assert_eq!(driver.state(), State::Failed);

    // Nothing touches the model after the failure.
    assert_eq!(model.evaluations, 3);
    assert_eq!(model.points.len(), 3);
}

#[test]
fn repeated_gradient_requests_hit_the_cache() {
    let mut driver = Driver::new(Probe(vec![vec![0.0, 0.0], vec![0.5, 0.5]]));
    driver.configure(&options()).unwrap();
    let mut model = Quadratic::default();

    let mut cached = Vec::new();
    let solution = driver
        .run_observed(&mut model, |event: &Event<'_>| -> Option<Action> {
            if let Event::GradientsEvaluated { cached: hit, .. } = event {
                cached.push(*hit);
            }
            None
        })
        .unwrap();

    assert_eq!(cached, [false, true, false, true]);
    assert_eq!(model.gradient_requests, 2);
    assert_eq!(solution.counts.gradient_evaluations, 2);
    assert_eq!(solution.counts.cache_hits, 2);

    // Two probed points plus the final re-evaluation.
    assert_eq!(solution.counts.model_evaluations, 3);
}

#[test]
fn gradient_check_passes_for_exact_derivatives() {
    let mut driver = Driver::new(Newton);
    driver
        .configure(&options().with("check_gradients", true))
        .unwrap();

    let solution = driver.run(&mut Quadratic::default()).unwrap();

    let check = solution.gradient_check.unwrap();
    assert!(check.passed(), "{check:?}");
    assert!(matches!(solution.outcome, RunOutcome::Converged));
}

#[test]
fn aborted_status_without_failure_is_internal() {
    assert!(matches!(
        RunOutcome::from_status(StatusCode::ABORTED),
        RunOutcome::Failed(Failure::SolverInternal { code: -1 })
    ));
}

#[cfg(feature = "serde")]
#[test]
fn options_deserialize_from_json() {
    let json = r#"{
        "optimizer": "paropt",
        "max_iterations": 50,
        "tolerance": 1e-6,
        "print_results": false
    }"#;
    let set: OptionSet = serde_json::from_str(json).unwrap();

    let mut driver = Driver::new(Newton);
    driver.configure(&set).unwrap();

    let options = driver.options().unwrap();
    assert_eq!(options.optimizer(), "PAROPT");
    assert_eq!(options.max_iterations(), 50);
    assert!(!options.print_results());
}
