use approx::assert_relative_eq;

use ipdriver_core::Direction;

use super::{ConfigError, DerivativeMode, OptionSet, OptionValue, Options};

#[test]
fn empty_set_gives_defaults() {
    let options = Options::from_set(&OptionSet::new()).unwrap();
    assert_eq!(options, Options::default());
    assert_eq!(options.optimizer(), "PAROPT");
    assert_eq!(options.max_iterations(), 100);
    assert!(options.print_results());
}

#[test]
fn accepts_tolerance_and_iteration_limit() {
    let set = OptionSet::new()
        .with("max_iterations", 50)
        .with("tolerance", 1e-6);

    let options = Options::from_set(&set).unwrap();

    assert_eq!(options.max_iterations(), 50);
    assert_relative_eq!(options.tolerance(), 1e-6);
}

#[test]
fn integer_tolerance_is_accepted() {
    let options = Options::from_set(&OptionSet::new().with("tolerance", 1)).unwrap();
    assert_relative_eq!(options.tolerance(), 1.0);
}

#[test]
fn unknown_option_is_rejected() {
    let set = OptionSet::new().with("tolerence", 1e-6);

    assert_eq!(
        Options::from_set(&set),
        Err(ConfigError::UnknownOption {
            name: "tolerence".into()
        })
    );
}

#[test]
fn unknown_option_wins_over_invalid_value() {
    // "max_iterations" sorts before "zzz", so an in-order scan would report
    // the invalid value first.
    let set = OptionSet::new()
        .with("max_iterations", -1)
        .with("zzz", true);

    assert!(matches!(
        Options::from_set(&set),
        Err(ConfigError::UnknownOption { name }) if name == "zzz"
    ));
}

#[test]
fn negative_max_iterations_is_invalid() {
    let set = OptionSet::new().with("max_iterations", -1);

    assert!(matches!(
        Options::from_set(&set),
        Err(ConfigError::InvalidOptionValue { name, .. }) if name == "max_iterations"
    ));
}

#[test]
fn out_of_domain_values_are_invalid() {
    let cases: [(&str, OptionValue); 8] = [
        ("tolerance", 0.0.into()),
        ("tolerance", f64::NAN.into()),
        ("tolerance", "small".into()),
        ("max_iterations", 10.0.into()),
        ("print_level", 4.into()),
        ("check_gradients", 1.into()),
        ("derivative_mode", "sideways".into()),
        ("optimizer", "GRADIENT_DESCENT".into()),
    ];

    for (name, value) in cases {
        let set = OptionSet::new().with(name, value.clone());
        let result = Options::from_set(&set);
        assert!(
            matches!(&result, Err(ConfigError::InvalidOptionValue { name: n, .. }) if n == name),
            "{name} = {value:?} should be invalid, got {result:?}"
        );
    }
}

#[test]
fn optimizer_name_is_case_insensitive() {
    let options = Options::from_set(&OptionSet::new().with("optimizer", "ipopt")).unwrap();
    assert_eq!(options.optimizer(), "IPOPT");
}

#[test]
fn derivative_modes_parse() {
    let parse = |mode: &str| {
        Options::from_set(&OptionSet::new().with("derivative_mode", mode))
            .unwrap()
            .derivative_mode()
    };

    assert_eq!(parse("auto"), DerivativeMode::Auto);
    assert_eq!(parse("fwd"), DerivativeMode::Forward);
    assert_eq!(parse("rev"), DerivativeMode::Reverse);
}

#[test]
fn auto_mode_picks_cheaper_direction() {
    // 10 variables, 2 constraints: 3 responses, reverse is cheaper.
    assert_eq!(DerivativeMode::Auto.resolve(10, 2), Direction::Reverse);
    // 2 variables, 1 constraint: 2 responses, no gain from reverse.
    assert_eq!(DerivativeMode::Auto.resolve(2, 1), Direction::Forward);
    assert_eq!(DerivativeMode::Forward.resolve(10, 2), Direction::Forward);
    assert_eq!(DerivativeMode::Reverse.resolve(1, 5), Direction::Reverse);
}

#[test]
fn collects_from_pairs() {
    let set: OptionSet = [("print_level", 2), ("max_iterations", 7)]
        .into_iter()
        .collect();

    let options = Options::from_set(&set).unwrap();

    assert_eq!(options.print_level(), 2);
    assert_eq!(options.max_iterations(), 7);
}

#[cfg(feature = "serde")]
#[test]
fn deserializes_from_json() {
    let json = r#"{
        "optimizer": "PAROPT",
        "max_iterations": 50,
        "tolerance": 1e-6,
        "check_gradients": true,
        "derivative_mode": "rev"
    }"#;

    let set: OptionSet = serde_json::from_str(json).unwrap();
    assert_eq!(set.get("max_iterations"), Some(&OptionValue::Int(50)));

    let options = Options::from_set(&set).unwrap();
    assert_eq!(options.max_iterations(), 50);
    assert!(options.check_gradients());
    assert_eq!(options.derivative_mode(), DerivativeMode::Reverse);
}
