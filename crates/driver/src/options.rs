//! Validated optimizer options.
//!
//! Callers describe the run with an [`OptionSet`], a string-keyed map of raw
//! [`OptionValue`]s. [`Options::from_set`] checks every key against
//! [`OPTION_NAMES`] and every value against its domain, producing an immutable
//! [`Options`] snapshot that the driver hands to the solver at start-up.
//!
//! | option | type | default |
//! |---|---|---|
//! | `optimizer` | string | `"PAROPT"` |
//! | `title` | string | `"Optimization using ParOpt"` |
//! | `tolerance` | float | `1e-6` |
//! | `max_iterations` | int | `100` |
//! | `print_level` | int (`0..=3`) | `0` |
//! | `check_gradients` | bool | `false` |
//! | `gradient_check_step` | float | `1e-6` |
//! | `gradient_check_tolerance` | float | `1e-4` |
//! | `derivative_mode` | `"auto"`, `"fwd"` or `"rev"` | `"auto"` |
//! | `print_results` | bool | `true` |

mod error;
mod value;

#[cfg(test)]
mod tests;

pub use error::ConfigError;
pub use value::{OptionSet, OptionValue};

use ipdriver_core::Direction;

use crate::registry;

/// Every option name the driver recognizes.
pub const OPTION_NAMES: &[&str] = &[
    "optimizer",
    "title",
    "tolerance",
    "max_iterations",
    "print_level",
    "check_gradients",
    "gradient_check_step",
    "gradient_check_tolerance",
    "derivative_mode",
    "print_results",
];

/// Highest accepted `print_level`.
pub const MAX_PRINT_LEVEL: u8 = 3;

/// How the host model should propagate derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivativeMode {
    /// Pick the cheaper direction from the problem dimensions.
    #[default]
    Auto,
    Forward,
    Reverse,
}

impl DerivativeMode {
    /// Resolves the mode to a concrete direction for a problem's dimensions.
    ///
    /// Forward mode costs one solve per variable and reverse mode one solve per
    /// response (the objective plus each constraint), so `Auto` picks reverse
    /// only when there are fewer responses than variables.
    #[must_use]
    pub fn resolve(self, num_variables: usize, num_constraints: usize) -> Direction {
        match self {
            Self::Forward => Direction::Forward,
            Self::Reverse => Direction::Reverse,
            Self::Auto if num_constraints + 1 < num_variables => Direction::Reverse,
            Self::Auto => Direction::Forward,
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "fwd" => Some(Self::Forward),
            "rev" => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// An immutable, validated snapshot of the optimizer options.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    optimizer: String,
    title: String,
    tolerance: f64,
    max_iterations: usize,
    print_level: u8,
    check_gradients: bool,
    gradient_check_step: f64,
    gradient_check_tolerance: f64,
    derivative_mode: DerivativeMode,
    print_results: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            optimizer: "PAROPT".to_owned(),
            title: "Optimization using ParOpt".to_owned(),
            tolerance: 1e-6,
            max_iterations: 100,
            print_level: 0,
            check_gradients: false,
            gradient_check_step: 1e-6,
            gradient_check_tolerance: 1e-4,
            derivative_mode: DerivativeMode::Auto,
            print_results: true,
        }
    }
}

impl Options {
    /// Validates a raw option set, filling unset options with defaults.
    ///
    /// Unknown names are reported before any value is checked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] for a name not in
    /// [`OPTION_NAMES`], or [`ConfigError::InvalidOptionValue`] for a value of
    /// the wrong type or outside its domain.
    pub fn from_set(set: &OptionSet) -> Result<Self, ConfigError> {
        if let Some((name, _)) = set.iter().find(|(name, _)| !OPTION_NAMES.contains(name)) {
            return Err(ConfigError::UnknownOption {
                name: name.to_owned(),
            });
        }

        let mut options = Self::default();
        for (name, value) in set.iter() {
            match name {
                "optimizer" => options.optimizer = optimizer(name, value)?,
                "title" => options.title = string(name, value)?.to_owned(),
                "tolerance" => options.tolerance = positive(name, value)?,
                "max_iterations" => options.max_iterations = count(name, value)?,
                "print_level" => options.print_level = print_level(name, value)?,
                "check_gradients" => options.check_gradients = boolean(name, value)?,
                "gradient_check_step" => options.gradient_check_step = positive(name, value)?,
                "gradient_check_tolerance" => {
                    options.gradient_check_tolerance = positive(name, value)?;
                }
                "derivative_mode" => {
                    let mode = string(name, value)?;
                    options.derivative_mode = DerivativeMode::parse(mode).ok_or_else(|| {
                        ConfigError::invalid(
                            name,
                            format!("expected \"auto\", \"fwd\" or \"rev\", got {mode:?}"),
                        )
                    })?;
                }
                "print_results" => options.print_results = boolean(name, value)?,
                _ => {
                    return Err(ConfigError::UnknownOption {
                        name: name.to_owned(),
                    });
                }
            }
        }

        Ok(options)
    }

    /// Returns the optimizer name, upper-case.
    #[must_use]
    pub fn optimizer(&self) -> &str {
        &self.optimizer
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the convergence tolerance handed to the solver.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns the solver output verbosity, from 0 (silent) to [`MAX_PRINT_LEVEL`].
    #[must_use]
    pub fn print_level(&self) -> u8 {
        self.print_level
    }

    #[must_use]
    pub fn check_gradients(&self) -> bool {
        self.check_gradients
    }

    /// Returns the forward-difference step used by the gradient check.
    #[must_use]
    pub fn gradient_check_step(&self) -> f64 {
        self.gradient_check_step
    }

    /// Returns the largest derivative error the gradient check accepts.
    #[must_use]
    pub fn gradient_check_tolerance(&self) -> f64 {
        self.gradient_check_tolerance
    }

    #[must_use]
    pub fn derivative_mode(&self) -> DerivativeMode {
        self.derivative_mode
    }

    #[must_use]
    pub fn print_results(&self) -> bool {
        self.print_results
    }
}

fn optimizer(name: &str, value: &OptionValue) -> Result<String, ConfigError> {
    let requested = string(name, value)?;
    registry::descriptor(requested)
        .map(|descriptor| descriptor.name.to_owned())
        .ok_or_else(|| ConfigError::invalid(name, format!("unknown optimizer {requested:?}")))
}

fn string<'a>(name: &str, value: &'a OptionValue) -> Result<&'a str, ConfigError> {
    match value {
        OptionValue::Str(s) => Ok(s),
        other => Err(wrong_type(name, "string", other)),
    }
}

fn boolean(name: &str, value: &OptionValue) -> Result<bool, ConfigError> {
    match value {
        OptionValue::Bool(b) => Ok(*b),
        other => Err(wrong_type(name, "bool", other)),
    }
}

fn positive(name: &str, value: &OptionValue) -> Result<f64, ConfigError> {
    #[allow(clippy::cast_precision_loss)]
    let x = match value {
        OptionValue::Float(x) => *x,
        OptionValue::Int(i) => *i as f64,
        other => return Err(wrong_type(name, "float", other)),
    };
    if !x.is_finite() || x <= 0.0 {
        return Err(ConfigError::invalid(
            name,
            format!("must be finite and positive, got {x}"),
        ));
    }
    Ok(x)
}

fn count(name: &str, value: &OptionValue) -> Result<usize, ConfigError> {
    match value {
        OptionValue::Int(i) => usize::try_from(*i)
            .map_err(|_| ConfigError::invalid(name, format!("must be non-negative, got {i}"))),
        other => Err(wrong_type(name, "int", other)),
    }
}

fn print_level(name: &str, value: &OptionValue) -> Result<u8, ConfigError> {
    match value {
        OptionValue::Int(i) => u8::try_from(*i)
            .ok()
            .filter(|level| *level <= MAX_PRINT_LEVEL)
            .ok_or_else(|| {
                ConfigError::invalid(
                    name,
                    format!("must be between 0 and {MAX_PRINT_LEVEL}, got {i}"),
                )
            }),
        other => Err(wrong_type(name, "int", other)),
    }
}

fn wrong_type(name: &str, expected: &str, found: &OptionValue) -> ConfigError {
    ConfigError::invalid(name, format!("expected {expected}, got {}", found.kind()))
}
