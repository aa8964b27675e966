use thiserror::Error;

/// Errors that can occur when configuring the driver.
///
/// A configuration error never changes driver state, so the caller can fix
/// the options and configure again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option `{name}`")]
    UnknownOption { name: String },

    #[error("invalid value for option `{name}`: {reason}")]
    InvalidOptionValue { name: String, reason: String },

    #[error("driver is already configured")]
    AlreadyConfigured,
}

impl ConfigError {
    pub(super) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOptionValue {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
