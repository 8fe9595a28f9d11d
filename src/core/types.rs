use serde::{Deserialize, Serialize};

/// Which part of a docplan invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// docplan.toml could not be read or parsed.
    ConfigError,
    /// A configuration value or plan step parameter is out of range.
    ValidationError,
    /// No compiler produced a plan.
    PlanError,
    /// The semantic or rate client could not be built.
    EnvironmentError,
    /// Export files could not be written.
    IoError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
