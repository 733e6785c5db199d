use std::fmt;

/// Invalid solver or line-packing settings, reported at construction.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsError {
    /// Tolerances must be positive; NaN is rejected.
    InvalidTolerance(f64),
    /// `max_threads` must allow at least one thread.
    ZeroThreadBudget,
    /// At least one line length is needed.
    NoLineLengths,
    /// Line lengths must be finite and non-negative.
    InvalidLineLength { index: usize, length: f64 },
    /// Rigid boxes keep their optimal length, so they need one.
    RigidBoxWithoutLength { index: usize },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidTolerance(t) => {
                write!(f, "tolerance must be positive, got {}", t)
            }
            SettingsError::ZeroThreadBudget => write!(f, "max_threads must be at least 1"),
            SettingsError::NoLineLengths => write!(f, "no line lengths given"),
            SettingsError::InvalidLineLength { index, length } => write!(
                f,
                "line length {} must be finite and non-negative, got {}",
                index, length
            ),
            SettingsError::RigidBoxWithoutLength { index } => {
                write!(f, "rigid box {} has no optimal length", index)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
