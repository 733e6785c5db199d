//! Penalty fields expressing soft constraints on layout parameters.

mod non_negative;
mod soft_constraint;

pub use non_negative::NonNegativeConstraintField;
pub use soft_constraint::{LinearTerm, SoftConstraintField, DEFAULT_INTENSITY};
