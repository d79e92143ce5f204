//! Smooth unconstrained optimization used by the likelihood-based
//! classifiers.

/// Defines the objective function trait and its closure instance.
pub mod objective_function;

/// Defines the limited-memory BFGS method on top of `liblbfgs`.
pub mod quasi_newton;


pub use objective_function::{ObjectiveFunction, FnObjective};
pub use quasi_newton::{Bfgs, LineSearch, Minimum};
