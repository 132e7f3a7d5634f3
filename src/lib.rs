//! Role based authorization for view entry points.
//!
//! Role checkers are registered with an evaluation cost, view permissions are
//! compiled into a [`compiler::LookupTable`] whose rule lists are sorted by
//! cost, and [`evaluator::decide`] walks those lists until a checker matches.
//! The [`guard`] module wires the evaluation in front of view handlers.

pub mod compiler;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod guard;
pub mod logs;
pub mod request;
pub mod roles;
pub mod settings;
