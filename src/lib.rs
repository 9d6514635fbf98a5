//! Frago — a recipe registry and runner.
//!
//! Recipes are small scripts (browser JavaScript, Python, shell) paired with a
//! markdown descriptor. The registry discovers them across project, user and
//! example roots; the runner validates parameters, executes the script under
//! a deadline, and returns one JSON envelope per run.

pub mod cli;
pub mod core;
pub mod output;
pub mod transport;
