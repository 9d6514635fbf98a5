//! Recipe core — metadata, discovery, parameter checks, and the runner.

pub mod config;
pub mod errors;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod metadata;
pub mod params;
pub mod registry;
pub mod result;
pub mod runner;
pub mod types;
