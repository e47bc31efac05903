//! Domain layer for the permuter harness
//!
//! Core data types, the artifact codec and the ports that services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, ModelCallError};
