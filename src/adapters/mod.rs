//! Adapters for external systems: model providers and the filesystem.

pub mod clients;
pub mod fs;
