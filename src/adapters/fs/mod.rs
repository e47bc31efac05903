//! Filesystem adapters.

pub mod text_store;

pub use text_store::TextStore;
