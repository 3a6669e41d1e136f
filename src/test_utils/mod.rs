//! Shared test helpers: in-memory repository mocks and entity factories.

pub mod factories;
pub mod mocks;
