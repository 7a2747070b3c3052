//! Testing utilities and mock implementations
//!
//! Doubles for the session and secret-source seams, usable from unit tests
//! and from the integration tests under `tests/`.

pub mod mocks;

pub use mocks::*;
