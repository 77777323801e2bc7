//! Testing utilities and mock implementations
//!
//! Lets the router be exercised end to end without network access or
//! provider credentials.

pub mod mocks;

pub use mocks::*;
