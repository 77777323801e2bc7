//! Completion transport layer
//!
//! Provider-agnostic message types and transport traits, the provider wire
//! formats, and the concrete HTTP and blocking transports.

pub mod provider;
pub mod providers;
pub mod transport;

pub use provider::*;
pub use transport::{BlockingBridge, HttpTransport};
