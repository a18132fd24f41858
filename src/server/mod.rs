//! Session lifecycle API consumed by the transport layer

pub mod registry;

pub use registry::{SessionError, SessionRegistry};
