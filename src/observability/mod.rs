//! Observability subsystem.
//!
//! Structured logging through the `tracing` ecosystem. The engine and
//! adapter emit events with the request ID attached; hosts that already
//! run their own subscriber skip [`logging::init`] entirely.

pub mod logging;
