//! Application layer - orchestration of domain logic.
//!
//! This layer turns domain rules into store round trips:
//! - One component per primitive (counter, rate limiter, lock, inventory, batch)
//! - A shared runner guarding every call with the circuit breaker
//! - Outcome metrics
//! - The coordinator that wires them to a store
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod batch;
pub mod circuit_breaker;
pub mod coordinator;
pub mod counter;
pub mod error;
pub mod inventory;
pub mod lock;
pub mod metrics;
pub mod ports;
pub mod rate_limiter;
pub(crate) mod runner;
