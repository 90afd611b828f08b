//! Domain layer - pure coordination logic with no I/O.
//!
//! This layer contains the concepts and invariants of the coordination
//! primitives:
//! - Key layout inside the shared store
//! - The closed set of atomic procedures and their reply shapes
//! - Outcome types for counters, rate windows, locks, inventory and batches
//! - Input validation
//!
//! All types in this layer are pure and easily testable.

pub mod batch;
pub mod counter;
pub mod inventory;
pub mod keys;
pub mod lock;
pub mod procedure;
pub mod rate_window;
pub mod reply;
pub mod validation;
