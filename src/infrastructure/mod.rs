//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs manual)
//! - Store implementations (in-process and Redis)

pub mod clock;
pub mod memory_store;

#[cfg(feature = "redis-store")]
pub mod redis_store;
#[cfg(feature = "redis-store")]
pub(crate) mod scripts;
