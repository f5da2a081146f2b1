//! Storage backends for clubroster.
//!
//! [`traits`] defines the per-concern store contracts, [`postgres`] the
//! production backend, and [`memory`] an in-memory implementation with the
//! same semantics, used by the server's handler tests.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use traits::{Store, StorageError};
