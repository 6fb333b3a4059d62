//! Storage providers that live inside the process.
//!
//! - [`MemoryCacheProvider`] - volatile cache with TTL and capacity eviction
//! - [`FileProvider`] - one JSON file per record under a base directory
//! - [`MockProvider`] - unbounded in-memory map, the database stand-in
//!
//! The PostgreSQL-backed database tier lives with the API server, next to the
//! connection pool it shares.

pub mod file;
pub mod memory;
pub mod mock;

pub use file::FileProvider;
pub use memory::{CacheStats, MemoryCacheProvider};
pub use mock::MockProvider;
