//! `StudentStore` implementations.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStudentStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStudentStore;
