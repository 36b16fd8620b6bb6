//! Infrastructure layer: credential and student store implementations.
//!
//! In-memory stores back dev/test; Postgres stores are available behind the
//! `postgres` feature.

pub mod credentials;
pub mod students;

#[cfg(feature = "postgres")]
pub mod db;


pub use credentials::InMemoryCredentialStore;
pub use students::InMemoryStudentStore;

#[cfg(feature = "postgres")]
pub use credentials::PostgresCredentialStore;
#[cfg(feature = "postgres")]
pub use students::PostgresStudentStore;
