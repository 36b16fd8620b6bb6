//! Students domain module: the flat student record and its storage port.
//!
//! Plain data plus a narrow persistence interface; no IO, no HTTP.

pub mod class;
pub mod student;

pub use class::{StudentClass, UnknownClass};
pub use student::{Student, StudentDraft, StudentStore, not_found};
