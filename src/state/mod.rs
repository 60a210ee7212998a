//! Application state types.

pub mod connection;
pub mod profile;

pub use connection::{ConnectionState, FailureReason};
pub use profile::{ConnectionProfile, ProfileStore};
