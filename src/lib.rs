//! Duel lifecycle core for the Pool Arena ranking site.
//!
//! The crate tracks one-on-one duel challenges between registered users:
//! creating a duel between two distinct players, resolving it by assigning
//! a winner, and exposing per-user duel history. Presentation concerns
//! (routing, sessions, rendering) live in host applications that consume
//! this crate through [`DuelService`].
//!
//! A duel and its two participant rows are written in a single database
//! transaction, and resolving a duel flips exactly one participant to
//! winner while completing the duel header atomically. Every failure
//! crossing the service boundary is one of the three [`ServiceError`]
//! kinds, so callers can branch between "not found", "rejected", and
//! "failed" without inspecting storage internals.

/// Connection settings handed explicitly to the store.
pub mod config;
/// The closed set of failure kinds raised by the store and the service.
pub mod error;
/// Contains functions for logging.
pub mod log;
/// The business-rule and error-translation layer in front of the store.
pub mod service;
/// Traits and types used for interacting with the database.
pub mod store;

pub use config::StoreConfig;
pub use error::{ServiceError, StoreError};
pub use service::DuelService;
pub use store::{DuelStore, SqliteStore, UserDirectory};
