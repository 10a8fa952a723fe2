//! Shared domain building blocks for the LyricFlow pipeline.
//!
//! Everything in this crate is pure: no database, network or runtime
//! dependencies. The `db`, `pipeline` and `services` crates build on it.

pub mod catalog;
pub mod error;
pub mod job_events;
pub mod lyrics;
pub mod render;
pub mod retry;
pub mod types;
