//! Worker process: configuration and collaborator wiring for the
//! `lyricflow-worker` binary.

pub mod config;
pub mod handlers;
