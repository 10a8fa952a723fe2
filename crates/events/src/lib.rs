//! In-process lifecycle events for the lyric-video pipeline.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the event envelope published by the dispatcher.
//! - [`EventLog`]: background subscriber that writes every event to the log.

pub mod bus;
pub mod log;

pub use bus::{EventBus, PipelineEvent};
pub use log::EventLog;
