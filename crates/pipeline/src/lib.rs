//! Job pipeline for lyric videos.
//!
//! A project moves through three stages (style transfer, transcription,
//! video render), each executed as a job. The [`JobDispatcher`] polls a
//! [`JobStore`] for pending jobs, runs them through the [`StageRunner`]
//! against the configured collaborators, and folds results onto the owning
//! project via the [`reducer`].

pub mod clock;
pub mod collaborators;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod reducer;
pub mod stages;
pub mod store;
pub mod submit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    RenderOutput, RenderRequest, StageHandlers, StyleTransfer, StyleTransferOutput, Transcriber,
    VideoRenderer,
};
pub use dispatcher::{
    CycleReport, DispatcherConfig, DispatcherHandle, JobDispatcher, DEFAULT_HANDLER_TIMEOUT,
    STALE_CLAIM_MARGIN,
};
pub use error::{CollaboratorError, PipelineError, StageError, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use reducer::ProjectOutcome;
pub use stages::{StageRunner, StageSuccess};
pub use store::{JobStore, ProjectStore};
pub use submit::Pipeline;
