//! HTTP clients for the stage collaborators, plus local stand-ins.
//!
//! - [`style`]: genre-swap style transfer, or a pass-through that keeps the
//!   uploaded audio.
//! - [`transcription`]: Whisper-style transcription into timed lyric lines.
//! - [`render`]: lyric-video rendering, or a placeholder that reports an
//!   estimated result without rendering anything.
//!
//! All clients share [`api::ServiceClient`] for transport and error
//! mapping.

pub mod api;
pub mod render;
pub mod style;
pub mod transcription;

pub use api::{ApiError, ServiceClient, ServiceEndpoint};
pub use render::{PlaceholderRenderer, RenderServiceClient};
pub use style::{PassthroughStyleTransfer, StyleTransferClient};
pub use transcription::WhisperClient;
