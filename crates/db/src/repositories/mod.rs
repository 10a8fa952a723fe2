//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod lyrics_repo;
pub mod project_repo;

pub use job_repo::JobRepo;
pub use lyrics_repo::LyricsRepo;
pub use project_repo::ProjectRepo;
