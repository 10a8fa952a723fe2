//! Folds stage results onto the owning project.
//!
//! Fields are last-writer-wins. A `Completed` project never regresses to
//! `Failed`.

use lyricflow_core::types::Timestamp;
use lyricflow_db::models::project::Project;
use lyricflow_db::models::status::{JobStage, ProjectStatus};

/// A change to apply to a project.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    /// Style transfer produced a new audio file.
    AudioTransformed { url: String },
    /// Rendering produced the final video; the project is done.
    VideoRendered { video_url: String },
    /// A job for `stage` ran out of retries with `error`.
    StageExhausted { stage: JobStage, error: String },
}

impl ProjectOutcome {
    /// Error message recorded on the project for an exhausted stage.
    pub fn failure_message(stage: JobStage, error: &str) -> String {
        format!("{stage} failed: {error}")
    }
}

/// Apply `outcome` to `project` in place.
///
/// Returns `false` when the outcome was ignored (an exhausted stage on a
/// project that already completed).
pub fn reduce(project: &mut Project, outcome: &ProjectOutcome, now: Timestamp) -> bool {
    match outcome {
        ProjectOutcome::AudioTransformed { url } => {
            project.transformed_audio_url = Some(url.clone());
        }
        ProjectOutcome::VideoRendered { video_url } => {
            project.video_url = Some(video_url.clone());
            project.status = ProjectStatus::Completed;
            project.error_message = None;
        }
        ProjectOutcome::StageExhausted { stage, error } => {
            // Same guard as `ProjectRepo::mark_failed` (`status_id <> completed`).
            if project.status == ProjectStatus::Completed {
                return false;
            }
            project.status = ProjectStatus::Failed;
            project.error_message = Some(ProjectOutcome::failure_message(*stage, error));
        }
    }
    project.updated_at = now;
    true
}
