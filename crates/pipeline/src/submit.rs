//! Entry points used by whatever accepts user requests.

use std::sync::Arc;

use lyricflow_core::error::CoreError;
use lyricflow_core::lyrics::{normalize_lines, LyricLine};
use lyricflow_core::types::DbId;
use lyricflow_db::models::job::Job;
use lyricflow_db::models::lyrics::{CreateLyrics, Lyrics};
use lyricflow_db::models::project::{CreateProject, Project};
use lyricflow_db::models::status::{JobStage, ProjectStatus};
use validator::Validate;

use crate::error::PipelineError;
use crate::store::{JobStore, ProjectStore};

/// Stages enqueued as soon as a project is created.
pub const INITIAL_STAGES: [JobStage; 2] = [JobStage::StyleTransfer, JobStage::Transcription];

/// Creates projects and enqueues their work.
#[derive(Clone)]
pub struct Pipeline {
    jobs: Arc<dyn JobStore>,
    projects: Arc<dyn ProjectStore>,
}

impl Pipeline {
    pub fn new(jobs: Arc<dyn JobStore>, projects: Arc<dyn ProjectStore>) -> Self {
        Self { jobs, projects }
    }

    /// Validate and store a new project, then enqueue style transfer and
    /// transcription for it.
    pub async fn create_project(&self, input: &CreateProject) -> Result<Project, PipelineError> {
        input
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let project = self
            .projects
            .create_project(input, ProjectStatus::Processing)
            .await?;

        for stage in INITIAL_STAGES {
            let job = self.jobs.enqueue(project.id, stage).await?;
            tracing::info!(
                project_id = project.id,
                job_id = job.id,
                stage = %stage,
                "Job enqueued",
            );
        }

        Ok(project)
    }

    /// Enqueue the video render for an existing project.
    pub async fn request_render(&self, project_id: DbId) -> Result<Job, PipelineError> {
        self.project(project_id).await?;
        let job = self.jobs.enqueue(project_id, JobStage::VideoRender).await?;
        tracing::info!(project_id, job_id = job.id, "Render requested");
        Ok(job)
    }

    /// Replace a project's lyrics with user-edited lines.
    pub async fn save_edited_lyrics(
        &self,
        project_id: DbId,
        lines: Vec<LyricLine>,
    ) -> Result<Lyrics, PipelineError> {
        self.project(project_id).await?;
        let lines = normalize_lines(lines).map_err(|e| CoreError::Validation(e.to_string()))?;
        let input = CreateLyrics::from_lines(project_id, lines, true);
        Ok(self.projects.upsert_lyrics(&input).await?)
    }

    pub async fn lyrics(&self, project_id: DbId) -> Result<Option<Lyrics>, PipelineError> {
        Ok(self.projects.find_lyrics(project_id).await?)
    }

    /// Load a project or fail with [`CoreError::NotFound`].
    pub async fn project(&self, project_id: DbId) -> Result<Project, PipelineError> {
        self.projects
            .find_project(project_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Project",
                    id: project_id,
                }
                .into()
            })
    }

    /// Every job of a project in insertion order.
    pub async fn project_jobs(&self, project_id: DbId) -> Result<Vec<Job>, PipelineError> {
        Ok(self.jobs.list_project_jobs(project_id).await?)
    }
}
