//! Per-stage orchestration.
//!
//! [`StageRunner::run`] loads what a stage needs, calls its collaborator,
//! and writes the result back through the [`ProjectStore`]. Nothing is
//! written when the collaborator fails.

use std::sync::Arc;

use lyricflow_core::lyrics::normalize_lines;
use lyricflow_core::render::RenderQuality;
use lyricflow_core::types::DbId;
use lyricflow_db::models::job::Job;
use lyricflow_db::models::lyrics::CreateLyrics;
use lyricflow_db::models::project::Project;
use lyricflow_db::models::status::JobStage;

use crate::collaborators::{RenderOutput, RenderRequest, StageHandlers};
use crate::error::StageError;
use crate::reducer::ProjectOutcome;
use crate::store::ProjectStore;

/// Quality every video is rendered at.
pub const RENDER_QUALITY: RenderQuality = RenderQuality::Hd1080;

/// What a successful stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSuccess {
    AudioTransformed { url: String },
    /// `created` is `false` when lyrics already existed and were kept.
    LyricsTranscribed { line_count: usize, created: bool },
    VideoRendered(RenderOutput),
}

/// Runs one job against its stage collaborator.
pub struct StageRunner {
    projects: Arc<dyn ProjectStore>,
    handlers: StageHandlers,
}

impl StageRunner {
    pub fn new(projects: Arc<dyn ProjectStore>, handlers: StageHandlers) -> Self {
        Self { projects, handlers }
    }

    pub async fn run(&self, job: &Job) -> Result<StageSuccess, StageError> {
        match job.stage {
            JobStage::StyleTransfer => self.style_transfer(job.project_id).await,
            JobStage::Transcription => self.transcription(job.project_id).await,
            JobStage::VideoRender => self.video_render(job.project_id).await,
        }
    }

    async fn load_project(&self, project_id: DbId) -> Result<Project, StageError> {
        self.projects
            .find_project(project_id)
            .await?
            .ok_or(StageError::ProjectNotFound(project_id))
    }

    async fn style_transfer(&self, project_id: DbId) -> Result<StageSuccess, StageError> {
        let project = self.load_project(project_id).await?;
        let output = self
            .handlers
            .style_transfer
            .transform(&project.original_audio_url, &project.music_style)
            .await?;

        let url = output.transformed_audio_url;
        self.projects
            .apply_outcome(project_id, &ProjectOutcome::AudioTransformed { url: url.clone() })
            .await?
            .ok_or(StageError::ProjectNotFound(project_id))?;

        Ok(StageSuccess::AudioTransformed { url })
    }

    async fn transcription(&self, project_id: DbId) -> Result<StageSuccess, StageError> {
        let project = self.load_project(project_id).await?;
        let audio_url = project.latest_audio_url();
        tracing::debug!(project_id, audio_url, "Transcribing lyrics");

        let lines = self.handlers.transcriber.transcribe(audio_url).await?;
        let lines = normalize_lines(lines)?;
        let line_count = lines.len();

        let input = CreateLyrics::from_lines(project_id, lines, false);
        let created = self.projects.create_lyrics_if_absent(&input).await?;
        if !created {
            tracing::info!(project_id, "Lyrics already present, keeping existing record");
        }

        Ok(StageSuccess::LyricsTranscribed {
            line_count,
            created,
        })
    }

    async fn video_render(&self, project_id: DbId) -> Result<StageSuccess, StageError> {
        let project = self.load_project(project_id).await?;
        let lyrics = self
            .projects
            .find_lyrics(project_id)
            .await?
            .ok_or(StageError::MissingLyrics(project_id))?;

        let request = RenderRequest {
            audio_url: project.latest_audio_url().to_string(),
            lyrics: lyrics.lines.0,
            background_theme: project.background_theme.clone(),
            quality: RENDER_QUALITY,
        };
        let output = self.handlers.renderer.render(&request).await?;

        self.projects
            .apply_outcome(
                project_id,
                &ProjectOutcome::VideoRendered {
                    video_url: output.video_url.clone(),
                },
            )
            .await?
            .ok_or(StageError::ProjectNotFound(project_id))?;

        Ok(StageSuccess::VideoRendered(output))
    }
}
