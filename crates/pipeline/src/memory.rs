//! In-memory job and project store.
//!
//! All state sits behind one async mutex, so every conditional transition
//! is atomic with respect to other callers. Used by the pipeline tests and
//! for running the worker without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lyricflow_core::types::{DbId, Timestamp};
use lyricflow_db::models::job::{Job, JobFailure, STALE_CLAIM_ERROR};
use lyricflow_db::models::lyrics::{CreateLyrics, Lyrics};
use lyricflow_db::models::project::{CreateProject, Project};
use lyricflow_db::models::status::{JobStage, JobStatus, ProjectStatus};
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::reducer::{reduce, ProjectOutcome};
use crate::store::{JobStore, ProjectStore};

#[derive(Default)]
struct State {
    /// Keyed by id, so iteration order is insertion order.
    jobs: BTreeMap<DbId, Job>,
    projects: HashMap<DbId, Project>,
    /// Keyed by project id.
    lyrics: HashMap<DbId, Lyrics>,
    last_job_id: DbId,
    last_project_id: DbId,
    last_lyrics_id: DbId,
}

impl State {
    /// Apply `update` to a job whose status is `expected`.
    fn transition(
        &mut self,
        job_id: DbId,
        expected: JobStatus,
        update: impl FnOnce(&mut Job),
    ) -> bool {
        match self.jobs.get_mut(&job_id) {
            Some(job) if job.status == expected => {
                update(job);
                true
            }
            _ => false,
        }
    }
}

/// [`JobStore`] and [`ProjectStore`] kept in process memory.
pub struct MemoryStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: while set, every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn enqueue(&self, project_id: DbId, stage: JobStage) -> Result<Job, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        state.last_job_id += 1;
        let job = Job {
            id: state.last_job_id,
            project_id,
            stage,
            status: JobStatus::Pending,
            retry_count: 0,
            error_message: None,
            run_after: now,
            claimed_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn fetch_pending_batch(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<Job>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending && job.run_after <= now)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processing(&self, job_id: DbId) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        Ok(state.transition(job_id, JobStatus::Pending, |job| {
            job.status = JobStatus::Processing;
            job.claimed_at = Some(now);
            job.updated_at = now;
        }))
    }

    async fn mark_completed(&self, job_id: DbId) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        Ok(state.transition(job_id, JobStatus::Processing, |job| {
            job.status = JobStatus::Completed;
            job.error_message = None;
            job.completed_at = Some(now);
            job.updated_at = now;
        }))
    }

    async fn mark_failed(&self, job_id: DbId, failure: &JobFailure) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        Ok(state.transition(job_id, JobStatus::Processing, |job| {
            job.status = failure.next_status();
            job.error_message = Some(failure.error_message.clone());
            job.retry_count = job.retry_count.max(failure.retry_count);
            if failure.exhausted {
                job.completed_at = Some(now);
            } else {
                job.run_after = failure.run_after;
            }
            job.updated_at = now;
        }))
    }

    async fn requeue_stale(
        &self,
        claimed_before: Timestamp,
        max_retries: i32,
    ) -> Result<Vec<Job>, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        let stale = state.jobs.values_mut().filter(|job| {
            job.status == JobStatus::Processing
                && job.claimed_at.is_some_and(|claimed| claimed < claimed_before)
        });

        let mut released = Vec::new();
        for job in stale {
            let exhausted = job.retry_count + 1 >= max_retries;
            job.retry_count = (job.retry_count + 1).min(max_retries);
            job.error_message = Some(STALE_CLAIM_ERROR.to_string());
            if exhausted {
                job.status = JobStatus::Failed;
                job.completed_at = Some(now);
            } else {
                job.status = JobStatus::Pending;
                job.run_after = now;
            }
            job.updated_at = now;
            released.push(job.clone());
        }
        Ok(released)
    }

    async fn find_job(&self, job_id: DbId) -> Result<Option<Job>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn list_project_jobs(&self, project_id: DbId) -> Result<Vec<Job>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| job.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(
        &self,
        input: &CreateProject,
        status: ProjectStatus,
    ) -> Result<Project, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        state.last_project_id += 1;
        let project = Project {
            id: state.last_project_id,
            title: input.title.clone(),
            original_audio_url: input.original_audio_url.clone(),
            transformed_audio_url: None,
            video_url: None,
            music_style: input.music_style.clone(),
            background_theme: input.background_theme.clone(),
            status,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, project_id: DbId) -> Result<Option<Project>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.projects.get(&project_id).cloned())
    }

    async fn apply_outcome(
        &self,
        project_id: DbId,
        outcome: &ProjectOutcome,
    ) -> Result<Option<Project>, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        let Some(project) = state.projects.get_mut(&project_id) else {
            return Ok(None);
        };
        if reduce(project, outcome, now) {
            Ok(Some(project.clone()))
        } else {
            Ok(None)
        }
    }

    async fn find_lyrics(&self, project_id: DbId) -> Result<Option<Lyrics>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().await.lyrics.get(&project_id).cloned())
    }

    async fn create_lyrics_if_absent(&self, input: &CreateLyrics) -> Result<bool, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        if state.lyrics.contains_key(&input.project_id) {
            return Ok(false);
        }
        state.last_lyrics_id += 1;
        let lyrics = Lyrics {
            id: state.last_lyrics_id,
            project_id: input.project_id,
            content: input.content.clone(),
            lines: Json(input.lines.clone()),
            is_edited: input.is_edited,
            created_at: now,
            updated_at: now,
        };
        state.lyrics.insert(input.project_id, lyrics);
        Ok(true)
    }

    async fn upsert_lyrics(&self, input: &CreateLyrics) -> Result<Lyrics, StoreError> {
        self.check_available()?;
        let now = self.now();
        let mut state = self.state.lock().await;
        if let Some(existing) = state.lyrics.get_mut(&input.project_id) {
            existing.content = input.content.clone();
            existing.lines = Json(input.lines.clone());
            existing.is_edited = input.is_edited;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        state.last_lyrics_id += 1;
        let lyrics = Lyrics {
            id: state.last_lyrics_id,
            project_id: input.project_id,
            content: input.content.clone(),
            lines: Json(input.lines.clone()),
            is_edited: input.is_edited,
            created_at: now,
            updated_at: now,
        };
        state.lyrics.insert(input.project_id, lyrics.clone());
        Ok(lyrics)
    }
}
