//! Shared fakes and harness for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lyricflow_core::lyrics::LyricLine;
use lyricflow_core::retry::{Backoff, RetryPolicy};
use lyricflow_db::models::project::{CreateProject, Project};
use lyricflow_db::models::status::{JobStage, ProjectStatus};
use lyricflow_events::EventBus;
use lyricflow_pipeline::{
    CollaboratorError, DispatcherConfig, JobDispatcher, JobStore, ManualClock, MemoryStore,
    Pipeline, ProjectStore, RenderOutput, RenderRequest, StageHandlers, StyleTransfer,
    StyleTransferOutput, Transcriber, VideoRenderer,
};

pub const VIDEO_URL: &str = "https://cdn.example.com/videos/out.mp4";

fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ---------------------------------------------------------------------------
// Fake collaborators
// ---------------------------------------------------------------------------

/// Returns the input URL (or `input + suffix`) after failing `fail_times`.
#[derive(Default)]
pub struct FakeStyleTransfer {
    pub fail_times: AtomicUsize,
    pub suffix: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl StyleTransfer for FakeStyleTransfer {
    async fn transform(
        &self,
        audio_url: &str,
        target_style: &str,
    ) -> Result<StyleTransferOutput, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((audio_url.to_string(), target_style.to_string()));
        if take_failure(&self.fail_times) {
            return Err(CollaboratorError::Other("style transfer unavailable".into()));
        }
        let url = match &self.suffix {
            Some(suffix) => format!("{audio_url}{suffix}"),
            None => audio_url.to_string(),
        };
        Ok(StyleTransferOutput {
            transformed_audio_url: url,
        })
    }
}

/// Returns `lines` after failing `fail_times`. `hang` never returns.
/// A store placed in `outage` is taken offline during the next call.
pub struct FakeTranscriber {
    pub lines: Vec<LyricLine>,
    pub fail_times: AtomicUsize,
    pub hang: bool,
    pub outage: Mutex<Option<Arc<MemoryStore>>>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeTranscriber {
    fn default() -> Self {
        Self {
            lines: hello_world(),
            fail_times: AtomicUsize::new(0),
            hang: false,
            outage: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_url: &str) -> Result<Vec<LyricLine>, CollaboratorError> {
        self.calls.lock().unwrap().push(audio_url.to_string());
        let outage = self.outage.lock().unwrap().take();
        if let Some(store) = outage {
            store.set_unavailable(true);
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        if take_failure(&self.fail_times) {
            return Err(CollaboratorError::Api {
                status: 503,
                body: "transcriber busy".into(),
            });
        }
        Ok(self.lines.clone())
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub fail_times: AtomicUsize,
    pub requests: Mutex<Vec<RenderRequest>>,
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        if take_failure(&self.fail_times) {
            return Err(CollaboratorError::Other("render farm down".into()));
        }
        Ok(RenderOutput {
            video_url: VIDEO_URL.to_string(),
            duration_secs: 3.0,
            resolution: request.quality.resolution().to_string(),
            file_size_bytes: request.quality.estimated_file_size_bytes(),
        })
    }
}

pub fn hello_world() -> Vec<LyricLine> {
    vec![
        LyricLine::new("Hello", 0.0, 1.5),
        LyricLine::new("World", 1.5, 3.0),
    ]
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Config with no backoff so a retried job is eligible on the next cycle.
pub fn immediate_config() -> DispatcherConfig {
    DispatcherConfig {
        retry: RetryPolicy {
            backoff: Backoff::immediate(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub style: Arc<FakeStyleTransfer>,
    pub transcriber: Arc<FakeTranscriber>,
    pub renderer: Arc<FakeRenderer>,
    pub events: Arc<EventBus>,
    pub pipeline: Pipeline,
    pub dispatcher: Arc<JobDispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            immediate_config(),
            FakeStyleTransfer::default(),
            FakeTranscriber::default(),
            FakeRenderer::default(),
        )
    }

    pub fn build(
        config: DispatcherConfig,
        style: FakeStyleTransfer,
        transcriber: FakeTranscriber,
        renderer: FakeRenderer,
    ) -> Self {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let style = Arc::new(style);
        let transcriber = Arc::new(transcriber);
        let renderer = Arc::new(renderer);
        let events = Arc::new(EventBus::default());

        let handlers = StageHandlers {
            style_transfer: style.clone(),
            transcriber: transcriber.clone(),
            renderer: renderer.clone(),
        };
        let jobs: Arc<dyn JobStore> = store.clone();
        let projects: Arc<dyn ProjectStore> = store.clone();
        let dispatcher = Arc::new(
            JobDispatcher::new(jobs.clone(), projects.clone(), handlers, config)
                .with_clock(clock.clone())
                .with_event_bus(events.clone()),
        );

        Self {
            pipeline: Pipeline::new(jobs, projects),
            store,
            clock,
            style,
            transcriber,
            renderer,
            events,
            dispatcher,
        }
    }

    /// Insert a project directly, bypassing input validation.
    pub async fn seed_project(&self, audio_url: &str) -> Project {
        let input = CreateProject {
            title: "Test song".to_string(),
            original_audio_url: audio_url.to_string(),
            music_style: "Jazz".to_string(),
            background_theme: "dark".to_string(),
        };
        self.store
            .create_project(&input, ProjectStatus::Processing)
            .await
            .unwrap()
    }

    pub async fn enqueue(&self, project_id: i64, stage: JobStage) -> i64 {
        self.store.enqueue(project_id, stage).await.unwrap().id
    }

    pub async fn project(&self, project_id: i64) -> Project {
        self.store.find_project(project_id).await.unwrap().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn valid_input() -> CreateProject {
    CreateProject {
        title: "Ma chanson".to_string(),
        original_audio_url: "https://cdn.example.com/uploads/a.mp3".to_string(),
        music_style: "Orchestra".to_string(),
        background_theme: "gradient".to_string(),
    }
}
