//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The dispatcher publishes one [`PipelineEvent`] per job transition and per
//! project outcome. Observers (the [`EventLog`](crate::log::EventLog), tests)
//! subscribe through a shared `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use lyricflow_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A lifecycle change of a job or project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// One of the names in [`lyricflow_core::job_events`].
    pub event_type: String,

    pub project_id: DbId,

    /// Set for events raised while handling a job.
    pub job_id: Option<DbId>,

    /// Stage of that job (`"style_transfer"`, `"transcription"`,
    /// `"video_render"`).
    pub stage: Option<String>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// A project-level event with no job attached and an empty payload.
    pub fn new(event_type: impl Into<String>, project_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            project_id,
            job_id: None,
            stage: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// An event raised while handling job `job_id` of `stage`.
    pub fn for_job(
        event_type: impl Into<String>,
        project_id: DbId,
        job_id: DbId,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            job_id: Some(job_id),
            stage: Some(stage.into()),
            ..Self::new(event_type, project_id)
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus: every subscriber sees every event published after it
/// subscribed.
///
/// ```rust
/// use lyricflow_events::bus::{EventBus, PipelineEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::for_job("job.completed", 1, 10, "transcription"));
/// assert_eq!(rx.try_recv().unwrap().job_id, Some(10));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus buffering at most `capacity` events per subscriber.
    ///
    /// A subscriber that falls further behind gets `RecvError::Lagged` and
    /// loses the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers. With none, the event is dropped.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lyricflow_core::job_events::{
        EVENT_JOB_COMPLETED, EVENT_JOB_RETRY_SCHEDULED, EVENT_PROJECT_COMPLETED,
    };
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn job_event_carries_job_and_stage() {
        let event = PipelineEvent::for_job(EVENT_JOB_RETRY_SCHEDULED, 4, 11, "video_render")
            .with_payload(serde_json::json!({"retry_count": 1, "error": "no lyrics"}));

        assert_eq!(event.project_id, 4);
        assert_eq!(event.job_id, Some(11));
        assert_eq!(event.stage.as_deref(), Some("video_render"));
        assert_eq!(event.payload["retry_count"], 1);
    }

    #[test]
    fn project_event_has_no_job() {
        let event = PipelineEvent::new(EVENT_PROJECT_COMPLETED, 4);
        assert!(event.job_id.is_none());
        assert!(event.stage.is_none());
        assert_eq!(event.payload, serde_json::json!({}));
    }

    #[test]
    fn serializes_ids_and_stage_at_top_level() {
        let event = PipelineEvent::for_job(EVENT_JOB_COMPLETED, 2, 5, "transcription");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "job.completed");
        assert_eq!(json["project_id"], 2);
        assert_eq!(json["job_id"], 5);
        assert_eq!(json["stage"], "transcription");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn subscriber_sees_events_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(PipelineEvent::for_job(EVENT_JOB_COMPLETED, 1, 1, "style_transfer"));
        bus.publish(PipelineEvent::for_job(EVENT_JOB_COMPLETED, 1, 2, "transcription"));

        assert_eq!(rx.try_recv().unwrap().job_id, Some(1));
        assert_eq!(rx.try_recv().unwrap().job_id, Some(2));
        assert_matches_empty(rx.try_recv());
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.publish(PipelineEvent::new(EVENT_PROJECT_COMPLETED, 1));

        let mut rx = bus.subscribe();
        assert_matches_empty(rx.try_recv());
    }

    #[test]
    fn slow_subscriber_lags_past_capacity() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for job_id in 1..=3 {
            bus.publish(PipelineEvent::for_job(EVENT_JOB_COMPLETED, 1, job_id, "transcription"));
        }

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
        assert_eq!(rx.try_recv().unwrap().job_id, Some(2));
    }

    fn assert_matches_empty(result: Result<PipelineEvent, TryRecvError>) {
        assert!(matches!(result, Err(TryRecvError::Empty)), "{result:?}");
    }
}
