//! Structured-log sink for pipeline events.
//!
//! [`EventLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes one `tracing` line per event. It exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::PipelineEvent;

/// Background subscriber that logs every pipeline event.
pub struct EventLog;

impl EventLog {
    /// Run until the channel closes. Returns the number of events logged.
    pub async fn run(mut receiver: broadcast::Receiver<PipelineEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        project_id = event.project_id,
                        job_id = ?event.job_id,
                        stage = ?event.stage,
                        payload = %event.payload,
                        "Pipeline event"
                    );
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
        logged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let task = tokio::spawn(EventLog::run(bus.subscribe()));

        bus.publish(PipelineEvent::for_job("job.completed", 1, 1, "transcription"));
        bus.publish(PipelineEvent::new("project.completed", 1));
        drop(bus);

        let logged = task.await.expect("event log task should not panic");
        assert_eq!(logged, 2);
    }
}
