use crate::error::EventBusError;
use crate::result::Activity;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Progress events emitted while an analysis session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KinetrackEvent {
    /// A session started pulling frames
    AnalysisStarted {
        session_id: Uuid,
        activity: Activity,
        source_ref: String,
        timestamp: SystemTime,
    },
    /// A detector counter advanced
    CounterAdvanced {
        session_id: Uuid,
        activity: Activity,
        count: u32,
        frame_index: u64,
    },
    /// A gated detector passed its warm-up (e.g. subject standing still)
    DetectorReady {
        session_id: Uuid,
        frame_index: u64,
    },
    /// The frame stream stopped before the detector asked to stop
    SourceEnded { session_id: Uuid, reason: String },
    /// The session produced its final result
    AnalysisCompleted {
        session_id: Uuid,
        activity: Activity,
        summary: String,
        timestamp: SystemTime,
    },
}

impl KinetrackEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            KinetrackEvent::AnalysisStarted { session_id, .. }
            | KinetrackEvent::CounterAdvanced { session_id, .. }
            | KinetrackEvent::DetectorReady { session_id, .. }
            | KinetrackEvent::SourceEnded { session_id, .. }
            | KinetrackEvent::AnalysisCompleted { session_id, .. } => *session_id,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            KinetrackEvent::AnalysisStarted {
                activity,
                source_ref,
                ..
            } => format!("Analyzing {} from {}", activity, source_ref),
            KinetrackEvent::CounterAdvanced {
                activity, count, ..
            } => format!("{}: {}", activity, count),
            KinetrackEvent::DetectorReady { frame_index, .. } => {
                format!("Ready at frame {}", frame_index)
            }
            KinetrackEvent::SourceEnded { reason, .. } => format!("Source ended: {}", reason),
            KinetrackEvent::AnalysisCompleted { summary, .. } => summary.clone(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            KinetrackEvent::AnalysisStarted { .. } => "analysis_started",
            KinetrackEvent::CounterAdvanced { .. } => "counter_advanced",
            KinetrackEvent::DetectorReady { .. } => "detector_ready",
            KinetrackEvent::SourceEnded { .. } => "source_ended",
            KinetrackEvent::AnalysisCompleted { .. } => "analysis_completed",
        }
    }
}

/// Broadcast bus for session progress
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<KinetrackEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<KinetrackEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: KinetrackEvent) -> Result<usize, EventBusError> {
        match &event {
            KinetrackEvent::AnalysisCompleted { summary, .. } => {
                info!("Analysis completed: {}", summary.replace('\n', ", "));
            }
            KinetrackEvent::SourceEnded { reason, .. } => {
                warn!("Landmark source ended early: {}", reason);
            }
            _ => debug!("Event: {}", event.description()),
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    Session(Uuid),
}

impl EventFilter {
    pub fn matches(&self, event: &KinetrackEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Session(id) => event.session_id() == *id,
        }
    }
}

/// Receiver that skips events not matching its filter
pub struct EventReceiver {
    receiver: broadcast::Receiver<KinetrackEvent>,
    filter: EventFilter,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<KinetrackEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next matching event; lagged events are skipped with a warning
    pub async fn recv(&mut self) -> Result<KinetrackEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event receiver lagged behind by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    fn counter(session_id: Uuid, count: u32) -> KinetrackEvent {
        KinetrackEvent::CounterAdvanced {
            session_id,
            activity: Activity::Pushups,
            count,
            frame_index: count as u64 * 10,
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.subscriber_count(), 0);
        let mut receiver = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 1);

        let session_id = Uuid::new_v4();
        let subscriber_count = event_bus.publish(counter(session_id, 3)).unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            KinetrackEvent::CounterAdvanced { count, .. } => assert_eq!(count, 3),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());
        assert!(event_bus.publish(counter(Uuid::new_v4(), 1)).is_err());
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let wanted = Uuid::new_v4();
        let mut receiver = EventReceiver::new(event_bus.subscribe(), EventFilter::Session(wanted));

        event_bus.publish(counter(Uuid::new_v4(), 1)).unwrap();
        event_bus.publish(counter(wanted, 2)).unwrap();

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.session_id(), wanted);
        assert_eq!(received.description(), "pushups: 2");
    }

    #[test]
    fn test_event_type_filter() {
        let filter = EventFilter::EventTypes(vec!["counter_advanced"]);
        let id = Uuid::new_v4();

        assert!(filter.matches(&counter(id, 1)));
        assert!(!filter.matches(&KinetrackEvent::DetectorReady {
            session_id: id,
            frame_index: 21
        }));
        assert!(EventFilter::All.matches(&KinetrackEvent::SourceEnded {
            session_id: id,
            reason: "eof".to_string()
        }));
    }
}
