//! State channel and governance bus
//!
//! `StateChannel` holds the latest `SystemState` (new subscribers see it
//! immediately). `GovernanceBus` fans events and decisions out to whoever is
//! listening; nobody listening is not an error.

use crate::models::{DirectorDecision, EnvironmentalEvent, SystemState, SystemStateUpdate};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const BUS_CAPACITY: usize = 1024;

pub struct StateChannel {
    tx: watch::Sender<Arc<SystemState>>,
}

impl StateChannel {
    pub fn new(initial: SystemState) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    pub fn current(&self) -> Arc<SystemState> {
        self.tx.borrow().clone()
    }

    /// Replaces the state wholesale
    pub fn publish(&self, state: SystemState) -> Arc<SystemState> {
        let state = Arc::new(state);
        self.tx.send_replace(Arc::clone(&state));
        state
    }

    /// Shallow-overlays whole domain blocks onto the current state
    pub fn apply(&self, update: &SystemStateUpdate) -> Arc<SystemState> {
        let next = self.current().with_update(update);
        self.publish(next)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemState>> {
        self.tx.subscribe()
    }
}

pub struct GovernanceBus {
    events: broadcast::Sender<EnvironmentalEvent>,
    decisions: broadcast::Sender<DirectorDecision>,
}

impl GovernanceBus {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(BUS_CAPACITY);
        let (decisions, _) = broadcast::channel(BUS_CAPACITY);
        Self { events, decisions }
    }

    pub fn publish_event(&self, event: EnvironmentalEvent) {
        let _ = self.events.send(event);
    }

    pub fn publish_decision(&self, decision: DirectorDecision) {
        let _ = self.decisions.send(decision);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EnvironmentalEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_decisions(&self) -> broadcast::Receiver<DirectorDecision> {
        self.decisions.subscribe()
    }
}

impl Default for GovernanceBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventSource, EventType, Severity};

    #[test]
    fn test_late_subscriber_sees_latest_state() {
        let channel = StateChannel::new(SystemState::fallback());
        let mut next = SystemState::fallback();
        next.confidence = 0.95;
        channel.publish(next);

        let rx = channel.subscribe();
        assert_eq!(rx.borrow().confidence, 0.95);
    }

    #[test]
    fn test_apply_overlays_current_state() {
        let channel = StateChannel::new(SystemState::fallback());
        let applied = channel.apply(&SystemStateUpdate {
            confidence: Some(0.5),
            ..Default::default()
        });
        assert_eq!(applied.confidence, 0.5);
        assert_eq!(channel.current().confidence, 0.5);
    }

    #[tokio::test]
    async fn test_bus_without_subscribers_is_silent() {
        let bus = GovernanceBus::new();
        bus.publish_event(EnvironmentalEvent::new(
            EventType::MarketShift,
            Severity::Low,
            EventSource::System,
            "nobody listening",
        ));

        let mut rx = bus.subscribe_events();
        let event = EnvironmentalEvent::new(
            EventType::MarketShift,
            Severity::Low,
            EventSource::System,
            "heard",
        );
        bus.publish_event(event.clone());
        assert_eq!(rx.recv().await.unwrap().id, event.id);
    }
}
