//! Event queue
//!
//! FIFO buffer between ingestion and the drain timer. No reordering by
//! severity: events leave in the order they arrived.

use crate::config::DrainMode;
use crate::models::EnvironmentalEvent;
use std::collections::VecDeque;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<EnvironmentalEvent>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns the new depth
    pub async fn push(&self, event: EnvironmentalEvent) -> usize {
        let mut queue = self.inner.lock().await;
        queue.push_back(event);
        queue.len()
    }

    pub async fn pop(&self) -> Option<EnvironmentalEvent> {
        self.inner.lock().await.pop_front()
    }

    /// Takes one or all queued events, oldest first
    pub async fn drain(&self, mode: DrainMode) -> Vec<EnvironmentalEvent> {
        let mut queue = self.inner.lock().await;
        match mode {
            DrainMode::One => queue.pop_front().into_iter().collect(),
            DrainMode::All => queue.drain(..).collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventSource, EventType, Severity};

    fn event(description: &str, severity: Severity) -> EnvironmentalEvent {
        EnvironmentalEvent::new(EventType::MarketShift, severity, EventSource::Manual, description)
    }

    #[tokio::test]
    async fn test_fifo_ignores_severity() {
        let queue = EventQueue::new();
        queue.push(event("first", Severity::Low)).await;
        queue.push(event("second", Severity::Critical)).await;
        queue.push(event("third", Severity::Medium)).await;

        let drained: Vec<String> = queue
            .drain(DrainMode::All)
            .await
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(drained, vec!["first", "second", "third"]);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_drain_one_takes_oldest() {
        let queue = EventQueue::new();
        assert_eq!(queue.push(event("a", Severity::Low)).await, 1);
        assert_eq!(queue.push(event("b", Severity::Low)).await, 2);

        let first = queue.drain(DrainMode::One).await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].description, "a");
        assert_eq!(queue.len().await, 1);

        assert_eq!(queue.pop().await.map(|e| e.description), Some("b".to_string()));
        assert!(queue.drain(DrainMode::One).await.is_empty());
    }
}
