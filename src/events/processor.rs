//! Event processor
//!
//! Routes one event to every dispatch target concurrently. Each director runs
//! in its own task so a failure (or panic) in one never stops the others.
//! Events are not retried.

use crate::directors::{DirectorRegistry, DispatchTarget};
use crate::events::bus::GovernanceBus;
use crate::models::{DirectorDecision, DirectorRole, EnvironmentalEvent, SystemState};
use crate::persistence::DecisionStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorFailure {
    pub role: DirectorRole,
    pub message: String,
}

/// Outcome of dispatching one event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub event_id: Uuid,
    pub decisions: Vec<DirectorDecision>,
    pub errors: Vec<DirectorFailure>,
}

impl DispatchReport {
    pub fn rejected(&self) -> usize {
        self.decisions.iter().filter(|d| !d.valid).count()
    }
}

pub struct EventProcessor {
    registry: Arc<DirectorRegistry>,
    store: Arc<dyn DecisionStore>,
    bus: Arc<GovernanceBus>,
}

impl EventProcessor {
    pub fn new(registry: Arc<DirectorRegistry>, store: Arc<dyn DecisionStore>, bus: Arc<GovernanceBus>) -> Self {
        Self { registry, store, bus }
    }

    pub fn registry(&self) -> &Arc<DirectorRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        &self.store
    }

    pub async fn dispatch(&self, state: Arc<SystemState>, event: EnvironmentalEvent) -> DispatchReport {
        let event = Arc::new(event);
        let mut tasks = JoinSet::new();
        let mut owners: HashMap<tokio::task::Id, DispatchTarget> = HashMap::new();

        for target in self.registry.dispatch_targets() {
            let director = Arc::clone(&target.director);
            let on_behalf_of = target.on_behalf_of;
            let state = Arc::clone(&state);
            let event = Arc::clone(&event);

            let handle = tasks.spawn(async move {
                let mut decision = director.process_decision(&state, &event);
                decision.on_behalf_of = on_behalf_of;
                decision
            });
            owners.insert(handle.id(), target);
        }

        let mut decisions = Vec::with_capacity(owners.len());
        let mut errors = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, decision)) => decisions.push(decision),
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        "director task panicked".to_string()
                    } else {
                        join_error.to_string()
                    };
                    match owners.get(&join_error.id()) {
                        Some(target) => {
                            target.director.record_error(&message);
                            errors.push(DirectorFailure {
                                role: target.director.role(),
                                message,
                            });
                        }
                        None => error!("Unattributed director failure: {}", message),
                    }
                }
            }
        }

        // Completion order is arbitrary; report in role order
        decisions.sort_by_key(|d| (d.director_role, d.on_behalf_of));

        for decision in &decisions {
            if let Err(e) = self.store.save_decision(decision).await {
                warn!(
                    decision_id = %decision.id,
                    backend = self.store.backend(),
                    "Failed to persist decision: {}", e
                );
            }
            self.bus.publish_decision(decision.clone());
        }

        debug!(
            event_id = %event.id,
            decisions = decisions.len(),
            errors = errors.len(),
            "Dispatched event"
        );

        DispatchReport {
            event_id: event.id,
            decisions,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directors::{DecisionDraft, Director, DirectorPolicy};
    use crate::models::{DirectorSystemState, Domain, EventSource, EventType, Severity};
    use crate::persistence::MemoryStore;

    struct FaultyPolicy;

    impl DirectorPolicy for FaultyPolicy {
        fn role(&self) -> DirectorRole {
            DirectorRole::Research
        }
        fn expertise(&self) -> &'static [&'static str] {
            &["experiments"]
        }
        fn authorities(&self) -> &'static [&'static str] {
            &[]
        }
        fn focus(&self) -> &'static [EventType] {
            &[]
        }
        fn domain_weights(&self) -> &'static [(Domain, f64)] {
            &[(Domain::Research, 1.0)]
        }
        fn draft(&self, _: &SystemState, _: &EnvironmentalEvent) -> DecisionDraft {
            panic!("model backend exploded")
        }
        fn domain_gate(&self, _: &DirectorDecision) -> bool {
            true
        }
        fn recommendations(&self, _: &SystemState) -> Vec<String> {
            Vec::new()
        }
        fn actions(&self, _: &SystemState) -> Vec<String> {
            Vec::new()
        }
    }

    fn event() -> EnvironmentalEvent {
        EnvironmentalEvent::new(
            EventType::OperationalFailure,
            Severity::High,
            EventSource::Manual,
            "primary region down",
        )
    }

    #[tokio::test]
    async fn test_every_director_decides_once() {
        let store = Arc::new(MemoryStore::new());
        let processor = EventProcessor::new(
            Arc::new(DirectorRegistry::standard()),
            store.clone(),
            Arc::new(GovernanceBus::new()),
        );

        let event = event();
        let report = processor.dispatch(Arc::new(SystemState::fallback()), event.clone()).await;

        assert_eq!(report.decisions.len(), 6);
        assert!(report.errors.is_empty());
        assert!(report.decisions.iter().all(|d| d.event_id == event.id));

        let mut roles: Vec<_> = report.decisions.iter().map(|d| d.director_role).collect();
        roles.dedup();
        assert_eq!(roles.len(), 6);
        assert_eq!(store.decision_count().await, 6);
    }

    #[tokio::test]
    async fn test_director_failure_is_isolated() {
        let mut registry = DirectorRegistry::standard();
        registry.register(Director::new(Box::new(FaultyPolicy)));
        let registry = Arc::new(registry);

        let processor = EventProcessor::new(
            Arc::clone(&registry),
            Arc::new(MemoryStore::new()),
            Arc::new(GovernanceBus::new()),
        );

        let report = processor.dispatch(Arc::new(SystemState::fallback()), event()).await;

        assert_eq!(report.decisions.len(), 6);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].role, DirectorRole::Research);

        let faulty = registry.get(DirectorRole::Research).unwrap();
        assert_eq!(faulty.system_state(), DirectorSystemState::Error);
        assert_eq!(faulty.status().errors, 1);
    }

    #[tokio::test]
    async fn test_decisions_are_broadcast() {
        let bus = Arc::new(GovernanceBus::new());
        let mut rx = bus.subscribe_decisions();
        let processor = EventProcessor::new(
            Arc::new(DirectorRegistry::standard()),
            Arc::new(MemoryStore::new()),
            Arc::clone(&bus),
        );

        let report = processor.dispatch(Arc::new(SystemState::fallback()), event()).await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.id, report.decisions[0].id);
    }
}
