//! Director Module
//!
//! Role-bound decision functions. Every director is a shared [`DirectorCore`]
//! (role, expertise, authorities, runtime state) composed with a per-role
//! [`DirectorPolicy`] strategy object that supplies the domain logic:
//!
//! - **Chair**: board-level arbitration and strategic alignment
//! - **Strategy**: vision, positioning and opportunity response
//! - **Operations**: throughput, capacity and failure recovery
//! - **Technology**: feasibility, platform health and security posture
//! - **Finance**: budget, runway and financial viability
//! - **Legal**: regulatory exposure and compliance
//!
//! Decisions are synthesized deterministically from `(SystemState, EnvironmentalEvent)`
//! and validated by the same director straight away.

pub mod backup;
pub mod chair;
pub mod finance;
pub mod legal;
pub mod operations;
pub mod registry;
pub mod strategy;
pub mod technology;

pub use registry::{DirectorRegistry, DispatchTarget};

use crate::models::{
    clamp_unit, DirectorDecision, DirectorRole, DirectorSystemState, Domain, EnvironmentalEvent,
    EventType, ImpactAssessment, Severity, SystemState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Decisions at or below this confidence fail validation
pub const VALIDATION_THRESHOLD: f64 = 0.7;

/// Role-specific output of a policy before the core stamps it
#[derive(Debug, Clone, Default)]
pub struct DecisionDraft {
    pub decision: String,
    pub rationale: String,
    pub scope: Vec<String>,
    pub consequences: Vec<String>,
    pub mitigation: Vec<String>,
    pub signals: BTreeMap<String, f64>,
}

/// Domain logic for one board role
pub trait DirectorPolicy: Send + Sync {
    fn role(&self) -> DirectorRole;

    fn expertise(&self) -> &'static [&'static str];

    fn authorities(&self) -> &'static [&'static str];

    /// Event types this role treats as its own
    fn focus(&self) -> &'static [EventType];

    /// How this role weighs the six domains; weights sum to 1.0
    fn domain_weights(&self) -> &'static [(Domain, f64)];

    fn draft(&self, state: &SystemState, event: &EnvironmentalEvent) -> DecisionDraft;

    /// Role-specific secondary validation predicate
    fn domain_gate(&self, decision: &DirectorDecision) -> bool;

    fn recommendations(&self, state: &SystemState) -> Vec<String>;

    fn actions(&self, state: &SystemState) -> Vec<String>;
}

/// Identity and runtime state shared by all directors
#[derive(Debug)]
pub struct DirectorCore {
    role: DirectorRole,
    expertise: BTreeSet<String>,
    authorities: BTreeSet<String>,
    is_active: AtomicBool,
    system_state: AtomicU8,
}

impl DirectorCore {
    fn new(role: DirectorRole, expertise: &[&str], authorities: &[&str]) -> Self {
        Self {
            role,
            expertise: expertise.iter().map(|s| s.to_string()).collect(),
            authorities: authorities.iter().map(|s| s.to_string()).collect(),
            is_active: AtomicBool::new(true),
            system_state: AtomicU8::new(DirectorSystemState::Operational.as_u8()),
        }
    }
}

/// Role-weighted view of the current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetricsSnapshot {
    pub role: DirectorRole,
    pub weighted_score: f64,
    pub indicators: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversightStatus {
    Healthy,
    Attention,
    Critical,
    Inactive,
}

/// Result of a director reviewing its own domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversightResult {
    pub role: DirectorRole,
    pub status: OversightStatus,
    pub metrics: DomainMetricsSnapshot,
    pub recommendations: Vec<String>,
    pub actions: Vec<String>,
}

/// Externally visible director status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorStatus {
    pub role: DirectorRole,
    pub is_active: bool,
    pub system_state: DirectorSystemState,
    pub expertise: Vec<String>,
    pub authorities: Vec<String>,
    pub decisions_made: u64,
    pub decisions_rejected: u64,
    pub errors: u64,
}

/// A board director: shared core plus role policy
pub struct Director {
    core: DirectorCore,
    policy: Box<dyn DirectorPolicy>,
    decisions_made: AtomicU64,
    decisions_rejected: AtomicU64,
    errors: AtomicU64,
}

impl Director {
    pub fn new(policy: Box<dyn DirectorPolicy>) -> Self {
        let core = DirectorCore::new(policy.role(), policy.expertise(), policy.authorities());
        Self {
            core,
            policy,
            decisions_made: AtomicU64::new(0),
            decisions_rejected: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn role(&self) -> DirectorRole {
        self.core.role
    }

    pub fn expertise(&self) -> &BTreeSet<String> {
        &self.core.expertise
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.core.authorities
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active.load(Ordering::SeqCst)
    }

    pub fn system_state(&self) -> DirectorSystemState {
        DirectorSystemState::from_u8(self.core.system_state.load(Ordering::SeqCst))
    }

    pub fn activate(&self) {
        self.core.is_active.store(true, Ordering::SeqCst);
        self.core
            .system_state
            .store(DirectorSystemState::Operational.as_u8(), Ordering::SeqCst);
        audit(self.role(), "activate", "director brought online");
    }

    pub fn deactivate(&self) {
        self.core.is_active.store(false, Ordering::SeqCst);
        self.core
            .system_state
            .store(DirectorSystemState::Offline.as_u8(), Ordering::SeqCst);
        audit(self.role(), "deactivate", "director taken offline");
    }

    pub fn set_system_state(&self, state: DirectorSystemState) {
        self.core.system_state.store(state.as_u8(), Ordering::SeqCst);
        audit(self.role(), "set_system_state", &format!("{:?}", state));
    }

    /// Mark a failed decision attempt; the director degrades to `Error`
    pub fn record_error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.set_system_state(DirectorSystemState::Error);
        warn!(role = %self.role(), "Director error: {}", message);
    }

    /// Synthesize a decision for `event`. Never fails for business reasons.
    pub fn process_decision(&self, state: &SystemState, event: &EnvironmentalEvent) -> DirectorDecision {
        audit(
            self.role(),
            "process_decision",
            &format!("event={} type={} severity={}", event.id, event.event_type, event.severity),
        );

        let draft = self.policy.draft(state, event);
        let confidence = self.synthesize_confidence(state, event);

        let mut impact = ImpactAssessment::from_severity(event.severity);
        impact.scope = draft.scope;
        impact.consequences = draft.consequences;
        impact.mitigation = draft.mitigation;

        let mut decision = DirectorDecision {
            id: Uuid::new_v4(),
            director_role: self.role(),
            on_behalf_of: None,
            event_id: event.id,
            decision: draft.decision,
            rationale: draft.rationale,
            impact,
            timestamp: Utc::now(),
            confidence,
            signals: draft.signals,
            valid: false,
        };

        decision.valid = self.validate_decision(&decision);
        self.decisions_made.fetch_add(1, Ordering::SeqCst);
        if !decision.valid {
            self.decisions_rejected.fetch_add(1, Ordering::SeqCst);
            warn!(
                role = %self.role(),
                event_id = %event.id,
                confidence = decision.confidence,
                "Decision failed validation; recorded as flagged"
            );
        }

        decision
    }

    /// Confidence gate plus the role's domain gate. Pure for a given decision.
    pub fn validate_decision(&self, decision: &DirectorDecision) -> bool {
        if decision.director_role != self.role() {
            debug!(role = %self.role(), other = %decision.director_role, "Refusing to validate another role's decision");
            return false;
        }
        decision.confidence > VALIDATION_THRESHOLD && self.policy.domain_gate(decision)
    }

    /// Role-weighted snapshot of the domains this director watches
    pub fn monitor_domain_metrics(&self, state: &SystemState) -> DomainMetricsSnapshot {
        let indicators = self
            .policy
            .domain_weights()
            .iter()
            .map(|(domain, _)| (domain.as_str().to_string(), state.domain_score(*domain)))
            .collect();

        DomainMetricsSnapshot {
            role: self.role(),
            weighted_score: self.weighted_health(state),
            indicators,
            timestamp: Utc::now(),
        }
    }

    pub fn execute_oversight(&self, state: &SystemState) -> OversightResult {
        audit(self.role(), "execute_oversight", "domain review");
        let metrics = self.monitor_domain_metrics(state);

        let status = if !self.is_active() {
            OversightStatus::Inactive
        } else if metrics.weighted_score >= 0.7 {
            OversightStatus::Healthy
        } else if metrics.weighted_score >= 0.5 {
            OversightStatus::Attention
        } else {
            OversightStatus::Critical
        };

        OversightResult {
            role: self.role(),
            status,
            metrics,
            recommendations: self.policy.recommendations(state),
            actions: self.policy.actions(state),
        }
    }

    /// Whether this director may stand in for `other`
    pub fn can_backup(&self, other: DirectorRole) -> bool {
        backup::can_backup(self.role(), other)
    }

    pub fn status(&self) -> DirectorStatus {
        DirectorStatus {
            role: self.role(),
            is_active: self.is_active(),
            system_state: self.system_state(),
            expertise: self.core.expertise.iter().cloned().collect(),
            authorities: self.core.authorities.iter().cloned().collect(),
            decisions_made: self.decisions_made.load(Ordering::SeqCst),
            decisions_rejected: self.decisions_rejected.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
        }
    }

    fn weighted_health(&self, state: &SystemState) -> f64 {
        self.policy
            .domain_weights()
            .iter()
            .map(|(domain, weight)| weight * state.domain_score(*domain))
            .sum()
    }

    fn synthesize_confidence(&self, state: &SystemState, event: &EnvironmentalEvent) -> f64 {
        let expertise = if self.policy.focus().contains(&event.event_type) {
            0.1
        } else {
            -0.05
        };
        let uncertainty = match event.severity {
            Severity::Minimal | Severity::Low => 0.0,
            Severity::Medium => 0.02,
            Severity::High => 0.05,
            Severity::Critical => 0.08,
        };

        clamp_unit(state.confidence * 0.6 + self.weighted_health(state) * 0.3 + 0.1 + expertise - uncertainty)
    }
}

fn audit(role: DirectorRole, action: &str, context: &str) {
    info!(target: "governance::audit", role = %role, action = action, "{}", context);
}

/// Inserts a named signal, keeping the call sites in the policies short
pub(crate) fn signals(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
