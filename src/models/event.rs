//! Environmental events
//!
//! Typed, severity-ranked signals that enter the system through ingestion or
//! manual injection. Events are immutable once built and are consumed exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// The ten kinds of environmental signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    MarketShift,
    RegulatoryChange,
    TechnologyDisruption,
    SecurityIncident,
    ResourceConstraint,
    PerformanceDegradation,
    StrategicOpportunity,
    OperationalFailure,
    ComplianceViolation,
    StakeholderRequest,
}

impl EventType {
    pub const ALL: [EventType; 10] = [
        EventType::MarketShift,
        EventType::RegulatoryChange,
        EventType::TechnologyDisruption,
        EventType::SecurityIncident,
        EventType::ResourceConstraint,
        EventType::PerformanceDegradation,
        EventType::StrategicOpportunity,
        EventType::OperationalFailure,
        EventType::ComplianceViolation,
        EventType::StakeholderRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MarketShift => "market_shift",
            EventType::RegulatoryChange => "regulatory_change",
            EventType::TechnologyDisruption => "technology_disruption",
            EventType::SecurityIncident => "security_incident",
            EventType::ResourceConstraint => "resource_constraint",
            EventType::PerformanceDegradation => "performance_degradation",
            EventType::StrategicOpportunity => "strategic_opportunity",
            EventType::OperationalFailure => "operational_failure",
            EventType::ComplianceViolation => "compliance_violation",
            EventType::StakeholderRequest => "stakeholder_request",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal severity, 1 (minimal) to 5 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Minimal = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Critical = 5,
}

impl Severity {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Severity::Minimal),
            2 => Some(Severity::Low),
            3 => Some(Severity::Medium),
            4 => Some(Severity::High),
            5 => Some(Severity::Critical),
            _ => None,
        }
    }

    /// High and Critical events are escalated by the tactical layer
    pub fn is_escalation_worthy(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Minimal => "MINIMAL",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Ingestion,
    Manual,
    Workspace,
    Insight,
    Oversight,
    System,
}

/// Expected lifetime of an impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDuration {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

/// Impact carried by events and decisions alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAssessment {
    pub severity: Severity,
    pub scope: Vec<String>,
    pub duration: ImpactDuration,
    pub consequences: Vec<String>,
    pub mitigation: Vec<String>,
}

impl ImpactAssessment {
    /// Minimal impact derived from the severity alone
    pub fn from_severity(severity: Severity) -> Self {
        let duration = match severity {
            Severity::Critical => ImpactDuration::Immediate,
            Severity::High => ImpactDuration::ShortTerm,
            Severity::Medium => ImpactDuration::MediumTerm,
            Severity::Low | Severity::Minimal => ImpactDuration::LongTerm,
        };
        Self {
            severity,
            scope: Vec::new(),
            duration,
            consequences: Vec::new(),
            mitigation: Vec::new(),
        }
    }
}

/// A typed, severity-ranked signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: Severity,
    pub source: EventSource,
    pub description: String,
    pub impact: ImpactAssessment,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EnvironmentalEvent {
    pub fn new(
        event_type: EventType,
        severity: Severity,
        source: EventSource,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            severity,
            source,
            description: description.into(),
            impact: ImpactAssessment::from_severity(severity),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_impact(mut self, impact: ImpactAssessment) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
