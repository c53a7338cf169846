//! Append-only provenance log.
//!
//! # Responsibility
//! - Define provenance event records emitted by filters.
//! - Accumulate one event list per object across the whole filter chain.
//!
//! # Invariants
//! - Events are never edited or removed once appended.
//! - `sequence` is strictly increasing in append order across all objects.
//! - The log is in-memory only; it reaches durable storage solely through
//!   a successful commit.

use crate::model::object::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kind of action recorded by one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Normalization,
    Validation,
    FixityCheck,
    VirusCheck,
    Creation,
    Ingestion,
    MetadataModification,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normalization => "normalization",
            Self::Validation => "validation",
            Self::FixityCheck => "fixity_check",
            Self::VirusCheck => "virus_check",
            Self::Creation => "creation",
            Self::Ingestion => "ingestion",
            Self::MetadataModification => "metadata_modification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Outcome of one recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub status: OutcomeStatus,
    pub detail: Option<String>,
}

impl EventOutcome {
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Role an agent played in one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Software that performed the action.
    Executor,
    /// Person or group on whose authority the action ran.
    Authorizer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAgent {
    pub role: AgentRole,
    pub name: String,
}

impl LinkedAgent {
    pub fn executor(name: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Executor,
            name: name.into(),
        }
    }

    pub fn authorizer(name: impl Into<String>) -> Self {
        Self {
            role: AgentRole::Authorizer,
            name: name.into(),
        }
    }
}

/// One structured audit record about one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEvent {
    pub event_id: Uuid,
    /// Assigned by `ProvenanceLog::append`; zero until appended.
    pub sequence: u64,
    pub target_id: ObjectId,
    pub event_type: EventType,
    pub detail: String,
    pub outcome: EventOutcome,
    pub agents: Vec<LinkedAgent>,
    pub occurred_at: DateTime<Utc>,
}

impl ProvenanceEvent {
    /// Creates a successful event stamped with the current time.
    pub fn new(target_id: ObjectId, event_type: EventType, detail: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            sequence: 0,
            target_id,
            event_type,
            detail: detail.into(),
            outcome: EventOutcome::success(),
            agents: Vec::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_outcome(mut self, outcome: EventOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_agent(mut self, agent: LinkedAgent) -> Self {
        self.agents.push(agent);
        self
    }
}

/// Per-object event lists for one submission.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceLog {
    events: BTreeMap<ObjectId, Vec<ProvenanceEvent>>,
    next_sequence: u64,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event and returns its assigned sequence number.
    pub fn append(&mut self, mut event: ProvenanceEvent) -> u64 {
        self.next_sequence += 1;
        event.sequence = self.next_sequence;
        self.events.entry(event.target_id).or_default().push(event);
        self.next_sequence
    }

    /// Events recorded for one object, oldest first.
    pub fn events_for(&self, target_id: ObjectId) -> &[ProvenanceEvent] {
        self.events
            .get(&target_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count_for(&self, target_id: ObjectId, event_type: EventType) -> usize {
        self.events_for(target_id)
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    pub fn count_of(&self, event_type: EventType) -> usize {
        self.events
            .values()
            .flatten()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every event across all objects in append order.
    pub fn backlog(&self) -> Vec<ProvenanceEvent> {
        let mut events: Vec<ProvenanceEvent> = self.events.values().flatten().cloned().collect();
        events.sort_by_key(|event| event.sequence);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::{EventOutcome, EventType, ProvenanceEvent, ProvenanceLog};
    use uuid::Uuid;

    #[test]
    fn backlog_follows_append_order_across_objects() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut log = ProvenanceLog::new();
        log.append(ProvenanceEvent::new(second, EventType::Validation, "b1"));
        log.append(ProvenanceEvent::new(first, EventType::Validation, "a1"));
        log.append(ProvenanceEvent::new(second, EventType::VirusCheck, "b2"));

        let details: Vec<String> = log.backlog().into_iter().map(|event| event.detail).collect();
        assert_eq!(details, vec!["b1", "a1", "b2"]);
        assert_eq!(log.events_for(second).len(), 2);
        assert_eq!(log.count_for(second, EventType::VirusCheck), 1);
        assert!(log.events_for(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn failure_outcome_keeps_detail() {
        let outcome = EventOutcome::failure("transform failed");
        assert!(!outcome.is_success());
        assert_eq!(outcome.detail.as_deref(), Some("transform failed"));
    }
}
