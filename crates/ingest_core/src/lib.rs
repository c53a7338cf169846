//! Pre-commit ingest pipeline.
//!
//! Validates and normalizes one submission's object graph through an ordered
//! filter chain, accumulates provenance, and hands the finished package to an
//! atomic commit sink.

pub mod config;
pub mod db;
pub mod external;
pub mod filter;
pub mod logging;
pub mod model;
pub mod path;
pub mod pipeline;
pub mod repo;

pub use config::{ConfigError, ConflictMode, PipelineConfig};
pub use external::{
    CollaboratorError, CommitPackage, CommitSink, CommittedObject, ContainerHandle,
    DescriptiveCrosswalk, ExternalPathIndex, ScanVerdict, TransformError, VirusScanner,
};
pub use filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::graph::{GraphError, ObjectGraph, Relationship, RelationshipType};
pub use model::object::{predicate, CandidateObject, ContentModel, ObjectId, PropertyValue};
pub use model::placement::{ContainerPlacement, PlacementIndex};
pub use model::provenance::{EventType, ProvenanceEvent, ProvenanceLog};
pub use model::submission::{DepositInfo, Submission};
pub use pipeline::{Pipeline, PipelineFailure, PipelineOutcome, PipelineState};
pub use repo::commit_sink::SqliteCommitSink;
pub use repo::path_index::SqlitePathIndex;
pub use repo::{RepoError, RepoResult};

/// Minimal health-check API for callers checking the crate is linked.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
