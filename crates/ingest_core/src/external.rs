//! Collaborator contracts consumed by the ingest core.
//!
//! # Responsibility
//! - Declare the interfaces of the live repository path index, the
//!   descriptive crosswalk, the virus scanner and the commit sink.
//! - Keep implementations (network clients, stores) outside the core.
//!
//! # Invariants
//! - Calls are blocking; timeouts belong to the collaborator's own client.
//! - `VirusScanner` is `Send + Sync` so scans may run on worker threads.

use crate::model::object::{ContentModel, ObjectRecord};
use crate::model::provenance::ProvenanceEvent;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Resolved node of the live repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    pub node_id: String,
    pub path: String,
}

/// A collaborator could not answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

impl Display for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.collaborator, self.message)
    }
}

impl Error for CollaboratorError {}

/// Path lookups against the live repository.
pub trait ExternalPathIndex {
    /// Resolves one path; `Ok(None)` means nothing lives there.
    fn lookup(&self, path: &str) -> Result<Option<ContainerHandle>, CollaboratorError>;
    /// Capability types of one resolved node.
    fn list_content_models(
        &self,
        handle: &ContainerHandle,
    ) -> Result<BTreeSet<ContentModel>, CollaboratorError>;
}

/// The crosswalk rejected a native descriptive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for TransformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "descriptive transform failed: {}", self.message)
    }
}

impl Error for TransformError {}

/// Native-to-normalized descriptive metadata transform.
pub trait DescriptiveCrosswalk {
    /// Name of the native format, e.g. `mods`.
    fn source_format(&self) -> &str;
    /// Name of the derived format, e.g. `dc`.
    fn target_format(&self) -> &str;
    fn transform(&self, native_record: &str) -> Result<String, TransformError>;
}

/// Verdict of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    /// Scanner found malware; `report` is the scanner's own description.
    Infected { report: String },
    /// Scanner could not perform the check at all.
    ScanError { cause: String },
}

pub trait VirusScanner: Send + Sync {
    /// Name recorded as the executing agent on scan events.
    fn agent_name(&self) -> &str;
    fn scan(&self, file_bytes: &[u8]) -> ScanVerdict;
}

/// One object as handed to the commit sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedObject {
    pub record: ObjectRecord,
    /// `None` for objects placed outside the path hierarchy (deposit records).
    pub canonical_path: Option<String>,
}

/// Everything a successful run persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPackage {
    pub submission_id: Uuid,
    pub objects: Vec<CommittedObject>,
    pub events: Vec<ProvenanceEvent>,
}

/// Atomic persistence of a finished package plus its audit trail.
pub trait CommitSink {
    /// Persists everything or nothing.
    fn commit(&self, package: &CommitPackage) -> Result<(), CollaboratorError>;
}
