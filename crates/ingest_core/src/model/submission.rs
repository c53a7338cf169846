//! One submission moving through the filter chain.
//!
//! # Responsibility
//! - Bundle the object graph, container placements, provenance log and
//!   deposit metadata handed over by upstream normalizers.
//! - Track scratch resources that must be released if the submission fails.
//!
//! # Invariants
//! - Submissions share no mutable state with each other.
//! - Scratch objects are removed from the graph only by `release_scratch`.

use crate::model::graph::ObjectGraph;
use crate::model::object::ObjectId;
use crate::model::placement::PlacementIndex;
use crate::model::provenance::ProvenanceLog;
use log::warn;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Administrative description of the submission as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositInfo {
    /// Label of the synthesized deposit record.
    pub label: String,
    /// Submitting agent.
    pub depositor: String,
    /// Deposit method, e.g. `sword` or `web_form`.
    pub method: String,
    pub on_behalf_of: Option<String>,
    /// Packaging type, e.g. `bagit` or `mets`.
    pub packaging_type: String,
    pub packaging_subtype: Option<String>,
}

impl DepositInfo {
    pub fn new(
        label: impl Into<String>,
        depositor: impl Into<String>,
        method: impl Into<String>,
        packaging_type: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            depositor: depositor.into(),
            method: method.into(),
            on_behalf_of: None,
            packaging_type: packaging_type.into(),
            packaging_subtype: None,
        }
    }
}

/// What `release_scratch` cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub files_removed: usize,
    pub objects_removed: usize,
    /// Scratch files that could not be removed, with the reason.
    pub errors: Vec<String>,
}

/// Submission state shared by every filter.
#[derive(Debug, Clone)]
pub struct Submission {
    id: Uuid,
    pub graph: ObjectGraph,
    pub placements: PlacementIndex,
    pub provenance: ProvenanceLog,
    pub deposit: DepositInfo,
    scratch_files: Vec<PathBuf>,
    scratch_objects: Vec<ObjectId>,
}

impl Submission {
    pub fn new(graph: ObjectGraph, placements: PlacementIndex, deposit: DepositInfo) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph,
            placements,
            provenance: ProvenanceLog::new(),
            deposit,
            scratch_files: Vec::new(),
            scratch_objects: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Registers a temporary file owned by this submission.
    pub fn register_scratch_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        if !self.scratch_files.contains(&path) {
            self.scratch_files.push(path);
        }
    }

    /// Registers an object that exists only while the submission is in flight.
    pub fn register_scratch_object(&mut self, id: ObjectId) {
        if !self.scratch_objects.contains(&id) {
            self.scratch_objects.push(id);
        }
    }

    pub fn scratch_files(&self) -> &[PathBuf] {
        &self.scratch_files
    }

    pub fn scratch_objects(&self) -> &[ObjectId] {
        &self.scratch_objects
    }

    /// Keeps scratch objects as regular objects once the submission commits.
    ///
    /// Returns how many objects were promoted.
    pub fn promote_scratch_objects(&mut self) -> usize {
        let promoted = self.scratch_objects.len();
        self.scratch_objects.clear();
        promoted
    }

    /// Deletes scratch files and removes scratch objects from the graph.
    ///
    /// Missing files count as already released.
    pub fn release_scratch(&mut self) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        for path in self.scratch_files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => summary.files_removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(
                        "event=scratch_release module=submission status=error path={} error={}",
                        path.display(),
                        err
                    );
                    summary.errors.push(format!("{}: {err}", path.display()));
                }
            }
        }
        for id in self.scratch_objects.drain(..) {
            if self.graph.remove_object(id).is_some() {
                summary.objects_removed += 1;
            }
        }
        summary
    }
}
