//! Container placement of top-level objects.
//!
//! # Responsibility
//! - Record which existing repository container each top-level object is
//!   placed under, and its requested position.
//!
//! # Invariants
//! - One placement per top-level object id.
//! - Placements are created before the pipeline runs and never mutated by
//!   filters (filters only receive `&PlacementIndex`).

use crate::model::object::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placement of one top-level object into an existing container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPlacement {
    pub top_object_id: ObjectId,
    /// Path of an existing repository container outside this submission.
    pub parent_container_path: String,
    /// Caller-requested position within the container.
    pub designated_order: Option<u32>,
    /// Position derived from submission sequence.
    pub submission_order: u32,
}

impl ContainerPlacement {
    pub fn new(
        top_object_id: ObjectId,
        parent_container_path: impl Into<String>,
        submission_order: u32,
    ) -> Self {
        Self {
            top_object_id,
            parent_container_path: parent_container_path.into(),
            designated_order: None,
            submission_order,
        }
    }

    pub fn with_designated_order(mut self, order: u32) -> Self {
        self.designated_order = Some(order);
        self
    }

    /// Requested position, falling back to submission sequence.
    pub fn effective_order(&self) -> u32 {
        self.designated_order.unwrap_or(self.submission_order)
    }
}

/// Placement lookup for one submission.
#[derive(Debug, Clone, Default)]
pub struct PlacementIndex {
    entries: BTreeMap<ObjectId, ContainerPlacement>,
}

impl PlacementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one placement, returning the one it replaced.
    pub fn insert(&mut self, placement: ContainerPlacement) -> Option<ContainerPlacement> {
        self.entries.insert(placement.top_object_id, placement)
    }

    pub fn get(&self, top_object_id: ObjectId) -> Option<&ContainerPlacement> {
        self.entries.get(&top_object_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Placements ordered by `(submission_order, top_object_id)`.
    pub fn in_submission_order(&self) -> Vec<&ContainerPlacement> {
        let mut placements: Vec<&ContainerPlacement> = self.entries.values().collect();
        placements.sort_by_key(|placement| (placement.submission_order, placement.top_object_id));
        placements
    }

    /// Distinct container paths in submission order of first use.
    pub fn container_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for placement in self.in_submission_order() {
            let path = placement.parent_container_path.as_str();
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}
