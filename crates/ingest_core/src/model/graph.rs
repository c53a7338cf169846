//! In-memory object graph for one submission.
//!
//! # Responsibility
//! - Own every candidate object and the typed relationships between them.
//! - Answer structural queries (children, parents, ancestor chains).
//! - Produce serialized records for dirty objects on flush.
//!
//! # Invariants
//! - Relationships only connect objects present in the graph.
//! - Object iteration follows insertion (submission) order.
//! - `Contains` edges are expected to form a forest; violations are reported
//!   by `containment_violations`, never silently repaired.

use crate::model::object::{CandidateObject, ObjectId, ObjectRecord, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors from object graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Nil UUID is never a valid object id.
    NilObjectId,
    /// Object is not part of this graph.
    UnknownObject(ObjectId),
    /// Object id is already present.
    DuplicateObject(ObjectId),
    /// Relationship endpoints are the same object.
    SelfRelationship(ObjectId),
    /// Walking `Contains` edges upward revisited an object.
    ContainmentCycle(ObjectId),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilObjectId => write!(f, "object id must not be nil"),
            Self::UnknownObject(id) => write!(f, "object not in graph: {id}"),
            Self::DuplicateObject(id) => write!(f, "object already in graph: {id}"),
            Self::SelfRelationship(id) => write!(f, "object cannot relate to itself: {id}"),
            Self::ContainmentCycle(id) => write!(f, "containment cycle reached from object {id}"),
        }
    }
}

impl Error for GraphError {}

/// Typed relationship kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Parent contains child.
    Contains,
    /// Source precedes target among siblings.
    Precedes,
    /// Source originates from the target deposit record.
    OriginatesFrom,
}

impl RelationshipType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Precedes => "precedes",
            Self::OriginatesFrom => "originates_from",
        }
    }
}

/// Directed, typed edge between two objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from: ObjectId,
    pub to: ObjectId,
    pub kind: RelationshipType,
}

/// Why an object breaks the containment forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentProblem {
    /// Object has more than one containing parent.
    MultipleParents(usize),
    /// Object sits on or above a containment cycle.
    Cycle,
}

/// One containment forest violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentViolation {
    pub object_id: ObjectId,
    pub problem: ContainmentProblem,
}

/// Object graph for one submission.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    objects: BTreeMap<ObjectId, CandidateObject>,
    order: Vec<ObjectId>,
    relationships: Vec<Relationship>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one object at the end of submission order.
    pub fn insert_object(&mut self, object: CandidateObject) -> GraphResult<ObjectId> {
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Err(GraphError::DuplicateObject(id));
        }
        self.objects.insert(id, object);
        self.order.push(id);
        Ok(id)
    }

    /// Removes one object and every relationship touching it.
    ///
    /// Only used by whole-submission rollback of scratch objects.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<CandidateObject> {
        let removed = self.objects.remove(&id)?;
        self.order.retain(|current| *current != id);
        self.relationships
            .retain(|relationship| relationship.from != id && relationship.to != id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&CandidateObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut CandidateObject> {
        self.objects.get_mut(&id)
    }

    /// Object ids in submission order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.order.clone()
    }

    /// Objects in submission order.
    pub fn objects(&self) -> impl Iterator<Item = &CandidateObject> {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    pub fn get_property(&self, id: ObjectId, predicate: &str) -> GraphResult<&[PropertyValue]> {
        self.objects
            .get(&id)
            .map(|object| object.property(predicate))
            .ok_or(GraphError::UnknownObject(id))
    }

    pub fn set_property(
        &mut self,
        id: ObjectId,
        predicate: &str,
        value: PropertyValue,
    ) -> GraphResult<()> {
        self.require_mut(id)?.set_property(predicate, value);
        Ok(())
    }

    pub fn remove_property(
        &mut self,
        id: ObjectId,
        predicate: &str,
    ) -> GraphResult<Vec<PropertyValue>> {
        Ok(self.require_mut(id)?.remove_property(predicate))
    }

    /// Adds one relationship. Returns `false` when the same edge already exists.
    pub fn add_relationship(
        &mut self,
        from: ObjectId,
        to: ObjectId,
        kind: RelationshipType,
    ) -> GraphResult<bool> {
        if from == to {
            return Err(GraphError::SelfRelationship(from));
        }
        self.require(to)?;
        let relationship = Relationship { from, to, kind };
        if self.relationships.contains(&relationship) {
            return Ok(false);
        }
        self.require_mut(from)?.mark_dirty();
        self.relationships.push(relationship);
        Ok(true)
    }

    /// Removes one relationship. Returns `false` when it did not exist.
    pub fn remove_relationship(
        &mut self,
        from: ObjectId,
        to: ObjectId,
        kind: RelationshipType,
    ) -> GraphResult<bool> {
        let before = self.relationships.len();
        self.relationships
            .retain(|edge| !(edge.from == from && edge.to == to && edge.kind == kind));
        if self.relationships.len() == before {
            return Ok(false);
        }
        self.require_mut(from)?.mark_dirty();
        Ok(true)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Targets of `kind` edges leaving `id`, in insertion order.
    ///
    /// Unknown objects and objects without such edges yield an empty list.
    pub fn children(&self, id: ObjectId, kind: RelationshipType) -> Vec<ObjectId> {
        self.relationships
            .iter()
            .filter(|edge| edge.from == id && edge.kind == kind)
            .map(|edge| edge.to)
            .collect()
    }

    /// Every containing parent of `id`.
    pub fn parents_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.relationships
            .iter()
            .filter(|edge| edge.to == id && edge.kind == RelationshipType::Contains)
            .map(|edge| edge.from)
            .collect()
    }

    /// First containing parent of `id`, if any.
    pub fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.relationships
            .iter()
            .find(|edge| edge.to == id && edge.kind == RelationshipType::Contains)
            .map(|edge| edge.from)
    }

    /// Walks `Contains` edges upward.
    ///
    /// Returns `[id, parent, ..., top]`; the last entry has no parent.
    pub fn ancestor_chain(&self, id: ObjectId) -> GraphResult<Vec<ObjectId>> {
        self.require(id)?;
        let mut chain = vec![id];
        let mut visited = HashSet::from([id]);
        let mut cursor = self.parent_of(id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                return Err(GraphError::ContainmentCycle(id));
            }
            chain.push(current);
            cursor = self.parent_of(current);
        }
        Ok(chain)
    }

    /// Objects with no containing parent, in submission order.
    pub fn top_level_objects(&self) -> Vec<ObjectId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.parent_of(*id).is_none())
            .collect()
    }

    /// Reports every object that breaks the containment forest.
    pub fn containment_violations(&self) -> Vec<ContainmentViolation> {
        let mut violations = Vec::new();
        for id in &self.order {
            let parents = self.parents_of(*id).len();
            if parents > 1 {
                violations.push(ContainmentViolation {
                    object_id: *id,
                    problem: ContainmentProblem::MultipleParents(parents),
                });
                continue;
            }
            if matches!(
                self.ancestor_chain(*id),
                Err(GraphError::ContainmentCycle(_))
            ) {
                violations.push(ContainmentViolation {
                    object_id: *id,
                    problem: ContainmentProblem::Cycle,
                });
            }
        }
        violations
    }

    pub fn mark_dirty(&mut self, id: ObjectId) -> GraphResult<()> {
        self.require_mut(id)?.mark_dirty();
        Ok(())
    }

    /// Dirty object ids in submission order.
    pub fn dirty_ids(&self) -> Vec<ObjectId> {
        self.objects()
            .filter(|object| object.is_dirty())
            .map(CandidateObject::id)
            .collect()
    }

    /// Serializes every dirty object and clears its dirty flag.
    pub fn flush(&mut self) -> Vec<ObjectRecord> {
        let dirty = self.dirty_ids();
        let mut records = Vec::with_capacity(dirty.len());
        for id in dirty {
            let outgoing = self.outgoing(id);
            if let Some(object) = self.objects.get_mut(&id) {
                records.push(ObjectRecord::snapshot(object, outgoing));
                object.clear_dirty();
            }
        }
        records
    }

    /// Serialized snapshot of one object regardless of dirty state.
    pub fn snapshot(&self, id: ObjectId) -> GraphResult<ObjectRecord> {
        let object = self.require(id)?;
        Ok(ObjectRecord::snapshot(object, self.outgoing(id)))
    }

    fn outgoing(&self, id: ObjectId) -> Vec<Relationship> {
        self.relationships
            .iter()
            .filter(|edge| edge.from == id)
            .copied()
            .collect()
    }

    fn require(&self, id: ObjectId) -> GraphResult<&CandidateObject> {
        self.objects.get(&id).ok_or(GraphError::UnknownObject(id))
    }

    fn require_mut(&mut self, id: ObjectId) -> GraphResult<&mut CandidateObject> {
        self.objects.get_mut(&id).ok_or(GraphError::UnknownObject(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{ContainmentProblem, GraphError, ObjectGraph, RelationshipType};
    use crate::model::object::CandidateObject;

    fn graph_with(count: usize) -> (ObjectGraph, Vec<uuid::Uuid>) {
        let mut graph = ObjectGraph::new();
        let ids = (0..count)
            .map(|_| graph.insert_object(CandidateObject::new()).unwrap())
            .collect();
        (graph, ids)
    }

    #[test]
    fn duplicate_relationship_is_a_no_op() {
        let (mut graph, ids) = graph_with(2);
        assert!(graph
            .add_relationship(ids[0], ids[1], RelationshipType::Contains)
            .unwrap());
        assert!(!graph
            .add_relationship(ids[0], ids[1], RelationshipType::Contains)
            .unwrap());
        assert!(graph
            .add_relationship(ids[0], ids[1], RelationshipType::Precedes)
            .unwrap());
        assert_eq!(graph.relationships().len(), 2);
    }

    #[test]
    fn self_relationship_is_rejected() {
        let (mut graph, ids) = graph_with(1);
        let err = graph
            .add_relationship(ids[0], ids[0], RelationshipType::Contains)
            .unwrap_err();
        assert_eq!(err, GraphError::SelfRelationship(ids[0]));
    }

    #[test]
    fn cycle_is_reported_for_every_member() {
        let (mut graph, ids) = graph_with(3);
        graph
            .add_relationship(ids[0], ids[1], RelationshipType::Contains)
            .unwrap();
        graph
            .add_relationship(ids[1], ids[0], RelationshipType::Contains)
            .unwrap();
        let violations = graph.containment_violations();
        assert_eq!(violations.len(), 2);
        assert!(violations
            .iter()
            .all(|violation| violation.problem == ContainmentProblem::Cycle));
        assert_eq!(
            graph.ancestor_chain(ids[0]).unwrap_err(),
            GraphError::ContainmentCycle(ids[0])
        );
    }

    #[test]
    fn remove_object_drops_touching_relationships() {
        let (mut graph, ids) = graph_with(2);
        graph
            .add_relationship(ids[0], ids[1], RelationshipType::Contains)
            .unwrap();
        assert!(graph.remove_object(ids[1]).is_some());
        assert!(graph.relationships().is_empty());
        assert_eq!(graph.object_ids(), vec![ids[0]]);
    }
}
