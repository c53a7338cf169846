//! Candidate object model.
//!
//! # Responsibility
//! - Define one candidate object: identity, property map and payload slots.
//! - Define the predicate vocabulary and content model tags read by filters.
//!
//! # Invariants
//! - `id` is never nil and never changes after construction.
//! - Every mutation marks the object dirty until the owning graph flushes it.
//! - Property and payload maps are ordered so serialized records are stable.

use crate::model::graph::{GraphError, GraphResult, Relationship};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Stable identifier for one candidate object.
pub type ObjectId = Uuid;

/// Predicate names understood by the ingest filters.
pub mod predicate {
    /// Content model tag, one value per model.
    pub const HAS_MODEL: &str = "has_model";
    /// Owning principal, literal or reference.
    pub const OWNER: &str = "owner";
    /// Single path segment used to compose the canonical path.
    pub const SLUG: &str = "slug";
    /// Human-readable title.
    pub const LABEL: &str = "label";
    /// Marker stamped once requirements are satisfied.
    pub const PRESERVED: &str = "preserved";
    /// Local filesystem location of the file payload.
    pub const FILE_LOCATION: &str = "file_location";
    /// Lowercase hex SHA-256 digest of the file payload.
    pub const CHECKSUM_SHA256: &str = "checksum_sha256";
    pub const DEPOSITED_BY: &str = "deposited_by";
    pub const DEPOSIT_METHOD: &str = "deposit_method";
    pub const DEPOSITED_ON_BEHALF_OF: &str = "deposited_on_behalf_of";
    pub const PACKAGING_TYPE: &str = "packaging_type";
    pub const PACKAGING_SUBTYPE: &str = "packaging_subtype";
}

/// Payload slot names.
pub mod payload_slot {
    /// Descriptive record in the submission's native schema.
    pub const DESCRIPTIVE: &str = "descriptive";
    /// Normalized record produced by the descriptive crosswalk.
    pub const DESCRIPTIVE_DERIVED: &str = "descriptive_derived";
}

/// Recognized content model (type tag) of a repository node or candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentModel {
    /// Generic folder-like node.
    Container,
    /// Curated collection of works.
    Collection,
    /// Administrative unit at the top of the hierarchy.
    AdminUnit,
    /// Single intellectual work.
    Work,
    /// Work composed of ordered child works.
    AggregateWork,
    /// Leaf object carrying a binary payload.
    File,
    /// Record describing one submission as a unit.
    DepositRecord,
}

impl ContentModel {
    /// Stable string id used in property values and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Collection => "collection",
            Self::AdminUnit => "admin_unit",
            Self::Work => "work",
            Self::AggregateWork => "aggregate_work",
            Self::File => "file",
            Self::DepositRecord => "deposit_record",
        }
    }

    /// Parses one model tag. Unknown tags yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "container" => Some(Self::Container),
            "collection" => Some(Self::Collection),
            "admin_unit" => Some(Self::AdminUnit),
            "work" => Some(Self::Work),
            "aggregate_work" => Some(Self::AggregateWork),
            "file" => Some(Self::File),
            "deposit_record" => Some(Self::DepositRecord),
            _ => None,
        }
    }

    /// Whether a node of this model may hold child nodes.
    pub fn is_container_capable(self) -> bool {
        matches!(
            self,
            Self::Container | Self::Collection | Self::AdminUnit | Self::AggregateWork
        )
    }
}

/// One value of one predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Plain string literal.
    Literal { value: String },
    /// Literal with an explicit datatype, e.g. `xsd:dateTime`.
    Typed { value: String, datatype: String },
    /// Reference to another candidate object.
    Reference { id: ObjectId },
}

impl PropertyValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Typed {
            value: value.into(),
            datatype: datatype.into(),
        }
    }

    pub fn reference(id: ObjectId) -> Self {
        Self::Reference { id }
    }

    /// Returns literal text for plain and typed literals.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal { value } | Self::Typed { value, .. } => Some(value.as_str()),
            Self::Reference { .. } => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Self::Reference { id } => Some(*id),
            _ => None,
        }
    }
}

/// One object being ingested.
///
/// Properties and payload live in one record; there is no second serialized
/// copy to keep in sync. `ObjectGraph::flush` produces the serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateObject {
    id: ObjectId,
    properties: BTreeMap<String, Vec<PropertyValue>>,
    payload: BTreeMap<String, String>,
    dirty: bool,
}

impl CandidateObject {
    /// Creates an empty object with a generated id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            properties: BTreeMap::new(),
            payload: BTreeMap::new(),
            dirty: true,
        }
    }

    /// Creates an empty object with an id assigned upstream.
    pub fn with_id(id: ObjectId) -> GraphResult<Self> {
        if id.is_nil() {
            return Err(GraphError::NilObjectId);
        }
        Ok(Self {
            id,
            ..Self::new()
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn properties(&self) -> &BTreeMap<String, Vec<PropertyValue>> {
        &self.properties
    }

    /// Returns all values of `predicate`, or an empty slice.
    pub fn property(&self, predicate: &str) -> &[PropertyValue] {
        self.properties
            .get(predicate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_property(&self, predicate: &str) -> bool {
        !self.property(predicate).is_empty()
    }

    /// First literal value of `predicate`, trimmed; blank values count as absent.
    pub fn first_literal(&self, predicate: &str) -> Option<&str> {
        self.property(predicate)
            .iter()
            .filter_map(PropertyValue::as_literal)
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    /// Replaces every value of `predicate` with `value`.
    pub fn set_property(&mut self, predicate: impl Into<String>, value: PropertyValue) {
        self.properties.insert(predicate.into(), vec![value]);
        self.dirty = true;
    }

    /// Adds one value to `predicate`. Returns `false` when already present.
    pub fn add_property_value(&mut self, predicate: impl Into<String>, value: PropertyValue) -> bool {
        let values = self.properties.entry(predicate.into()).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        self.dirty = true;
        true
    }

    /// Removes every value of `predicate`, returning what was removed.
    pub fn remove_property(&mut self, predicate: &str) -> Vec<PropertyValue> {
        match self.properties.remove(predicate) {
            Some(values) => {
                self.dirty = true;
                values
            }
            None => Vec::new(),
        }
    }

    pub fn payload(&self, slot: &str) -> Option<&str> {
        self.payload.get(slot).map(String::as_str)
    }

    /// Writes one payload slot, replacing previous content.
    pub fn set_payload(&mut self, slot: impl Into<String>, document: impl Into<String>) {
        self.payload.insert(slot.into(), document.into());
        self.dirty = true;
    }

    /// Recognized content models; unknown `has_model` tags are skipped.
    pub fn content_models(&self) -> Vec<ContentModel> {
        self.property(predicate::HAS_MODEL)
            .iter()
            .filter_map(PropertyValue::as_literal)
            .filter_map(ContentModel::parse)
            .collect()
    }

    pub fn has_model(&self, model: ContentModel) -> bool {
        self.content_models().contains(&model)
    }

    pub fn is_deposit_record(&self) -> bool {
        self.has_model(ContentModel::DepositRecord)
    }

    pub fn slug(&self) -> Option<&str> {
        self.first_literal(predicate::SLUG)
    }

    pub fn label(&self) -> Option<&str> {
        self.first_literal(predicate::LABEL)
    }

    pub fn file_location(&self) -> Option<PathBuf> {
        self.first_literal(predicate::FILE_LOCATION).map(PathBuf::from)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for CandidateObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized snapshot of one object, produced on flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
    pub payload: BTreeMap<String, String>,
    /// Outgoing relationships of this object.
    pub relationships: Vec<Relationship>,
}

impl ObjectRecord {
    pub(crate) fn snapshot(object: &CandidateObject, relationships: Vec<Relationship>) -> Self {
        Self {
            id: object.id,
            properties: object.properties.clone(),
            payload: object.payload.clone(),
            relationships,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Recognized content models recorded in the snapshot.
    pub fn content_models(&self) -> Vec<ContentModel> {
        self.properties
            .get(predicate::HAS_MODEL)
            .into_iter()
            .flatten()
            .filter_map(PropertyValue::as_literal)
            .filter_map(ContentModel::parse)
            .collect()
    }
}
