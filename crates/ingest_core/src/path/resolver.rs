//! Canonical path resolver.

use crate::model::graph::{GraphError, ObjectGraph};
use crate::model::object::ObjectId;
use crate::model::placement::PlacementIndex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed repository path separator.
pub const PATH_SEPARATOR: char = '/';

pub type PathResult<T> = Result<T, PathError>;

/// Why a canonical path could not be composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    UnknownObject(ObjectId),
    /// Object on the ancestor chain has no slug.
    MissingSlug(ObjectId),
    /// Slug spans more than one path segment.
    InvalidSlug(ObjectId),
    /// Top-level ancestor has no container placement.
    MissingPlacement(ObjectId),
    ContainmentCycle(ObjectId),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObject(id) => write!(f, "object not in graph: {id}"),
            Self::MissingSlug(id) => write!(f, "object has no slug: {id}"),
            Self::InvalidSlug(id) => {
                write!(f, "object slug contains `{PATH_SEPARATOR}`: {id}")
            }
            Self::MissingPlacement(id) => {
                write!(f, "top-level object has no container placement: {id}")
            }
            Self::ContainmentCycle(id) => write!(f, "containment cycle reached from object {id}"),
        }
    }
}

impl Error for PathError {}

impl From<GraphError> for PathError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::ContainmentCycle(id) => Self::ContainmentCycle(id),
            GraphError::UnknownObject(id) => Self::UnknownObject(id),
            GraphError::DuplicateObject(id) | GraphError::SelfRelationship(id) => {
                Self::UnknownObject(id)
            }
            GraphError::NilObjectId => Self::UnknownObject(ObjectId::nil()),
        }
    }
}

/// Computes canonical paths over one graph and its placements.
pub struct PathResolver<'a> {
    graph: &'a ObjectGraph,
    placements: &'a PlacementIndex,
}

impl<'a> PathResolver<'a> {
    pub fn new(graph: &'a ObjectGraph, placements: &'a PlacementIndex) -> Self {
        Self { graph, placements }
    }

    /// Top-level ancestor of `id` (the object itself when it has no parent).
    pub fn top_level_ancestor(&self, id: ObjectId) -> PathResult<ObjectId> {
        let chain = self.graph.ancestor_chain(id)?;
        Ok(*chain.last().unwrap_or(&id))
    }

    /// Container path of the top-level ancestor followed by every slug from
    /// that ancestor down to `id`.
    pub fn canonical_path(&self, id: ObjectId) -> PathResult<String> {
        let chain = self.graph.ancestor_chain(id)?;
        let top = *chain.last().unwrap_or(&id);
        let placement = self
            .placements
            .get(top)
            .ok_or(PathError::MissingPlacement(top))?;

        let mut segments = Vec::with_capacity(chain.len());
        for current in chain.iter().rev() {
            let slug = self
                .graph
                .object(*current)
                .ok_or(PathError::UnknownObject(*current))?
                .slug()
                .ok_or(PathError::MissingSlug(*current))?;
            if !is_single_segment(slug) {
                return Err(PathError::InvalidSlug(*current));
            }
            segments.push(slug);
        }
        Ok(join_container_path(
            placement.parent_container_path.as_str(),
            &segments,
        ))
    }
}

/// Appends `segments` to `container`, stripping trailing separators first.
pub fn join_container_path(container: &str, segments: &[&str]) -> String {
    let mut path = container.trim_end_matches(PATH_SEPARATOR).to_string();
    for segment in segments {
        path.push(PATH_SEPARATOR);
        path.push_str(segment);
    }
    path
}

/// Whether `slug` can stand as exactly one path segment.
pub fn is_single_segment(slug: &str) -> bool {
    !slug.is_empty() && !slug.contains(PATH_SEPARATOR)
}

/// Last segment of `path`.
pub fn final_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// Replaces the last segment of `path` with `segment`.
pub fn replace_final_segment(path: &str, segment: &str) -> String {
    match path.rfind(PATH_SEPARATOR) {
        Some(index) => format!("{}{}", &path[..=index], segment),
        None => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{final_segment, is_single_segment, join_container_path, replace_final_segment};

    #[test]
    fn join_strips_trailing_separators() {
        assert_eq!(join_container_path("/unit/", &["report"]), "/unit/report");
        assert_eq!(join_container_path("/unit//", &["a", "b"]), "/unit/a/b");
        assert_eq!(join_container_path("/", &["top"]), "/top");
        assert_eq!(join_container_path("/unit", &[]), "/unit");
    }

    #[test]
    fn final_segment_helpers() {
        assert_eq!(final_segment("/unit/report"), "report");
        assert_eq!(final_segment("report"), "report");
        assert_eq!(replace_final_segment("/unit/report", "report-1"), "/unit/report-1");
        assert_eq!(replace_final_segment("report", "report-1"), "report-1");
    }

    #[test]
    fn slugs_with_separators_are_not_single_segments() {
        assert!(is_single_segment("report-1"));
        assert!(!is_single_segment("a/b"));
        assert!(!is_single_segment("/"));
        assert!(!is_single_segment(""));
    }
}
