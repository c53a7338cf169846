//! Strict path conflict check.
//!
//! # Responsibility
//! - Compute every candidate's canonical path.
//! - Reject paths shared by two candidates or already live in the repository.
//!
//! # Invariants
//! - Performs no mutation of the submission.
//! - Every colliding path is reported in one failure.

use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::object::ObjectId;
use crate::model::submission::Submission;
use crate::path::resolver::{PathError, PathResolver};
use log::info;
use std::collections::BTreeMap;

const FILTER_NAME: &str = "path_conflict_check";

pub struct PathConflictCheck;

impl Filter for PathConflictCheck {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let resolver = PathResolver::new(&submission.graph, &submission.placements);
        let mut violations = Vec::new();
        let mut claimed: BTreeMap<String, Vec<ObjectId>> = BTreeMap::new();

        for object in submission
            .graph
            .objects()
            .filter(|object| !object.is_deposit_record())
        {
            match resolver.canonical_path(object.id()) {
                Ok(path) => claimed.entry(path).or_default().push(object.id()),
                Err(err) => violations.push(path_error_violation(object.id(), &err)),
            }
        }

        for (path, ids) in &claimed {
            if ids.len() > 1 {
                violations.push(Violation::subject(
                    FailureKind::DuplicatePath,
                    path.as_str(),
                    ids.clone(),
                    format!("{} objects in this submission resolve to `{path}`", ids.len()),
                ));
            }
        }

        for (path, ids) in &claimed {
            match ctx.path_index.exists(path) {
                Ok(false) => {}
                Ok(true) => violations.push(Violation::subject(
                    FailureKind::PathCollision,
                    path.as_str(),
                    ids.clone(),
                    format!("`{path}` already exists in the repository"),
                )),
                Err(err) => violations.push(Violation::subject(
                    FailureKind::Collaborator,
                    path.as_str(),
                    ids.clone(),
                    err.to_string(),
                )),
            }
        }

        FilterFailure::from_violations(FILTER_NAME, violations)?;
        info!(
            "event=filter_run module=filter status=ok filter={} paths={}",
            FILTER_NAME,
            claimed.len()
        );
        Ok(())
    }
}

/// Maps a path composition error to the violation reported for `object_id`.
pub(crate) fn path_error_violation(object_id: ObjectId, err: &PathError) -> Violation {
    match err {
        PathError::MissingSlug(missing) => Violation::object(
            FailureKind::MissingSlug,
            object_id,
            format!("path cannot be composed: ancestor {missing} has no slug"),
        ),
        PathError::InvalidSlug(offending) => Violation::object(
            FailureKind::InvalidSlug,
            object_id,
            format!("path cannot be composed: slug of {offending} is not a single path segment"),
        ),
        PathError::MissingPlacement(top) => Violation::object(
            FailureKind::UnknownContainer,
            object_id,
            format!("path cannot be composed: top-level object {top} has no container placement"),
        ),
        PathError::ContainmentCycle(_) => Violation::object(
            FailureKind::InvalidContainment,
            object_id,
            "path cannot be composed: containment cycle",
        ),
        PathError::UnknownObject(missing) => Violation::object(
            FailureKind::InvalidContainment,
            object_id,
            format!("path cannot be composed: object {missing} is not in the graph"),
        ),
    }
}
