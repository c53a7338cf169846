//! Lenient path conflict fix.
//!
//! # Responsibility
//! - Rename top-level slugs whose canonical path is already live in the
//!   repository or was claimed earlier in this run.
//! - Record every rename as a `MetadataModification` event.
//!
//! # Invariants
//! - Top-level objects are processed in submission order, so the same graph
//!   and repository state always produce the same slugs.
//! - Nested objects are never renamed; their paths follow the renamed
//!   ancestor because paths are computed, not stored.
//! - Increments per object are bounded by `max_rename_attempts`.

use crate::filter::path_check::path_error_violation;
use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::object::{predicate, ObjectId, PropertyValue};
use crate::model::provenance::{EventType, ProvenanceEvent};
use crate::model::submission::Submission;
use crate::path::increment::increment_segment;
use crate::path::resolver::{final_segment, replace_final_segment, PathResolver};
use log::{debug, info};
use std::collections::HashMap;

const FILTER_NAME: &str = "path_conflict_fix";

pub struct PathConflictFix;

/// One planned slug rewrite.
struct Rename {
    object_id: ObjectId,
    old_slug: String,
    new_slug: String,
    old_path: String,
    new_path: String,
}

impl Filter for PathConflictFix {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let max_attempts = ctx.config.max_rename_attempts;
        let mut violations = Vec::new();
        let mut renames = Vec::new();
        let mut claimed: HashMap<String, ObjectId> = HashMap::new();

        {
            let resolver = PathResolver::new(&submission.graph, &submission.placements);
            for placement in submission.placements.in_submission_order() {
                let id = placement.top_object_id;
                if !submission.graph.contains(id) {
                    continue;
                }
                let original = match resolver.canonical_path(id) {
                    Ok(path) => path,
                    Err(err) => {
                        violations.push(path_error_violation(id, &err));
                        continue;
                    }
                };

                let mut candidate = original.clone();
                let mut attempts = 0u32;
                let resolved = loop {
                    let claimed_by_other = claimed.get(&candidate).is_some_and(|owner| *owner != id);
                    let live = if claimed_by_other {
                        false
                    } else {
                        match ctx.path_index.exists(&candidate) {
                            Ok(live) => live,
                            Err(err) => {
                                violations.push(Violation::subject(
                                    FailureKind::Collaborator,
                                    candidate.as_str(),
                                    vec![id],
                                    err.to_string(),
                                ));
                                break None;
                            }
                        }
                    };
                    if !claimed_by_other && !live {
                        break Some(candidate);
                    }
                    if attempts >= max_attempts {
                        violations.push(Violation::subject(
                            FailureKind::RenameExhausted,
                            original.as_str(),
                            vec![id],
                            format!("no free path found for `{original}` after {attempts} renames"),
                        ));
                        break None;
                    }
                    attempts += 1;
                    let next = increment_segment(final_segment(&candidate));
                    debug!(
                        "event=slug_increment module=filter status=ok filter={} attempt={}",
                        FILTER_NAME, attempts
                    );
                    candidate = replace_final_segment(&candidate, &next);
                };

                let Some(resolved) = resolved else {
                    continue;
                };
                claimed.insert(resolved.clone(), id);
                if resolved != original {
                    renames.push(Rename {
                        object_id: id,
                        old_slug: final_segment(&original).to_string(),
                        new_slug: final_segment(&resolved).to_string(),
                        old_path: original,
                        new_path: resolved,
                    });
                }
            }
        }

        FilterFailure::from_violations(FILTER_NAME, violations)?;

        let agent = ctx.software_agent();
        let renamed = renames.len();
        for rename in renames {
            submission
                .graph
                .set_property(
                    rename.object_id,
                    predicate::SLUG,
                    PropertyValue::literal(rename.new_slug.as_str()),
                )
                .map_err(|err| {
                    FilterFailure::single(
                        FILTER_NAME,
                        Violation::object(
                            FailureKind::InvalidContainment,
                            rename.object_id,
                            err.to_string(),
                        ),
                    )
                })?;
            submission.provenance.append(
                ProvenanceEvent::new(
                    rename.object_id,
                    EventType::MetadataModification,
                    format!(
                        "Renamed slug `{}` to `{}` because path `{}` was already in use; new path is `{}`",
                        rename.old_slug, rename.new_slug, rename.old_path, rename.new_path
                    ),
                )
                .with_agent(agent.clone()),
            );
        }

        info!(
            "event=filter_run module=filter status=ok filter={} top_level={} renamed={}",
            FILTER_NAME,
            submission.placements.len(),
            renamed
        );
        Ok(())
    }
}
