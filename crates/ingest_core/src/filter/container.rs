//! Container check filter.
//!
//! # Responsibility
//! - Resolve every placement's parent container in the live repository.
//! - Reject containers whose node type cannot hold children.
//!
//! # Invariants
//! - Every unresolved or invalid container is reported in one failure.
//! - Each distinct container path is resolved once per run.

use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::object::ObjectId;
use crate::model::submission::Submission;
use log::info;

const FILTER_NAME: &str = "container_check";

pub struct ContainerCheck;

impl Filter for ContainerCheck {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let mut violations = Vec::new();

        for id in submission.graph.top_level_objects() {
            let is_deposit_record = submission
                .graph
                .object(id)
                .is_some_and(|object| object.is_deposit_record());
            if !is_deposit_record && submission.placements.get(id).is_none() {
                violations.push(Violation::object(
                    FailureKind::UnknownContainer,
                    id,
                    "top-level object has no container placement",
                ));
            }
        }

        for path in submission.placements.container_paths() {
            let placed: Vec<ObjectId> = submission
                .placements
                .in_submission_order()
                .into_iter()
                .filter(|placement| placement.parent_container_path == path)
                .map(|placement| placement.top_object_id)
                .collect();

            let handle = match ctx.path_index.lookup(path) {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    violations.push(Violation::subject(
                        FailureKind::UnknownContainer,
                        path,
                        placed,
                        format!("container `{path}` does not exist in the repository"),
                    ));
                    continue;
                }
                Err(err) => {
                    violations.push(Violation::subject(
                        FailureKind::Collaborator,
                        path,
                        placed,
                        err.to_string(),
                    ));
                    continue;
                }
            };

            match ctx.path_index.content_models(&handle) {
                Ok(models) if models.iter().any(|model| model.is_container_capable()) => {}
                Ok(models) => {
                    let found: Vec<&str> = models.iter().map(|model| model.as_str()).collect();
                    violations.push(Violation::subject(
                        FailureKind::InvalidContainerType,
                        path,
                        placed,
                        format!(
                            "node `{path}` cannot hold children (types: {})",
                            describe_models(&found)
                        ),
                    ));
                }
                Err(err) => violations.push(Violation::subject(
                    FailureKind::Collaborator,
                    path,
                    placed,
                    err.to_string(),
                )),
            }
        }

        FilterFailure::from_violations(FILTER_NAME, violations)?;
        info!(
            "event=filter_run module=filter status=ok filter={} containers={}",
            FILTER_NAME,
            submission.placements.container_paths().len()
        );
        Ok(())
    }
}

fn describe_models(found: &[&str]) -> String {
    if found.is_empty() {
        return "none".to_string();
    }
    found.join(", ")
}
