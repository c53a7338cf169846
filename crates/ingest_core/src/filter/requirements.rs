//! Requirements check filter.
//!
//! # Responsibility
//! - Verify every candidate has a recognized type, an owner and a
//!   single-segment slug.
//! - Verify `Contains` edges form a forest.
//! - Stamp the preserved marker on every object once all checks pass.
//!
//! # Invariants
//! - All violations of one pass are reported together.
//! - Re-running on an already stamped graph mutates nothing and appends no
//!   events.

use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::graph::ContainmentProblem;
use crate::model::object::{predicate, CandidateObject, PropertyValue};
use crate::model::provenance::{EventType, ProvenanceEvent};
use crate::model::submission::Submission;
use crate::path::resolver::{is_single_segment, PATH_SEPARATOR};
use log::info;

const FILTER_NAME: &str = "requirements_check";
const PRESERVED_VALUE: &str = "true";

pub struct RequirementsCheck;

impl Filter for RequirementsCheck {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let graph = &submission.graph;
        let mut violations = Vec::new();

        for containment in graph.containment_violations() {
            let message = match containment.problem {
                ContainmentProblem::MultipleParents(count) => {
                    format!("object has {count} containing parents; expected at most one")
                }
                ContainmentProblem::Cycle => "object is part of a containment cycle".to_string(),
            };
            violations.push(Violation::object(
                FailureKind::InvalidContainment,
                containment.object_id,
                message,
            ));
        }

        for object in graph.objects().filter(|object| !object.is_deposit_record()) {
            violations.extend(check_object(object));
        }

        FilterFailure::from_violations(FILTER_NAME, violations)?;

        let agent = ctx.software_agent();
        let mut stamped = 0usize;
        for id in submission.graph.object_ids() {
            let Some(object) = submission.graph.object_mut(id) else {
                continue;
            };
            if object.is_deposit_record() || object.has_property(predicate::PRESERVED) {
                continue;
            }
            object.set_property(predicate::PRESERVED, PropertyValue::literal(PRESERVED_VALUE));
            submission.provenance.append(
                ProvenanceEvent::new(
                    id,
                    EventType::Validation,
                    "Object satisfied ingest requirements (type, owner, slug)",
                )
                .with_agent(agent.clone()),
            );
            stamped += 1;
        }

        info!(
            "event=filter_run module=filter status=ok filter={} objects={} stamped={}",
            FILTER_NAME,
            submission.graph.len(),
            stamped
        );
        Ok(())
    }
}

fn check_object(object: &CandidateObject) -> Vec<Violation> {
    let id = object.id();
    let mut violations = Vec::new();

    if object.content_models().is_empty() {
        let declared: Vec<&str> = object
            .property(predicate::HAS_MODEL)
            .iter()
            .filter_map(PropertyValue::as_literal)
            .collect();
        let message = if declared.is_empty() {
            "object has no type".to_string()
        } else {
            format!("object has no recognized type (declared: {})", declared.join(", "))
        };
        violations.push(Violation::object(FailureKind::MissingType, id, message));
    }

    if !has_owner(object) {
        violations.push(Violation::object(
            FailureKind::MissingOwner,
            id,
            "object has no owner",
        ));
    }

    match object.slug() {
        None => violations.push(Violation::object(
            FailureKind::MissingSlug,
            id,
            "object has no slug",
        )),
        Some(slug) if !is_single_segment(slug) => violations.push(Violation::object(
            FailureKind::InvalidSlug,
            id,
            format!("slug `{slug}` must be a single path segment without `{PATH_SEPARATOR}`"),
        )),
        Some(_) => {}
    }

    violations
}

/// A reference owner, or a literal owner that is not blank.
fn has_owner(object: &CandidateObject) -> bool {
    object
        .property(predicate::OWNER)
        .iter()
        .any(|value| value.as_literal().map_or(true, |owner| !owner.trim().is_empty()))
}
