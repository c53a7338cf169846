//! Identifier assignment audit step.
//!
//! Records on every object that its persistent identifier was assigned
//! upstream. Performs no validation.

use crate::filter::{Filter, FilterContext, FilterResult};
use crate::model::provenance::{EventType, ProvenanceEvent};
use crate::model::submission::Submission;
use log::info;

const FILTER_NAME: &str = "log_identifier_assignment";

pub struct LogIdentifierAssignment;

impl Filter for LogIdentifierAssignment {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let agent = ctx.software_agent();
        let ids = submission.graph.object_ids();
        for id in &ids {
            submission.provenance.append(
                ProvenanceEvent::new(
                    *id,
                    EventType::Normalization,
                    format!("Assigned persistent identifier {id}"),
                )
                .with_agent(agent.clone()),
            );
        }
        info!(
            "event=filter_run module=filter status=ok filter={} objects={}",
            FILTER_NAME,
            ids.len()
        );
        Ok(())
    }
}
