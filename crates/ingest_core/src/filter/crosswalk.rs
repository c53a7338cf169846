//! Descriptive crosswalk filter.
//!
//! # Responsibility
//! - Derive a normalized descriptive record for every candidate.
//! - Fall back to a stub record built from the label when the native record
//!   is absent or the transform rejects it.
//!
//! # Invariants
//! - Never fails the pipeline; transform errors are recorded as failed
//!   `Normalization` events and recovered locally.

use crate::filter::{Filter, FilterContext, FilterResult};
use crate::model::object::{payload_slot, ObjectId};
use crate::model::provenance::{EventOutcome, EventType, ProvenanceEvent};
use crate::model::submission::Submission;
use log::{info, warn};
use quick_xml::escape::escape;

const FILTER_NAME: &str = "descriptive_crosswalk";
const UNTITLED: &str = "Untitled";

pub struct DescriptiveCrosswalkFilter;

impl Filter for DescriptiveCrosswalkFilter {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let agent = ctx.software_agent();
        let source = ctx.crosswalk.source_format().to_string();
        let target = ctx.crosswalk.target_format().to_string();
        let mut transformed = 0usize;
        let mut stubbed = 0usize;

        for id in submission.graph.object_ids() {
            let Some(object) = submission.graph.object(id) else {
                continue;
            };
            if object.is_deposit_record() {
                continue;
            }
            let native = object.payload(payload_slot::DESCRIPTIVE).map(str::to_string);
            let title = object
                .label()
                .or_else(|| object.slug())
                .unwrap_or(UNTITLED)
                .to_string();

            let (derived, event) = match native {
                Some(native) => match ctx.crosswalk.transform(&native) {
                    Ok(derived) => {
                        transformed += 1;
                        let event = ProvenanceEvent::new(
                            id,
                            EventType::Normalization,
                            format!("Transformed descriptive metadata from {source} to {target}"),
                        );
                        (derived, event)
                    }
                    Err(err) => {
                        warn!(
                            "event=crosswalk_transform module=filter status=error object_id={} error={}",
                            id, err
                        );
                        stubbed += 1;
                        let event = ProvenanceEvent::new(
                            id,
                            EventType::Normalization,
                            format!(
                                "Could not transform descriptive metadata from {source} to {target}; substituted stub {target} record"
                            ),
                        )
                        .with_outcome(EventOutcome::failure(err.message));
                        (stub_record(&title), event)
                    }
                },
                None => {
                    stubbed += 1;
                    let event = ProvenanceEvent::new(
                        id,
                        EventType::Normalization,
                        format!("Generated stub {target} record from object label"),
                    );
                    (stub_record(&title), event)
                }
            };

            attach_derived(submission, id, derived);
            submission.provenance.append(event.with_agent(agent.clone()));
        }

        info!(
            "event=filter_run module=filter status=ok filter={} transformed={} stubbed={}",
            FILTER_NAME, transformed, stubbed
        );
        Ok(())
    }
}

fn attach_derived(submission: &mut Submission, id: ObjectId, derived: String) {
    if let Some(object) = submission.graph.object_mut(id) {
        object.set_payload(payload_slot::DESCRIPTIVE_DERIVED, derived);
    }
}

/// Minimal descriptive record carrying only a title.
pub fn stub_record(title: &str) -> String {
    format!(
        "<description><title>{}</title></description>",
        escape(title)
    )
}
