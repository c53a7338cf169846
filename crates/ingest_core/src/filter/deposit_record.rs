//! Original deposit record filter.
//!
//! # Responsibility
//! - Synthesize one `DepositRecord` object describing the submission as a
//!   unit, stamped from `DepositInfo`.
//! - Link every other object to it with `OriginatesFrom`.
//!
//! # Invariants
//! - At most one deposit record exists per submission; a re-run reuses it.
//! - The record is registered as a scratch object and disappears if the
//!   submission fails.

use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::graph::{GraphError, RelationshipType};
use crate::model::object::{predicate, CandidateObject, ContentModel, ObjectId, PropertyValue};
use crate::model::provenance::{EventType, LinkedAgent, ProvenanceEvent};
use crate::model::submission::{DepositInfo, Submission};
use log::info;

const FILTER_NAME: &str = "set_original_deposit_record";

pub struct SetOriginalDepositRecord;

impl Filter for SetOriginalDepositRecord {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let existing = submission
            .graph
            .objects()
            .find(|object| object.is_deposit_record())
            .map(CandidateObject::id);

        let (record_id, created) = match existing {
            Some(id) => (id, false),
            None => {
                let record = build_record(&submission.deposit);
                let id = submission
                    .graph
                    .insert_object(record)
                    .map_err(|err| graph_failure(None, err))?;
                submission.register_scratch_object(id);
                (id, true)
            }
        };

        let mut linked = 0usize;
        for id in submission.graph.object_ids() {
            if id == record_id {
                continue;
            }
            let added = submission
                .graph
                .add_relationship(id, record_id, RelationshipType::OriginatesFrom)
                .map_err(|err| graph_failure(Some(id), err))?;
            if added {
                linked += 1;
            }
        }

        if created {
            let deposit = &submission.deposit;
            let detail = format!(
                "Created deposit record for {} package deposited by {} via {}",
                deposit.packaging_type, deposit.depositor, deposit.method
            );
            let event = ProvenanceEvent::new(record_id, EventType::Creation, detail)
                .with_agent(ctx.software_agent())
                .with_agent(LinkedAgent::authorizer(deposit.depositor.as_str()));
            submission.provenance.append(event);
        }

        info!(
            "event=filter_run module=filter status=ok filter={} record_id={} created={} linked={}",
            FILTER_NAME, record_id, created, linked
        );
        Ok(())
    }
}

fn build_record(deposit: &DepositInfo) -> CandidateObject {
    let mut record = CandidateObject::new();
    record.set_property(
        predicate::HAS_MODEL,
        PropertyValue::literal(ContentModel::DepositRecord.as_str()),
    );
    record.set_property(predicate::LABEL, PropertyValue::literal(deposit.label.as_str()));
    record.set_property(
        predicate::DEPOSITED_BY,
        PropertyValue::literal(deposit.depositor.as_str()),
    );
    record.set_property(
        predicate::DEPOSIT_METHOD,
        PropertyValue::literal(deposit.method.as_str()),
    );
    if let Some(on_behalf_of) = &deposit.on_behalf_of {
        record.set_property(
            predicate::DEPOSITED_ON_BEHALF_OF,
            PropertyValue::literal(on_behalf_of.as_str()),
        );
    }
    record.set_property(
        predicate::PACKAGING_TYPE,
        PropertyValue::literal(deposit.packaging_type.as_str()),
    );
    if let Some(subtype) = &deposit.packaging_subtype {
        record.set_property(
            predicate::PACKAGING_SUBTYPE,
            PropertyValue::literal(subtype.as_str()),
        );
    }
    record
}

fn graph_failure(object_id: Option<ObjectId>, err: GraphError) -> FilterFailure {
    let violation = match object_id {
        Some(id) => Violation::object(FailureKind::InvalidContainment, id, err.to_string()),
        None => Violation::subject(
            FailureKind::InvalidContainment,
            "deposit_record",
            Vec::new(),
            err.to_string(),
        ),
    };
    FilterFailure::single(FILTER_NAME, violation)
}
