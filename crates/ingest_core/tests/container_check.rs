mod common;

use common::{submission_in, work, Harness, MemoryPathIndex, UNIT};
use ingest_core::filter::container::ContainerCheck;
use ingest_core::{ContainerPlacement, ContentModel, FailureKind, Filter};

#[test]
fn resolves_container_capable_parent() {
    let harness = Harness::new(MemoryPathIndex::new().with_container(UNIT));
    let (mut submission, _) = submission_in(UNIT, vec![work("a"), work("b")]);

    ContainerCheck
        .apply(&mut submission, &mut harness.context())
        .unwrap();
}

#[test]
fn aggregates_every_unresolved_container() {
    let harness = Harness::new(MemoryPathIndex::new().with_container(UNIT));
    let (mut submission, ids) = submission_in(UNIT, vec![work("a"), work("b"), work("c")]);
    submission
        .placements
        .insert(ContainerPlacement::new(ids[1], "/ghost/one", 1));
    submission
        .placements
        .insert(ContainerPlacement::new(ids[2], "/ghost/two/", 2));

    let failure = ContainerCheck
        .apply(&mut submission, &mut harness.context())
        .unwrap_err();

    let unknown = failure.of_kind(FailureKind::UnknownContainer);
    assert_eq!(unknown.len(), 2);
    assert_eq!(failure.object_ids(), vec![ids[1], ids[2]]);
}

#[test]
fn rejects_parent_that_cannot_hold_children() {
    let index = MemoryPathIndex::new().with_node("/unit/file.pdf", &[ContentModel::File]);
    let harness = Harness::new(index);
    let (mut submission, ids) = submission_in("/unit/file.pdf", vec![work("a")]);

    let failure = ContainerCheck
        .apply(&mut submission, &mut harness.context())
        .unwrap_err();

    let invalid = failure.of_kind(FailureKind::InvalidContainerType);
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].object_ids, vec![ids[0]]);
    assert!(invalid[0].message.contains("file"));
}

#[test]
fn each_container_path_is_resolved_once() {
    let harness = Harness::new(MemoryPathIndex::new().with_container(UNIT));
    let (mut submission, _) = submission_in(UNIT, vec![work("a"), work("b"), work("c")]);

    let mut ctx = harness.context();
    ContainerCheck.apply(&mut submission, &mut ctx).unwrap();

    assert_eq!(harness.index.lookups(), 1);
}

#[test]
fn top_level_object_without_placement_is_unknown_container() {
    let harness = Harness::new(MemoryPathIndex::new().with_container(UNIT));
    let (mut submission, _) = submission_in(UNIT, vec![work("a")]);
    let stray = submission.graph.insert_object(work("stray")).unwrap();

    let failure = ContainerCheck
        .apply(&mut submission, &mut harness.context())
        .unwrap_err();

    assert_eq!(failure.object_ids(), vec![stray]);
    assert!(failure.has_kind(FailureKind::UnknownContainer));
}

#[test]
fn unavailable_index_is_a_retryable_collaborator_failure() {
    let mut index = MemoryPathIndex::new().with_container(UNIT);
    index.fail_lookups = true;
    let harness = Harness::new(index);
    let (mut submission, _) = submission_in(UNIT, vec![work("a")]);

    let failure = ContainerCheck
        .apply(&mut submission, &mut harness.context())
        .unwrap_err();

    assert!(failure.has_kind(FailureKind::Collaborator));
    assert!(failure.is_retryable());
}
