mod common;

use common::{submission_in, work, UNIT};
use ingest_core::path::resolver::{PathError, PathResolver};
use ingest_core::{
    predicate, CandidateObject, ContainerPlacement, GraphError, ObjectGraph, PlacementIndex,
    PropertyValue, RelationshipType,
};

fn nested_graph() -> (ObjectGraph, PlacementIndex, [ingest_core::ObjectId; 3]) {
    let mut graph = ObjectGraph::new();
    let top = graph.insert_object(work("top")).unwrap();
    let middle = graph.insert_object(work("middle")).unwrap();
    let leaf = graph.insert_object(work("leaf")).unwrap();
    graph
        .add_relationship(top, middle, RelationshipType::Contains)
        .unwrap();
    graph
        .add_relationship(middle, leaf, RelationshipType::Contains)
        .unwrap();
    let mut placements = PlacementIndex::new();
    placements.insert(ContainerPlacement::new(top, "/unit/", 0));
    (graph, placements, [top, middle, leaf])
}

#[test]
fn property_round_trip_through_graph() {
    let mut graph = ObjectGraph::new();
    let id = graph.insert_object(CandidateObject::new()).unwrap();

    graph
        .set_property(id, predicate::LABEL, PropertyValue::literal("Minutes"))
        .unwrap();
    assert_eq!(
        graph.get_property(id, predicate::LABEL).unwrap()[0].as_literal(),
        Some("Minutes")
    );

    let removed = graph.remove_property(id, predicate::LABEL).unwrap();
    assert_eq!(removed.len(), 1);
    assert!(graph.get_property(id, predicate::LABEL).unwrap().is_empty());
}

#[test]
fn unknown_object_is_an_error_for_property_access() {
    let graph = ObjectGraph::new();
    let missing = uuid::Uuid::new_v4();
    assert_eq!(
        graph.get_property(missing, predicate::SLUG).unwrap_err(),
        GraphError::UnknownObject(missing)
    );
}

#[test]
fn children_of_leaf_is_empty_not_error() {
    let (graph, _, [top, middle, leaf]) = nested_graph();
    assert_eq!(graph.children(top, RelationshipType::Contains), vec![middle]);
    assert!(graph.children(leaf, RelationshipType::Contains).is_empty());
    assert!(graph
        .children(uuid::Uuid::new_v4(), RelationshipType::Contains)
        .is_empty());
}

#[test]
fn ancestor_chain_ends_at_top_level_object() {
    let (graph, _, [top, middle, leaf]) = nested_graph();
    assert_eq!(graph.ancestor_chain(leaf).unwrap(), vec![leaf, middle, top]);
    assert_eq!(graph.ancestor_chain(top).unwrap(), vec![top]);
    assert_eq!(graph.top_level_objects(), vec![top]);
}

#[test]
fn canonical_path_joins_container_and_slugs_root_to_leaf() {
    let (graph, placements, [top, _, leaf]) = nested_graph();
    let resolver = PathResolver::new(&graph, &placements);

    assert_eq!(resolver.canonical_path(top).unwrap(), "/unit/top");
    assert_eq!(resolver.canonical_path(leaf).unwrap(), "/unit/top/middle/leaf");
    assert_eq!(resolver.top_level_ancestor(leaf).unwrap(), top);
}

#[test]
fn canonical_path_fails_when_an_ancestor_lacks_a_slug() {
    let (mut graph, placements, [_, middle, leaf]) = nested_graph();
    graph.remove_property(middle, predicate::SLUG).unwrap();
    let resolver = PathResolver::new(&graph, &placements);

    assert_eq!(
        resolver.canonical_path(leaf).unwrap_err(),
        PathError::MissingSlug(middle)
    );
}

#[test]
fn relationship_types_between_same_pair_coexist() {
    let (mut graph, _, [top, middle, _]) = nested_graph();
    assert!(graph
        .add_relationship(top, middle, RelationshipType::Precedes)
        .unwrap());
    assert!(!graph
        .add_relationship(top, middle, RelationshipType::Contains)
        .unwrap());
    assert!(graph
        .remove_relationship(top, middle, RelationshipType::Precedes)
        .unwrap());
    assert_eq!(graph.children(top, RelationshipType::Contains), vec![middle]);
}

#[test]
fn flush_serializes_dirty_objects_once() {
    let (mut submission, ids) = submission_in(UNIT, vec![work("a"), work("b")]);
    let graph = &mut submission.graph;

    let first = graph.flush();
    assert_eq!(first.len(), 2);
    assert!(graph.dirty_ids().is_empty());
    assert!(graph.flush().is_empty());

    graph
        .set_property(ids[1], predicate::LABEL, PropertyValue::literal("Renamed"))
        .unwrap();
    let second = graph.flush();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, ids[1]);

    let json = second[0].to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["properties"]["label"][0]["value"], "Renamed");
}

#[test]
fn containment_violations_report_shared_children() {
    let mut graph = ObjectGraph::new();
    let left = graph.insert_object(work("left")).unwrap();
    let right = graph.insert_object(work("right")).unwrap();
    let shared = graph.insert_object(work("shared")).unwrap();
    graph
        .add_relationship(left, shared, RelationshipType::Contains)
        .unwrap();
    graph
        .add_relationship(right, shared, RelationshipType::Contains)
        .unwrap();

    let violations = graph.containment_violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].object_id, shared);
}
