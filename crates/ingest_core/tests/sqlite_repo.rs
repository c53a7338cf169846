use ingest_core::db::open_db_in_memory;
use ingest_core::{
    predicate, CandidateObject, CommitPackage, CommitSink, CommittedObject, ContentModel, EventType,
    ExternalPathIndex, ObjectGraph, PropertyValue, ProvenanceEvent, ProvenanceLog, RepoError,
    SqliteCommitSink, SqlitePathIndex,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn adapters_reject_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    assert!(matches!(
        SqlitePathIndex::try_new(&conn),
        Err(RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        })
    ));
    assert!(SqliteCommitSink::try_new(&conn).is_err());
}

#[test]
fn path_index_normalizes_trailing_separator() {
    let conn = open_db_in_memory().unwrap();
    let index = SqlitePathIndex::try_new(&conn).unwrap();
    let handle = index
        .register_node("/unit/", &[ContentModel::AdminUnit, ContentModel::Collection])
        .unwrap();
    assert_eq!(handle.path, "/unit");

    let found = index.lookup("/unit").unwrap().unwrap();
    assert_eq!(found, handle);
    assert_eq!(index.lookup("/unit/").unwrap(), Some(handle.clone()));
    assert!(index.lookup("/elsewhere").unwrap().is_none());

    let models = index.list_content_models(&handle).unwrap();
    assert!(models.contains(&ContentModel::AdminUnit));
    assert!(models.contains(&ContentModel::Collection));
}

#[test]
fn duplicate_node_path_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let index = SqlitePathIndex::try_new(&conn).unwrap();
    index.register_node("/unit", &[ContentModel::AdminUnit]).unwrap();
    assert!(matches!(
        index.register_node("/unit", &[ContentModel::Container]),
        Err(RepoError::Db(_))
    ));
}

#[test]
fn commit_sink_persists_records_and_events() {
    let conn = open_db_in_memory().unwrap();
    let sink = SqliteCommitSink::try_new(&conn).unwrap();

    let mut object = CandidateObject::new();
    object.set_property(
        predicate::HAS_MODEL,
        PropertyValue::literal(ContentModel::Work.as_str()),
    );
    object.set_property(predicate::SLUG, PropertyValue::literal("minutes"));
    let mut graph = ObjectGraph::new();
    let id = graph.insert_object(object).unwrap();
    let record = graph.flush().remove(0);

    let mut log = ProvenanceLog::new();
    log.append(ProvenanceEvent::new(id, EventType::Validation, "ok"));
    log.append(ProvenanceEvent::new(id, EventType::Ingestion, "stored"));

    let package = CommitPackage {
        submission_id: Uuid::new_v4(),
        objects: vec![CommittedObject {
            record: record.clone(),
            canonical_path: Some("/unit/minutes".to_string()),
        }],
        events: log.backlog(),
    };
    sink.commit(&package).unwrap();

    assert_eq!(sink.count_objects().unwrap(), 1);
    assert_eq!(sink.object_record(id).unwrap(), Some(record));
    let events = sink.events_for(id).unwrap();
    let types: Vec<&str> = events.iter().map(|event| event.event_type.as_str()).collect();
    assert_eq!(types, vec!["validation", "ingestion"]);
    assert_eq!(events[0].submission_id, package.submission_id);

    let index = SqlitePathIndex::try_new(&conn).unwrap();
    let node = index.lookup("/unit/minutes").unwrap().unwrap();
    assert_eq!(node.node_id, id.to_string());
    assert!(index
        .list_content_models(&node)
        .unwrap()
        .contains(&ContentModel::Work));
}
