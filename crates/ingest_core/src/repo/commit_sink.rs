//! SQLite-backed commit sink.
//!
//! # Responsibility
//! - Persist a finished package in one immediate transaction: provenance
//!   events, object records, relationships and the repository nodes that
//!   make committed paths visible to later submissions.
//! - Read committed data back for audit.
//!
//! # Invariants
//! - Either the whole package is visible afterwards or none of it is.
//! - Events are written first so a failing object insert also discards them.

use crate::external::{CollaboratorError, CommitPackage, CommitSink};
use crate::model::object::{ObjectId, ObjectRecord};
use crate::model::provenance::ProvenanceEvent;
use crate::repo::path_index::insert_content_models;
use crate::repo::{
    collaborator_error, ensure_connection_ready, normalize_path, RepoError, RepoResult,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

const COLLABORATOR: &str = "sqlite_commit_sink";
const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("repository_nodes", &["node_id", "path"]),
    ("node_content_models", &["node_id", "content_model"]),
    (
        "ingested_objects",
        &["object_id", "submission_id", "canonical_path", "record_json"],
    ),
    ("object_relationships", &["from_id", "to_id", "kind"]),
    (
        "provenance_events",
        &[
            "event_id",
            "submission_id",
            "sequence",
            "target_id",
            "event_type",
            "detail",
            "outcome",
            "outcome_detail",
            "agents_json",
            "occurred_at",
        ],
    ),
];

/// Provenance event as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub submission_id: Uuid,
    pub sequence: i64,
    pub target_id: ObjectId,
    pub event_type: String,
    pub detail: String,
    pub outcome: String,
}

pub struct SqliteCommitSink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommitSink<'conn> {
    /// Creates the sink from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    pub fn count_objects(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM ingested_objects;")
    }

    pub fn count_events(&self) -> RepoResult<u64> {
        count_rows(self.conn, "SELECT COUNT(*) FROM provenance_events;")
    }

    /// Committed record of one object.
    pub fn object_record(&self, object_id: ObjectId) -> RepoResult<Option<ObjectRecord>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM ingested_objects WHERE object_id = ?1;",
                [object_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(RepoError::from))
            .transpose()
    }

    /// Committed canonical path of one object, if it has one.
    pub fn canonical_path(&self, object_id: ObjectId) -> RepoResult<Option<String>> {
        let path: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT canonical_path FROM ingested_objects WHERE object_id = ?1;",
                [object_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.flatten())
    }

    /// Events of one object ordered by sequence.
    pub fn events_for(&self, target_id: ObjectId) -> RepoResult<Vec<StoredEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, submission_id, sequence, target_id, event_type, detail, outcome
             FROM provenance_events
             WHERE target_id = ?1
             ORDER BY sequence ASC;",
        )?;
        let rows = stmt
            .query_map([target_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(event_id, submission_id, sequence, target, event_type, detail, outcome)| {
                    Ok(StoredEvent {
                        event_id: parse_uuid(&event_id, "provenance_events.event_id")?,
                        submission_id: parse_uuid(&submission_id, "provenance_events.submission_id")?,
                        sequence,
                        target_id: parse_uuid(&target, "provenance_events.target_id")?,
                        event_type,
                        detail,
                        outcome,
                    })
                },
            )
            .collect()
    }

    fn write_package(&self, package: &CommitPackage) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let submission_id = package.submission_id.to_string();

        for event in &package.events {
            insert_event(&tx, &submission_id, event)?;
        }
        for object in &package.objects {
            tx.execute(
                "INSERT INTO ingested_objects (object_id, submission_id, canonical_path, record_json)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    object.record.id.to_string(),
                    submission_id,
                    object.canonical_path.as_deref().map(normalize_path),
                    object.record.to_json()?,
                ],
            )?;
        }
        for object in &package.objects {
            for edge in &object.record.relationships {
                tx.execute(
                    "INSERT OR IGNORE INTO object_relationships (from_id, to_id, kind)
                     VALUES (?1, ?2, ?3);",
                    params![edge.from.to_string(), edge.to.to_string(), edge.kind.as_str()],
                )?;
            }
        }
        for object in &package.objects {
            let Some(path) = object.canonical_path.as_deref() else {
                continue;
            };
            let node_id = object.record.id.to_string();
            tx.execute(
                "INSERT INTO repository_nodes (node_id, path) VALUES (?1, ?2);",
                params![node_id, normalize_path(path)],
            )?;
            insert_content_models(&tx, &node_id, &object.record.content_models())?;
        }

        tx.commit()?;
        Ok(())
    }
}

impl CommitSink for SqliteCommitSink<'_> {
    fn commit(&self, package: &CommitPackage) -> Result<(), CollaboratorError> {
        match self.write_package(package) {
            Ok(()) => {
                info!(
                    "event=package_commit module=repo status=ok submission_id={} objects={} events={}",
                    package.submission_id,
                    package.objects.len(),
                    package.events.len()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=package_commit module=repo status=error submission_id={} error={}",
                    package.submission_id, err
                );
                Err(collaborator_error(COLLABORATOR, err))
            }
        }
    }
}

fn insert_event(conn: &Connection, submission_id: &str, event: &ProvenanceEvent) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO provenance_events (
            event_id, submission_id, sequence, target_id, event_type, detail,
            outcome, outcome_detail, agents_json, occurred_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            event.event_id.to_string(),
            submission_id,
            i64::try_from(event.sequence).unwrap_or(i64::MAX),
            event.target_id.to_string(),
            event.event_type.as_str(),
            event.detail,
            event.outcome.status.as_str(),
            event.outcome.detail,
            serde_json::to_string(&event.agents)?,
            event.occurred_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn count_rows(conn: &Connection, sql: &str) -> RepoResult<u64> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
