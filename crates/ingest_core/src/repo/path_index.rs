//! SQLite-backed repository path index.
//!
//! # Responsibility
//! - Answer path lookups and content-model queries against
//!   `repository_nodes` / `node_content_models`.
//! - Register nodes for fixtures and for containers created outside ingest.
//!
//! # Invariants
//! - Paths are stored without a trailing separator; lookups normalize the
//!   same way.
//! - Unknown content model tags in storage are skipped, not fatal.

use crate::external::{CollaboratorError, ContainerHandle, ExternalPathIndex};
use crate::model::object::ContentModel;
use crate::repo::{collaborator_error, ensure_connection_ready, normalize_path, RepoResult};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use uuid::Uuid;

const COLLABORATOR: &str = "sqlite_path_index";
const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("repository_nodes", &["node_id", "path"]),
    ("node_content_models", &["node_id", "content_model"]),
];

pub struct SqlitePathIndex<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePathIndex<'conn> {
    /// Creates the index from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    /// Registers one node at `path` with its content models.
    pub fn register_node(
        &self,
        path: &str,
        models: &[ContentModel],
    ) -> RepoResult<ContainerHandle> {
        let path = normalize_path(path);
        let node_id = Uuid::new_v4().to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO repository_nodes (node_id, path) VALUES (?1, ?2);",
            params![node_id, path],
        )?;
        insert_content_models(&tx, &node_id, models)?;
        tx.commit()?;

        debug!(
            "event=node_register module=repo status=ok node_id={} models={}",
            node_id,
            models.len()
        );
        Ok(ContainerHandle {
            node_id,
            path: path.to_string(),
        })
    }

    fn find_node(&self, path: &str) -> RepoResult<Option<ContainerHandle>> {
        let path = normalize_path(path);
        let node_id: Option<String> = self
            .conn
            .query_row(
                "SELECT node_id FROM repository_nodes WHERE path = ?1;",
                [path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(node_id.map(|node_id| ContainerHandle {
            node_id,
            path: path.to_string(),
        }))
    }

    fn node_models(&self, node_id: &str) -> RepoResult<BTreeSet<ContentModel>> {
        let mut stmt = self.conn.prepare(
            "SELECT content_model FROM node_content_models WHERE node_id = ?1
             ORDER BY content_model ASC;",
        )?;
        let tags = stmt
            .query_map([node_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut models = BTreeSet::new();
        for tag in tags {
            match ContentModel::parse(&tag) {
                Some(model) => {
                    models.insert(model);
                }
                None => warn!(
                    "event=node_models module=repo status=skip node_id={} tag={}",
                    node_id, tag
                ),
            }
        }
        Ok(models)
    }
}

impl ExternalPathIndex for SqlitePathIndex<'_> {
    fn lookup(&self, path: &str) -> Result<Option<ContainerHandle>, CollaboratorError> {
        self.find_node(path)
            .map_err(|err| collaborator_error(COLLABORATOR, err))
    }

    fn list_content_models(
        &self,
        handle: &ContainerHandle,
    ) -> Result<BTreeSet<ContentModel>, CollaboratorError> {
        self.node_models(&handle.node_id)
            .map_err(|err| collaborator_error(COLLABORATOR, err))
    }
}

pub(crate) fn insert_content_models(
    conn: &Connection,
    node_id: &str,
    models: &[ContentModel],
) -> RepoResult<()> {
    for model in models {
        conn.execute(
            "INSERT OR IGNORE INTO node_content_models (node_id, content_model)
             VALUES (?1, ?2);",
            params![node_id, model.as_str()],
        )?;
    }
    Ok(())
}
