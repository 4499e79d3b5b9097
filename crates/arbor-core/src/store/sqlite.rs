//! SQLite-backed store.
//!
//! A single connection sits behind a mutex, which serializes every read and
//! every transaction. Forks therefore never interleave with each other and
//! readers never see a half-copied version.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params, TransactionBehavior};

use super::schema;
use super::{Store, StoreOps};
use crate::error::{ArborError, ArborResult};
use crate::types::{Edge, EdgeId, Node, NodeId, Payload, Tag, TagId, Version, VersionId};

const VERSION_COLUMNS: &str = "id, name, parent_version_id, created_at";
const NODE_COLUMNS: &str = "id, version_id, payload, created_at";
const EDGE_COLUMNS: &str = "id, version_id, source_node_id, target_node_id, payload, created_at";
const TAG_COLUMNS: &str = "id, version_id, tag_name, description, created_at";

/// SQLite-backed version store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> ArborResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;
        schema::init_schema(&conn)?;
        tracing::debug!("Opened SQLite store at {}", path.as_ref().display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> ArborResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> ArborResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ArborError::internal(format!("store lock poisoned: {}", e)))
    }

    fn with_conn<T>(&self, f: impl FnOnce(ConnOps<'_>) -> ArborResult<T>) -> ArborResult<T> {
        let conn = self.lock()?;
        f(ConnOps(&*conn))
    }
}

/// Store operations over a borrowed connection (plain or transactional).
struct ConnOps<'a>(&'a Connection);

impl ConnOps<'_> {
    fn version_exists(&self, id: VersionId) -> ArborResult<bool> {
        let found = self
            .0
            .query_row("SELECT 1 FROM versions WHERE id = ?1", params![id.0], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn node_version(&self, id: NodeId) -> ArborResult<Option<VersionId>> {
        let version = self
            .0
            .query_row(
                "SELECT version_id FROM nodes WHERE id = ?1",
                params![id.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(version.map(VersionId))
    }

    fn query_one<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&rusqlite::Row<'_>) -> ArborResult<T>,
    ) -> ArborResult<Option<T>> {
        let mut stmt = self.0.prepare(sql)?;
        stmt.query_row(params, |row| Ok(map(row)))
            .optional()?
            .transpose()
    }

    fn query_all<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&rusqlite::Row<'_>) -> ArborResult<T>,
    ) -> ArborResult<Vec<T>> {
        let mut stmt = self.0.prepare(sql)?;
        let results = stmt.query_map(params, |row| Ok(map(row)))?;

        results
            .map(|r| r.map_err(ArborError::from).and_then(|inner| inner))
            .collect()
    }
}

fn parse_timestamp(raw: &str) -> ArborResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ArborError::database(format!("invalid timestamp '{}': {}", raw, e)))
}

fn parse_payload(raw: &str) -> ArborResult<Payload> {
    Ok(serde_json::from_str(raw)?)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn row_to_version(row: &rusqlite::Row<'_>) -> ArborResult<Version> {
    let created_at: String = row.get(3)?;
    Ok(Version {
        id: VersionId(row.get(0)?),
        name: row.get(1)?,
        parent_version_id: row.get::<_, Option<i64>>(2)?.map(VersionId),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_node(row: &rusqlite::Row<'_>) -> ArborResult<Node> {
    let payload: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Node {
        id: NodeId(row.get(0)?),
        version_id: VersionId(row.get(1)?),
        payload: parse_payload(&payload)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> ArborResult<Edge> {
    let payload: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Edge {
        id: EdgeId(row.get(0)?),
        version_id: VersionId(row.get(1)?),
        source_node_id: NodeId(row.get(2)?),
        target_node_id: NodeId(row.get(3)?),
        payload: parse_payload(&payload)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_tag(row: &rusqlite::Row<'_>) -> ArborResult<Tag> {
    let created_at: String = row.get(4)?;
    Ok(Tag {
        id: TagId(row.get(0)?),
        version_id: VersionId(row.get(1)?),
        tag_name: row.get(2)?,
        description: row.get(3)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl StoreOps for ConnOps<'_> {
    fn create_version(&self, name: &str, parent: Option<VersionId>) -> ArborResult<Version> {
        if let Some(parent_id) = parent {
            if !self.version_exists(parent_id)? {
                return Err(ArborError::version_not_found(parent_id));
            }
        }

        let created_at = Utc::now();
        self.0.execute(
            "INSERT INTO versions (name, parent_version_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, parent.map(|p| p.0), created_at.to_rfc3339()],
        )?;
        let id = VersionId(self.0.last_insert_rowid());
        tracing::debug!("Created version {} ('{}')", id, name);

        Ok(Version {
            id,
            name: name.to_string(),
            parent_version_id: parent,
            created_at,
        })
    }

    fn get_version(&self, id: VersionId) -> ArborResult<Option<Version>> {
        self.query_one(
            &format!("SELECT {} FROM versions WHERE id = ?1", VERSION_COLUMNS),
            params![id.0],
            row_to_version,
        )
    }

    fn list_versions_by_parent(&self, parent: VersionId) -> ArborResult<Vec<Version>> {
        self.query_all(
            &format!(
                "SELECT {} FROM versions WHERE parent_version_id = ?1 ORDER BY id ASC",
                VERSION_COLUMNS
            ),
            params![parent.0],
            row_to_version,
        )
    }

    fn list_versions(&self) -> ArborResult<Vec<Version>> {
        self.query_all(
            &format!("SELECT {} FROM versions ORDER BY id ASC", VERSION_COLUMNS),
            [],
            row_to_version,
        )
    }

    fn create_node(&self, version_id: VersionId, payload: &Payload) -> ArborResult<Node> {
        if !self.version_exists(version_id)? {
            return Err(ArborError::version_not_found(version_id));
        }

        let created_at = Utc::now();
        self.0.execute(
            "INSERT INTO nodes (version_id, payload, created_at) VALUES (?1, ?2, ?3)",
            params![
                version_id.0,
                serde_json::to_string(payload)?,
                created_at.to_rfc3339()
            ],
        )?;

        Ok(Node {
            id: NodeId(self.0.last_insert_rowid()),
            version_id,
            payload: payload.clone(),
            created_at,
        })
    }

    fn get_node(&self, id: NodeId) -> ArborResult<Option<Node>> {
        self.query_one(
            &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
            params![id.0],
            row_to_node,
        )
    }

    fn list_nodes_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Node>> {
        self.query_all(
            &format!(
                "SELECT {} FROM nodes WHERE version_id = ?1 ORDER BY id ASC",
                NODE_COLUMNS
            ),
            params![version_id.0],
            row_to_node,
        )
    }

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        payload: &Payload,
    ) -> ArborResult<Edge> {
        let source_version = self
            .node_version(source)?
            .ok_or_else(|| ArborError::node_not_found(source))?;
        let target_version = self
            .node_version(target)?
            .ok_or_else(|| ArborError::node_not_found(target))?;

        if source_version != target_version {
            return Err(ArborError::invalid_reference(format!(
                "edge {} -> {} crosses versions {} and {}",
                source, target, source_version, target_version
            )));
        }

        let created_at = Utc::now();
        self.0.execute(
            r#"INSERT INTO edges (version_id, source_node_id, target_node_id, payload, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                source_version.0,
                source.0,
                target.0,
                serde_json::to_string(payload)?,
                created_at.to_rfc3339()
            ],
        )?;

        Ok(Edge {
            id: EdgeId(self.0.last_insert_rowid()),
            version_id: source_version,
            source_node_id: source,
            target_node_id: target,
            payload: payload.clone(),
            created_at,
        })
    }

    fn list_edges_by_source(&self, node_id: NodeId) -> ArborResult<Vec<Edge>> {
        self.query_all(
            &format!(
                "SELECT {} FROM edges WHERE source_node_id = ?1 ORDER BY id ASC",
                EDGE_COLUMNS
            ),
            params![node_id.0],
            row_to_edge,
        )
    }

    fn list_edges_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Edge>> {
        self.query_all(
            &format!(
                "SELECT {} FROM edges WHERE version_id = ?1 ORDER BY id ASC",
                EDGE_COLUMNS
            ),
            params![version_id.0],
            row_to_edge,
        )
    }

    fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        if !self.version_exists(version_id)? {
            return Err(ArborError::version_not_found(version_id));
        }

        let created_at = Utc::now();
        let inserted = self.0.execute(
            r#"INSERT INTO tags (version_id, tag_name, description, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![version_id.0, tag_name, description, created_at.to_rfc3339()],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(ArborError::duplicate_tag(tag_name)),
            Err(e) => return Err(e.into()),
        }

        Ok(Tag {
            id: TagId(self.0.last_insert_rowid()),
            version_id,
            tag_name: tag_name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    fn get_tag_by_name(&self, tag_name: &str) -> ArborResult<Option<Tag>> {
        self.query_one(
            &format!("SELECT {} FROM tags WHERE tag_name = ?1", TAG_COLUMNS),
            params![tag_name],
            row_to_tag,
        )
    }

    fn list_tags_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>> {
        self.query_all(
            &format!(
                "SELECT {} FROM tags WHERE version_id = ?1 ORDER BY id ASC",
                TAG_COLUMNS
            ),
            params![version_id.0],
            row_to_tag,
        )
    }
}

impl StoreOps for SqliteStore {
    fn create_version(&self, name: &str, parent: Option<VersionId>) -> ArborResult<Version> {
        self.with_conn(|ops| ops.create_version(name, parent))
    }

    fn get_version(&self, id: VersionId) -> ArborResult<Option<Version>> {
        self.with_conn(|ops| ops.get_version(id))
    }

    fn list_versions_by_parent(&self, parent: VersionId) -> ArborResult<Vec<Version>> {
        self.with_conn(|ops| ops.list_versions_by_parent(parent))
    }

    fn list_versions(&self) -> ArborResult<Vec<Version>> {
        self.with_conn(|ops| ops.list_versions())
    }

    fn create_node(&self, version_id: VersionId, payload: &Payload) -> ArborResult<Node> {
        self.with_conn(|ops| ops.create_node(version_id, payload))
    }

    fn get_node(&self, id: NodeId) -> ArborResult<Option<Node>> {
        self.with_conn(|ops| ops.get_node(id))
    }

    fn list_nodes_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Node>> {
        self.with_conn(|ops| ops.list_nodes_by_version(version_id))
    }

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        payload: &Payload,
    ) -> ArborResult<Edge> {
        self.with_conn(|ops| ops.create_edge(source, target, payload))
    }

    fn list_edges_by_source(&self, node_id: NodeId) -> ArborResult<Vec<Edge>> {
        self.with_conn(|ops| ops.list_edges_by_source(node_id))
    }

    fn list_edges_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Edge>> {
        self.with_conn(|ops| ops.list_edges_by_version(version_id))
    }

    fn create_tag(
        &self,
        version_id: VersionId,
        tag_name: &str,
        description: Option<&str>,
    ) -> ArborResult<Tag> {
        self.with_conn(|ops| ops.create_tag(version_id, tag_name, description))
    }

    fn get_tag_by_name(&self, tag_name: &str) -> ArborResult<Option<Tag>> {
        self.with_conn(|ops| ops.get_tag_by_name(tag_name))
    }

    fn list_tags_by_version(&self, version_id: VersionId) -> ArborResult<Vec<Tag>> {
        self.with_conn(|ops| ops.list_tags_by_version(version_id))
    }
}

impl Store for SqliteStore {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn StoreOps) -> ArborResult<()>,
    ) -> ArborResult<()> {
        let mut conn = self.lock()?;
        // Dropping an uncommitted transaction rolls it back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        work(&ConnOps(&*tx))?;
        tx.commit()?;
        Ok(())
    }
}
