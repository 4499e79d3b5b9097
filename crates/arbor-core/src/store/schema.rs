//! SQLite schema for the version store.
//!
//! Four tables mirror the record kinds:
//! - `versions`: graph snapshots with optional parent lineage
//! - `nodes`: vertices, each owned by one version
//! - `edges`: directed links between two nodes of one version
//! - `tags`: uniquely named pointers to versions

use rusqlite::Connection;

use crate::error::ArborResult;

/// SQL for the versions table.
pub const CREATE_VERSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_version_id INTEGER REFERENCES versions(id),
    created_at TEXT NOT NULL
)
"#;

/// Index for child-version listing.
pub const CREATE_VERSIONS_PARENT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_versions_parent ON versions(parent_version_id)
"#;

/// SQL for the nodes table.
pub const CREATE_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions(id),
    payload TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
)
"#;

/// Index for listing a version's nodes.
pub const CREATE_NODES_VERSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_nodes_version ON nodes(version_id)
"#;

/// SQL for the edges table.
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions(id),
    source_node_id INTEGER NOT NULL REFERENCES nodes(id),
    target_node_id INTEGER NOT NULL REFERENCES nodes(id),
    payload TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
)
"#;

/// Index for traversal from a source node.
pub const CREATE_EDGES_SOURCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_node_id)
"#;

/// Index for listing a version's edges.
pub const CREATE_EDGES_VERSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_edges_version ON edges(version_id)
"#;

/// SQL for the tags table.
pub const CREATE_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions(id),
    tag_name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
)
"#;

/// Tag names are unique system-wide.
pub const CREATE_TAGS_NAME_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_tag_name ON tags(tag_name)
"#;

/// Index for listing a version's tags.
pub const CREATE_TAGS_VERSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tags_version ON tags(version_id)
"#;

/// Initialize the schema in the given database connection.
///
/// Creates all tables and indexes if they don't exist.
/// Safe to call multiple times (idempotent).
pub fn init_schema(conn: &Connection) -> ArborResult<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(CREATE_VERSIONS_TABLE, [])?;
    conn.execute(CREATE_NODES_TABLE, [])?;
    conn.execute(CREATE_EDGES_TABLE, [])?;
    conn.execute(CREATE_TAGS_TABLE, [])?;

    conn.execute(CREATE_VERSIONS_PARENT_INDEX, [])?;
    conn.execute(CREATE_NODES_VERSION_INDEX, [])?;
    conn.execute(CREATE_EDGES_SOURCE_INDEX, [])?;
    conn.execute(CREATE_EDGES_VERSION_INDEX, [])?;
    conn.execute(CREATE_TAGS_NAME_INDEX, [])?;
    conn.execute(CREATE_TAGS_VERSION_INDEX, [])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables = table_names(&conn);
        for table in ["versions", "nodes", "edges", "tags"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='versions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_tag_name_index_exists() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("PRAGMA index_list('tags')")
            .unwrap()
            .query_map([], |row| row.get(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(indexes.contains(&"idx_tags_tag_name".to_string()));
    }

    #[test]
    fn test_tag_name_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO versions (name, created_at) VALUES ('Tree', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tags (version_id, tag_name, created_at) VALUES (1, 'v1.0', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO tags (version_id, tag_name, created_at) VALUES (1, 'v1.0', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_node_requires_existing_version() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO nodes (version_id, created_at) VALUES (99, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
