//! Entity repository: typed CRUD over the `entities` table.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{MemoryError, Result};
use crate::memory::types::Entity;
use crate::memory::{escape_like, now_utc, MAX_ENTITY_NAME_LEN, MAX_ENTITY_TYPE_LEN};

/// Default page size for [`list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_type: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const ENTITY_COLUMNS: &str = "id, name, entity_type, created_at, updated_at";

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Entity>> {
    let entity = conn
        .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
            params![id],
            row_to_entity,
        )
        .optional()?;
    Ok(entity)
}

/// Case-sensitive exact name lookup — name comparison decides entity identity.
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Entity>> {
    let entity = conn
        .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE name = ?1"),
            params![name],
            row_to_entity,
        )
        .optional()?;
    Ok(entity)
}

/// Atomic upsert by name. Two concurrent calls with the same name converge on
/// one row; the type of an existing entity is left untouched.
pub fn find_or_create(
    conn: &Connection,
    name: &str,
    entity_type: Option<&str>,
) -> Result<Entity> {
    validate_name(name)?;
    if let Some(t) = entity_type {
        if t.chars().count() > MAX_ENTITY_TYPE_LEN {
            return Err(MemoryError::InvalidInput(format!(
                "entity type must be at most {MAX_ENTITY_TYPE_LEN} characters"
            )));
        }
    }

    let now = now_utc();
    conn.execute(
        "INSERT INTO entities (id, name, entity_type, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4) \
         ON CONFLICT(name) DO NOTHING",
        params![uuid::Uuid::now_v7().to_string(), name, entity_type, now],
    )?;

    find_by_name(conn, name)?.ok_or_else(|| {
        MemoryError::Database(rusqlite::Error::QueryReturnedNoRows)
    })
}

/// List entities ordered by `updated_at` descending, optionally filtered by type.
pub fn list(
    conn: &Connection,
    entity_type: Option<&str>,
    limit: usize,
) -> Result<Vec<Entity>> {
    let mut entities = Vec::new();
    match entity_type {
        Some(t) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTITY_COLUMNS} FROM entities WHERE entity_type = ?1 \
                 ORDER BY updated_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![t, limit as i64], row_to_entity)?;
            for row in rows {
                entities.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTITY_COLUMNS} FROM entities ORDER BY updated_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], row_to_entity)?;
            for row in rows {
                entities.push(row?);
            }
        }
    }
    Ok(entities)
}

/// Advance `updated_at` to the current wall-clock time.
pub fn touch(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE entities SET updated_at = ?1 WHERE id = ?2",
        params![now_utc(), id],
    )?;
    Ok(())
}

/// Delete an entity row. Cascades to observations, embeddings, and
/// relationships via foreign keys. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Case-insensitive substring search over names, at most 10 results.
pub fn search_by_name_substring(conn: &Connection, query: &str) -> Result<Vec<Entity>> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTITY_COLUMNS} FROM entities WHERE name LIKE ?1 ESCAPE '\\' \
         ORDER BY updated_at DESC LIMIT 10"
    ))?;
    let rows = stmt.query_map(params![pattern], row_to_entity)?;
    let mut entities = Vec::new();
    for row in rows {
        entities.push(row?);
    }
    Ok(entities)
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_ENTITY_NAME_LEN {
        return Err(MemoryError::InvalidInput(format!(
            "entity name must be 1-{MAX_ENTITY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let conn = test_db();
        let first = find_or_create(&conn, "karolina", Some("person")).unwrap();
        let second = find_or_create(&conn, "karolina", None).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.entity_type.as_deref(), Some("person"));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn name_lookup_is_case_sensitive() {
        let conn = test_db();
        find_or_create(&conn, "Hippocampus", None).unwrap();

        assert!(find_by_name(&conn, "Hippocampus").unwrap().is_some());
        assert!(find_by_name(&conn, "hippocampus").unwrap().is_none());
    }

    #[test]
    fn name_length_caps_enforced() {
        let conn = test_db();
        assert!(find_or_create(&conn, "", None).is_err());
        let long = "x".repeat(201);
        assert!(find_or_create(&conn, &long, None).is_err());
        let max = "x".repeat(200);
        assert!(find_or_create(&conn, &max, None).is_ok());
    }

    #[test]
    fn list_orders_by_recency() {
        let conn = test_db();
        let older = find_or_create(&conn, "older", None).unwrap();
        let newer = find_or_create(&conn, "newer", None).unwrap();
        // Force a strictly later timestamp on "older" by touching it.
        conn.execute(
            "UPDATE entities SET updated_at = '2099-01-01T00:00:00+00:00' WHERE id = ?1",
            params![older.id],
        )
        .unwrap();

        let listed = list(&conn, None, 100).unwrap();
        assert_eq!(listed[0].id, older.id);
        assert!(listed.iter().any(|e| e.id == newer.id));
    }

    #[test]
    fn list_filters_by_type() {
        let conn = test_db();
        find_or_create(&conn, "alice", Some("person")).unwrap();
        find_or_create(&conn, "hippocampus", Some("project")).unwrap();

        let people = list(&conn, Some("person"), 100).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name, "alice");
    }

    #[test]
    fn substring_search_is_case_insensitive_and_capped() {
        let conn = test_db();
        for i in 0..15 {
            find_or_create(&conn, &format!("Project-{i}"), None).unwrap();
        }

        let hits = search_by_name_substring(&conn, "project").unwrap();
        assert_eq!(hits.len(), 10);
    }

    #[test]
    fn substring_search_escapes_like_metacharacters() {
        let conn = test_db();
        find_or_create(&conn, "100% done", None).unwrap();
        find_or_create(&conn, "100x done", None).unwrap();

        let hits = search_by_name_substring(&conn, "100%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100% done");
    }

    #[test]
    fn touch_advances_updated_at() {
        let conn = test_db();
        let entity = find_or_create(&conn, "notes", None).unwrap();
        conn.execute(
            "UPDATE entities SET updated_at = '2000-01-01T00:00:00+00:00' WHERE id = ?1",
            params![entity.id],
        )
        .unwrap();

        touch(&conn, &entity.id).unwrap();
        let after = find_by_id(&conn, &entity.id).unwrap().unwrap();
        assert!(after.updated_at > "2000-01-02".to_string());
    }

    #[test]
    fn delete_returns_whether_row_existed() {
        let conn = test_db();
        let entity = find_or_create(&conn, "gone", None).unwrap();
        assert!(delete(&conn, &entity.id).unwrap());
        assert!(!delete(&conn, &entity.id).unwrap());
    }
}
