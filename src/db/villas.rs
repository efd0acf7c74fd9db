//! Villa CRUD. Aggregate fields are maintained by [`super::stats`].

use super::projects::require_project;
use super::propagate::teams_changed;
use super::{Database, now_ms, query_all};
use crate::error::{EntityKind, StoreError};
use crate::types::{Id, Villa, VillaInput};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

pub fn parse_villa_row(row: &Row) -> rusqlite::Result<Villa> {
    Ok(Villa {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        villa_type: row.get("villa_type")?,
        surface: row.get("surface")?,
        progress: row.get("progress")?,
        status: row.get("status")?,
        categories_count: row.get("categories_count")?,
        tasks_count: row.get("tasks_count")?,
        last_modified: row.get("last_modified")?,
    })
}

pub(crate) fn get_villa_internal(conn: &Connection, villa_id: Id) -> Result<Option<Villa>> {
    let villa = conn
        .query_row(
            "SELECT * FROM villas WHERE id = ?1",
            params![villa_id],
            parse_villa_row,
        )
        .optional()?;
    Ok(villa)
}

pub(crate) fn require_villa(conn: &Connection, villa_id: Id) -> Result<Villa> {
    get_villa_internal(conn, villa_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Villa, villa_id).into())
}

impl Database {
    /// Create a villa under an existing project.
    pub fn create_villa(&self, input: VillaInput) -> Result<Villa> {
        let project_id = input
            .project_id()
            .ok_or(StoreError::MissingReference("project.id"))?;

        let villa = self.with_tx(|tx| {
            require_project(tx, project_id)?;
            tx.execute(
                "INSERT INTO villas (project_id, name, villa_type, surface, status, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    project_id,
                    input.name,
                    input.villa_type,
                    input.surface,
                    input.status,
                    now_ms(),
                ],
            )?;
            require_villa(tx, tx.last_insert_rowid())
        })?;

        info!(villa_id = villa.id, project_id, "Created villa");
        Ok(villa)
    }

    /// Get a villa by ID.
    pub fn get_villa(&self, villa_id: Id) -> Result<Option<Villa>> {
        self.with_conn(|conn| get_villa_internal(conn, villa_id))
    }

    /// List all villas.
    pub fn list_villas(&self) -> Result<Vec<Villa>> {
        self.with_conn(|conn| query_all(conn, "SELECT * FROM villas ORDER BY id", [], parse_villa_row))
    }

    /// List the villas of a project.
    pub fn list_villas_by_project(&self, project_id: Id) -> Result<Vec<Villa>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM villas WHERE project_id = ?1 ORDER BY id",
                params![project_id],
                parse_villa_row,
            )
        })
    }

    /// Replace a villa's editable fields (name, type, surface, status).
    ///
    /// The project link and the aggregate counters are not touched.
    pub fn update_villa(&self, villa_id: Id, input: VillaInput) -> Result<Villa> {
        self.with_tx(|tx| {
            require_villa(tx, villa_id)?;
            tx.execute(
                "UPDATE villas
                 SET name = ?1, villa_type = ?2, surface = ?3, status = ?4, last_modified = ?5
                 WHERE id = ?6",
                params![
                    input.name,
                    input.villa_type,
                    input.surface,
                    input.status,
                    now_ms(),
                    villa_id,
                ],
            )?;
            require_villa(tx, villa_id)
        })
    }

    /// Delete a villa together with its categories and tasks.
    pub fn delete_villa(&self, villa_id: Id) -> Result<()> {
        self.with_tx(|tx| {
            require_villa(tx, villa_id)?;
            let teams: Vec<Id> = query_all(
                tx,
                "SELECT DISTINCT t.team_id FROM tasks t
                 INNER JOIN categories c ON t.category_id = c.id
                 WHERE c.villa_id = ?1 AND t.team_id IS NOT NULL",
                params![villa_id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM villas WHERE id = ?1", params![villa_id])?;
            teams_changed(self.propagator(), tx, &teams)
        })?;

        info!(villa_id, "Deleted villa");
        Ok(())
    }

    /// Recompute a villa's rollups from its categories on demand.
    pub fn recompute_villa_stats(&self, villa_id: Id) -> Result<Villa> {
        self.with_tx(|tx| {
            self.propagator().villa_changed(tx, villa_id)?;
            require_villa(tx, villa_id)
        })
    }
}
