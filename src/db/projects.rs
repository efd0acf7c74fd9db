//! Project CRUD.

use super::propagate::teams_changed;
use super::{Database, now_ms, query_all};
use crate::error::{EntityKind, StoreError};
use crate::types::{Id, Project, ProjectInput};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

pub fn parse_project_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        location: row.get("location")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_project_internal(conn: &Connection, project_id: Id) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT * FROM projects WHERE id = ?1",
            params![project_id],
            parse_project_row,
        )
        .optional()?;
    Ok(project)
}

pub(crate) fn require_project(conn: &Connection, project_id: Id) -> Result<Project> {
    get_project_internal(conn, project_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Project, project_id).into())
}

impl Database {
    /// Create a new project.
    pub fn create_project(&self, input: ProjectInput) -> Result<Project> {
        let now = now_ms();

        let project = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO projects (name, description, location, start_date, end_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.name,
                    input.description,
                    input.location,
                    input.start_date,
                    input.end_date,
                    now,
                    now,
                ],
            )?;
            require_project(tx, tx.last_insert_rowid())
        })?;

        info!(project_id = project.id, name = %project.name, "Created project");
        Ok(project)
    }

    /// Get a project by ID.
    pub fn get_project(&self, project_id: Id) -> Result<Option<Project>> {
        self.with_conn(|conn| get_project_internal(conn, project_id))
    }

    /// List all projects by name.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            query_all(conn, "SELECT * FROM projects ORDER BY name, id", [], parse_project_row)
        })
    }

    /// Replace a project's editable fields.
    pub fn update_project(&self, project_id: Id, input: ProjectInput) -> Result<Project> {
        self.with_tx(|tx| {
            require_project(tx, project_id)?;
            tx.execute(
                "UPDATE projects
                 SET name = ?1, description = ?2, location = ?3, start_date = ?4, end_date = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    input.name,
                    input.description,
                    input.location,
                    input.start_date,
                    input.end_date,
                    now_ms(),
                    project_id,
                ],
            )?;
            require_project(tx, project_id)
        })
    }

    /// Delete a project together with its villas, categories and tasks.
    pub fn delete_project(&self, project_id: Id) -> Result<()> {
        self.with_tx(|tx| {
            require_project(tx, project_id)?;
            let teams: Vec<Id> = query_all(
                tx,
                "SELECT DISTINCT t.team_id FROM tasks t
                 INNER JOIN categories c ON t.category_id = c.id
                 INNER JOIN villas v ON c.villa_id = v.id
                 WHERE v.project_id = ?1 AND t.team_id IS NOT NULL",
                params![project_id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
            teams_changed(self.propagator(), tx, &teams)
        })?;

        info!(project_id, "Deleted project");
        Ok(())
    }
}
