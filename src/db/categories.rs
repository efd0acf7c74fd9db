//! Category CRUD and lookups.
//!
//! A category's own create/update/delete reports straight to the villa level;
//! task-driven recomputation goes through [`super::stats::recompute_category`].

use super::propagate::teams_changed;
use super::teams::require_team;
use super::villas::require_villa;
use super::{Database, now_ms, query_all};
use crate::error::{EntityKind, StoreError};
use crate::types::{Category, CategoryInput, CategoryStatus, Id, ref_id};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

pub fn parse_category_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        villa_id: row.get("villa_id")?,
        team_id: row.get("team_id")?,
        name: row.get("name")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        progress: row.get("progress")?,
        status: row.get("status")?,
        tasks_count: row.get("tasks_count")?,
        completed_tasks: row.get("completed_tasks")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_category_internal(conn: &Connection, category_id: Id) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT * FROM categories WHERE id = ?1",
            params![category_id],
            parse_category_row,
        )
        .optional()?;
    Ok(category)
}

pub(crate) fn require_category(conn: &Connection, category_id: Id) -> Result<Category> {
    get_category_internal(conn, category_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Category, category_id).into())
}

impl Database {
    /// Create a category under an existing villa, optionally assigned to a team.
    pub fn create_category(&self, input: CategoryInput) -> Result<Category> {
        let villa_id = ref_id(&input.villa).ok_or(StoreError::MissingReference("villa.id"))?;
        let team_id = ref_id(&input.team);
        let now = now_ms();

        let category = self.with_tx(|tx| {
            require_villa(tx, villa_id)?;
            if let Some(team_id) = team_id {
                require_team(tx, team_id)?;
            }

            tx.execute(
                "INSERT INTO categories (
                    villa_id, team_id, name, start_date, end_date, progress, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    villa_id,
                    team_id,
                    input.name,
                    input.start_date,
                    input.end_date,
                    input.progress,
                    input.status,
                    now,
                    now,
                ],
            )?;
            let category_id = tx.last_insert_rowid();

            self.propagator().villa_changed(tx, villa_id)?;
            require_category(tx, category_id)
        })?;

        info!(category_id = category.id, villa_id, "Created category");
        Ok(category)
    }

    /// Get a category by ID.
    pub fn get_category(&self, category_id: Id) -> Result<Option<Category>> {
        self.with_conn(|conn| get_category_internal(conn, category_id))
    }

    /// List all categories.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            query_all(conn, "SELECT * FROM categories ORDER BY id", [], parse_category_row)
        })
    }

    /// List the categories of a villa.
    pub fn list_categories_by_villa(&self, villa_id: Id) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM categories WHERE villa_id = ?1 ORDER BY id",
                params![villa_id],
                parse_category_row,
            )
        })
    }

    /// List every category in any villa of a project.
    pub fn list_categories_by_project(&self, project_id: Id) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT c.* FROM categories c
                 INNER JOIN villas v ON c.villa_id = v.id
                 WHERE v.project_id = ?1
                 ORDER BY c.id",
                params![project_id],
                parse_category_row,
            )
        })
    }

    /// List the categories assigned to a team.
    pub fn list_categories_by_team(&self, team_id: Id) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM categories WHERE team_id = ?1 ORDER BY id",
                params![team_id],
                parse_category_row,
            )
        })
    }

    /// List the categories currently in `status`.
    pub fn list_categories_by_status(&self, status: CategoryStatus) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM categories WHERE status = ?1 ORDER BY id",
                params![status],
                parse_category_row,
            )
        })
    }

    /// Replace a category's name, dates, progress and status.
    ///
    /// The team is switched only when the payload names one; the villa never
    /// changes.
    pub fn update_category(&self, category_id: Id, input: CategoryInput) -> Result<Category> {
        self.with_tx(|tx| {
            let current = require_category(tx, category_id)?;
            let team_id = match ref_id(&input.team) {
                Some(team_id) => Some(require_team(tx, team_id)?.id),
                None => current.team_id,
            };

            tx.execute(
                "UPDATE categories
                 SET name = ?1, start_date = ?2, end_date = ?3, progress = ?4, status = ?5,
                     team_id = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    input.name,
                    input.start_date,
                    input.end_date,
                    input.progress,
                    input.status,
                    team_id,
                    now_ms(),
                    category_id,
                ],
            )?;

            self.propagator().villa_changed(tx, current.villa_id)?;
            require_category(tx, category_id)
        })
    }

    /// Delete a category and its tasks, then refresh the villa and the teams
    /// that held those tasks.
    pub fn delete_category(&self, category_id: Id) -> Result<()> {
        self.with_tx(|tx| {
            let category = require_category(tx, category_id)?;
            let teams: Vec<Id> = query_all(
                tx,
                "SELECT DISTINCT team_id FROM tasks
                 WHERE category_id = ?1 AND team_id IS NOT NULL",
                params![category_id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM categories WHERE id = ?1", params![category_id])?;
            self.propagator().villa_changed(tx, category.villa_id)?;
            teams_changed(self.propagator(), tx, &teams)
        })?;

        info!(category_id, "Deleted category");
        Ok(())
    }

    /// Recompute a category's counters, progress and status from its tasks,
    /// then its villa's rollups.
    pub fn recompute_category_stats(&self, category_id: Id) -> Result<Category> {
        self.with_tx(|tx| {
            self.propagator().category_changed(tx, category_id)?;
            require_category(tx, category_id)
        })
    }
}
