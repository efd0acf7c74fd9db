//! Task lifecycle: CRUD, progress updates, receipt and payment flags.
//!
//! Every mutation that can change a category's counts or completion reports
//! to the stats propagator inside the same transaction. Receipt and payment
//! flags do not feed any derived field and skip propagation.

use super::categories::require_category;
use super::propagate::task_changed;
use super::teams::require_team;
use super::villas::require_villa;
use super::{Database, now_ms, query_all};
use crate::error::{EntityKind, StoreError};
use crate::types::{Id, ProgressStatus, ProjectAmounts, Task, TaskInput, TaskStatus, ref_id};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        category_id: row.get("category_id")?,
        villa_id: row.get("villa_id")?,
        team_id: row.get("team_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        planned_start_date: row.get("planned_start_date")?,
        planned_end_date: row.get("planned_end_date")?,
        status: row.get("status")?,
        progress: row.get("progress")?,
        progress_status: row.get("progress_status")?,
        is_received: row.get("is_received")?,
        is_paid: row.get("is_paid")?,
        amount: row.get("amount")?,
        remarks: row.get("remarks")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: Id) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    Ok(task)
}

pub(crate) fn require_task(conn: &Connection, task_id: Id) -> Result<Task> {
    get_task_internal(conn, task_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Task, task_id).into())
}

/// Number of tasks in a category.
pub(crate) fn count_tasks_by_category(conn: &Connection, category_id: Id) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE category_id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Number of tasks in a category with the given status.
pub(crate) fn count_tasks_by_category_and_status(
    conn: &Connection,
    category_id: Id,
    status: TaskStatus,
) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE category_id = ?1 AND status = ?2",
        params![category_id, status],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// All tasks assigned to a team.
pub(crate) fn list_tasks_by_team_internal(conn: &Connection, team_id: Id) -> Result<Vec<Task>> {
    query_all(
        conn,
        "SELECT * FROM tasks WHERE team_id = ?1 ORDER BY id",
        params![team_id],
        parse_task_row,
    )
}

/// Set one boolean flag column to true.
fn set_flag(conn: &Connection, task_id: Id, column: Flag) -> Result<Task> {
    require_task(conn, task_id)?;
    let sql = match column {
        Flag::Received => "UPDATE tasks SET is_received = 1, updated_at = ?1 WHERE id = ?2",
        Flag::Paid => "UPDATE tasks SET is_paid = 1, updated_at = ?1 WHERE id = ?2",
    };
    conn.execute(sql, params![now_ms(), task_id])?;
    require_task(conn, task_id)
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Received,
    Paid,
}

impl Database {
    /// Create a task.
    ///
    /// The category and villa must be given and exist; the team is optional
    /// but must exist when given. Nothing is written if any reference fails.
    ///
    /// The villa is stored as given and is not checked against the category's
    /// villa. Villa rollups count tasks through the category, while
    /// [`Database::list_tasks_by_villa`] filters on the stored villa, so a
    /// mismatched task shows up under its named villa without being counted
    /// there.
    pub fn create_task(&self, input: TaskInput) -> Result<Task> {
        let category_id =
            ref_id(&input.category).ok_or(StoreError::MissingReference("category.id"))?;
        let villa_id = ref_id(&input.villa).ok_or(StoreError::MissingReference("villa.id"))?;
        let team_id = ref_id(&input.team);
        let now = now_ms();

        let task = self.with_tx(|tx| {
            require_category(tx, category_id)?;
            require_villa(tx, villa_id)?;
            if let Some(team_id) = team_id {
                require_team(tx, team_id)?;
            }

            tx.execute(
                "INSERT INTO tasks (
                    category_id, villa_id, team_id, name, description,
                    start_date, end_date, planned_start_date, planned_end_date,
                    status, progress, progress_status, is_received, is_paid, amount, remarks,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    category_id,
                    villa_id,
                    team_id,
                    input.name,
                    input.description,
                    input.start_date,
                    input.end_date,
                    input.planned_start_date,
                    input.planned_end_date,
                    input.status,
                    input.progress,
                    input.progress_status,
                    input.is_received,
                    input.is_paid,
                    input.amount,
                    input.remarks,
                    now,
                    now,
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            task_changed(self.propagator(), tx, category_id, &[team_id])?;
            require_task(tx, task_id)
        })?;

        info!(task_id = task.id, category_id, villa_id, "Created task");
        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: Id) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Replace every mutable field of a task with the payload's values.
    ///
    /// There is no partial patch: fields omitted by the caller take their
    /// defaults. The team switches only when the payload names one. The
    /// owning category and villa never change.
    pub fn update_task(&self, task_id: Id, input: TaskInput) -> Result<Task> {
        let task = self.with_tx(|tx| {
            let current = require_task(tx, task_id)?;
            let team_id = match ref_id(&input.team) {
                Some(team_id) => Some(require_team(tx, team_id)?.id),
                None => current.team_id,
            };

            tx.execute(
                "UPDATE tasks
                 SET name = ?1, description = ?2, start_date = ?3, end_date = ?4,
                     planned_start_date = ?5, planned_end_date = ?6, status = ?7, progress = ?8,
                     progress_status = ?9, is_received = ?10, is_paid = ?11, amount = ?12,
                     remarks = ?13, team_id = ?14, updated_at = ?15
                 WHERE id = ?16",
                params![
                    input.name,
                    input.description,
                    input.start_date,
                    input.end_date,
                    input.planned_start_date,
                    input.planned_end_date,
                    input.status,
                    input.progress,
                    input.progress_status,
                    input.is_received,
                    input.is_paid,
                    input.amount,
                    input.remarks,
                    team_id,
                    now_ms(),
                    task_id,
                ],
            )?;

            task_changed(
                self.propagator(),
                tx,
                current.category_id,
                &[current.team_id, team_id],
            )?;
            require_task(tx, task_id)
        })?;

        info!(task_id, status = %task.status, progress = task.progress, "Updated task");
        Ok(task)
    }

    /// Delete a task, then recompute the category it belonged to.
    pub fn delete_task(&self, task_id: Id) -> Result<()> {
        self.with_tx(|tx| {
            let task = require_task(tx, task_id)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            task_changed(self.propagator(), tx, task.category_id, &[task.team_id])
        })?;

        info!(task_id, "Deleted task");
        Ok(())
    }

    /// Set a task's progress and derive its status from it.
    ///
    /// The value is stored as given, without clamping to 0..=100.
    pub fn update_task_progress(&self, task_id: Id, progress: i32) -> Result<Task> {
        let task = self.with_tx(|tx| {
            let current = require_task(tx, task_id)?;
            let status = current.status.after_progress(progress);

            tx.execute(
                "UPDATE tasks SET progress = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
                params![progress, status, now_ms(), task_id],
            )?;

            task_changed(self.propagator(), tx, current.category_id, &[current.team_id])?;
            require_task(tx, task_id)
        })?;

        debug!(task_id, progress, status = %task.status, "Task progress updated");
        Ok(task)
    }

    /// Flag a task as received. Idempotent; there is no way to unset it.
    pub fn mark_task_received(&self, task_id: Id) -> Result<Task> {
        self.with_tx(|tx| set_flag(tx, task_id, Flag::Received))
    }

    /// Flag a task as paid. Idempotent; there is no way to unset it.
    pub fn mark_task_paid(&self, task_id: Id) -> Result<Task> {
        self.with_tx(|tx| set_flag(tx, task_id, Flag::Paid))
    }

    /// List all tasks, most recently updated first.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks ORDER BY updated_at DESC, id DESC",
                [],
                parse_task_row,
            )
        })
    }

    /// List the tasks of a category.
    pub fn list_tasks_by_category(&self, category_id: Id) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE category_id = ?1 ORDER BY id",
                params![category_id],
                parse_task_row,
            )
        })
    }

    /// List the tasks of a villa.
    pub fn list_tasks_by_villa(&self, villa_id: Id) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE villa_id = ?1 ORDER BY id",
                params![villa_id],
                parse_task_row,
            )
        })
    }

    /// List the tasks of a project, reached through category → villa.
    pub fn list_tasks_by_project(&self, project_id: Id) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT t.* FROM tasks t
                 INNER JOIN categories c ON t.category_id = c.id
                 INNER JOIN villas v ON c.villa_id = v.id
                 WHERE v.project_id = ?1
                 ORDER BY t.id",
                params![project_id],
                parse_task_row,
            )
        })
    }

    /// List the tasks assigned to a team.
    pub fn list_tasks_by_team(&self, team_id: Id) -> Result<Vec<Task>> {
        self.with_conn(|conn| list_tasks_by_team_internal(conn, team_id))
    }

    /// List the tasks in `status`.
    pub fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE status = ?1 ORDER BY id",
                params![status],
                parse_task_row,
            )
        })
    }

    /// List the tasks tagged with `progress_status`.
    pub fn list_tasks_by_progress_status(&self, progress_status: ProgressStatus) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE progress_status = ?1 ORDER BY id",
                params![progress_status],
                parse_task_row,
            )
        })
    }

    /// Completed tasks that have not been received yet.
    pub fn list_unreceived_completed_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE is_received = 0 AND status = ?1 ORDER BY id",
                params![TaskStatus::Completed],
                parse_task_row,
            )
        })
    }

    /// Tasks not paid yet.
    pub fn list_unpaid_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM tasks WHERE is_paid = 0 ORDER BY id",
                [],
                parse_task_row,
            )
        })
    }

    /// Sum of task amounts in a project; `None` when the project has no tasks.
    pub fn total_amount_by_project(&self, project_id: Id) -> Result<Option<f64>> {
        self.sum_project_amount(project_id, false)
    }

    /// Sum of paid task amounts in a project; `None` when nothing is paid.
    pub fn paid_amount_by_project(&self, project_id: Id) -> Result<Option<f64>> {
        self.sum_project_amount(project_id, true)
    }

    /// Financial summary for a project, with empty sums reported as 0.0.
    pub fn project_amounts(&self, project_id: Id) -> Result<ProjectAmounts> {
        Ok(ProjectAmounts {
            total_amount: self.total_amount_by_project(project_id)?.unwrap_or(0.0),
            paid_amount: self.paid_amount_by_project(project_id)?.unwrap_or(0.0),
        })
    }

    fn sum_project_amount(&self, project_id: Id, paid_only: bool) -> Result<Option<f64>> {
        let sql = if paid_only {
            "SELECT SUM(t.amount) FROM tasks t
             INNER JOIN categories c ON t.category_id = c.id
             INNER JOIN villas v ON c.villa_id = v.id
             WHERE v.project_id = ?1 AND t.is_paid = 1"
        } else {
            "SELECT SUM(t.amount) FROM tasks t
             INNER JOIN categories c ON t.category_id = c.id
             INNER JOIN villas v ON c.villa_id = v.id
             WHERE v.project_id = ?1"
        };

        self.with_conn(|conn| {
            let sum: Option<f64> = conn.query_row(sql, params![project_id], |row| row.get(0))?;
            Ok(sum)
        })
    }
}
