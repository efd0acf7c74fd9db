//! Recalculation of derived fields.
//!
//! Each function reads the children of one record, rewrites that record's
//! aggregates and returns it. None of them cascade on their own; chaining is
//! the job of [`super::propagate::StatsPropagator`].

use super::categories::require_category;
use super::tasks::{
    count_tasks_by_category, count_tasks_by_category_and_status, list_tasks_by_team_internal,
};
use super::teams::require_team;
use super::villas::require_villa;
use super::now_ms;
use crate::types::{
    Category, CategoryStatus, Id, TaskStatus, Team, Villa, VillaStatus, completion_percent,
};
use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::debug;

/// Recompute a category's task counts, and its progress and status when it
/// has tasks. An empty category keeps its stored progress and status.
pub(crate) fn recompute_category(conn: &Connection, category_id: Id) -> Result<Category> {
    let mut category = require_category(conn, category_id)?;

    let total = count_tasks_by_category(conn, category_id)?;
    let completed = count_tasks_by_category_and_status(conn, category_id, TaskStatus::Completed)?;

    category.tasks_count = total as i32;
    category.completed_tasks = completed as i32;
    if let Some(progress) = completion_percent(completed, total) {
        category.progress = progress;
        category.status = CategoryStatus::from_progress(progress);
    }
    category.updated_at = now_ms();

    conn.execute(
        "UPDATE categories
         SET tasks_count = ?1, completed_tasks = ?2, progress = ?3, status = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            category.tasks_count,
            category.completed_tasks,
            category.progress,
            category.status,
            category.updated_at,
            category_id,
        ],
    )?;

    debug!(
        category_id,
        tasks = total,
        completed,
        progress = category.progress,
        status = %category.status,
        "Recomputed category stats"
    );
    Ok(category)
}

/// Recompute a villa's rollups from its categories.
///
/// Progress is the floored mean of category progress. Without categories
/// the stored progress and status are kept; the counters and the
/// modification time are always refreshed.
pub(crate) fn recompute_villa(conn: &Connection, villa_id: Id) -> Result<Villa> {
    let mut villa = require_villa(conn, villa_id)?;

    let (categories, progress_sum): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(progress), 0) FROM categories WHERE villa_id = ?1",
        params![villa_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let tasks: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks t
         INNER JOIN categories c ON t.category_id = c.id
         WHERE c.villa_id = ?1",
        params![villa_id],
        |row| row.get(0),
    )?;

    villa.categories_count = categories as i32;
    villa.tasks_count = tasks as i32;
    if categories > 0 {
        villa.progress = progress_sum.div_euclid(categories) as i32;
        villa.status = VillaStatus::from_progress(villa.progress);
    }
    villa.last_modified = now_ms();

    conn.execute(
        "UPDATE villas
         SET categories_count = ?1, tasks_count = ?2, progress = ?3, status = ?4, last_modified = ?5
         WHERE id = ?6",
        params![
            villa.categories_count,
            villa.tasks_count,
            villa.progress,
            villa.status,
            villa.last_modified,
            villa_id,
        ],
    )?;

    debug!(
        villa_id,
        categories,
        tasks,
        progress = villa.progress,
        status = %villa.status,
        "Recomputed villa stats"
    );
    Ok(villa)
}

/// Recompute a team's active load and performance from its tasks and stamp
/// its last activity. A team without tasks keeps its stored performance.
pub(crate) fn recompute_team(conn: &Connection, team_id: Id) -> Result<Team> {
    let mut team = require_team(conn, team_id)?;
    let tasks = list_tasks_by_team_internal(conn, team_id)?;

    let active = tasks.iter().filter(|t| t.status.is_active()).count() as i64;
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as i64;

    team.active_tasks = active as i32;
    if let Some(performance) = completion_percent(completed, tasks.len() as i64) {
        team.performance = performance;
    }
    team.last_activity = Some(now_ms());

    conn.execute(
        "UPDATE teams SET active_tasks = ?1, performance = ?2, last_activity = ?3 WHERE id = ?4",
        params![team.active_tasks, team.performance, team.last_activity, team_id],
    )?;

    debug!(
        team_id,
        tasks = tasks.len(),
        active,
        performance = team.performance,
        "Recomputed team stats"
    );
    Ok(team)
}
