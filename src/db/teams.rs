//! Team CRUD and lookups.

use super::tasks::require_task;
use super::{Database, now_ms, query_all};
use crate::error::{EntityKind, StoreError};
use crate::types::{Id, TaskStatus, Team, TeamInput};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

pub fn parse_team_row(row: &Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get("id")?,
        name: row.get("name")?,
        specialty: row.get("specialty")?,
        members_count: row.get("members_count")?,
        performance: row.get("performance")?,
        active_tasks: row.get("active_tasks")?,
        last_activity: row.get("last_activity")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_team_internal(conn: &Connection, team_id: Id) -> Result<Option<Team>> {
    let team = conn
        .query_row(
            "SELECT * FROM teams WHERE id = ?1",
            params![team_id],
            parse_team_row,
        )
        .optional()?;
    Ok(team)
}

pub(crate) fn require_team(conn: &Connection, team_id: Id) -> Result<Team> {
    get_team_internal(conn, team_id)?
        .ok_or_else(|| StoreError::not_found(EntityKind::Team, team_id).into())
}

/// Unicode-aware case-insensitive substring test.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Database {
    /// Create a team.
    ///
    /// Tasks listed in `input.tasks` are pointed at the new team before the
    /// transaction commits; an unknown task id aborts the whole creation.
    pub fn create_team(&self, input: TeamInput) -> Result<Team> {
        let now = now_ms();

        let team = self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO teams (name, specialty, members_count, performance, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    input.name,
                    input.specialty,
                    input.members_count,
                    input.performance,
                    now,
                    now,
                ],
            )?;
            let team_id = tx.last_insert_rowid();

            for task_ref in &input.tasks {
                let task_id = task_ref.id.ok_or(StoreError::MissingReference("tasks.id"))?;
                require_task(tx, task_id)?;
                tx.execute(
                    "UPDATE tasks SET team_id = ?1, updated_at = ?2 WHERE id = ?3",
                    params![team_id, now, task_id],
                )?;
            }

            require_team(tx, team_id)
        })?;

        info!(team_id = team.id, name = %team.name, tasks = input.tasks.len(), "Created team");
        Ok(team)
    }

    /// Get a team by ID.
    pub fn get_team(&self, team_id: Id) -> Result<Option<Team>> {
        self.with_conn(|conn| get_team_internal(conn, team_id))
    }

    /// List all teams.
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        self.with_conn(|conn| query_all(conn, "SELECT * FROM teams ORDER BY id", [], parse_team_row))
    }

    /// Replace a team's name, specialty, member count and performance.
    pub fn update_team(&self, team_id: Id, input: TeamInput) -> Result<Team> {
        self.with_tx(|tx| {
            require_team(tx, team_id)?;
            tx.execute(
                "UPDATE teams
                 SET name = ?1, specialty = ?2, members_count = ?3, performance = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    input.name,
                    input.specialty,
                    input.members_count,
                    input.performance,
                    now_ms(),
                    team_id,
                ],
            )?;
            require_team(tx, team_id)
        })
    }

    /// Delete a team. Its tasks and categories become unassigned.
    pub fn delete_team(&self, team_id: Id) -> Result<()> {
        self.with_tx(|tx| {
            require_team(tx, team_id)?;
            tx.execute("DELETE FROM teams WHERE id = ?1", params![team_id])?;
            Ok(())
        })?;

        info!(team_id, "Deleted team");
        Ok(())
    }

    /// Case-insensitive substring search over name or specialty.
    ///
    /// SQLite's `LIKE` only folds ASCII, so matching happens here rather than
    /// in SQL.
    pub fn search_teams(&self, term: &str) -> Result<Vec<Team>> {
        let teams = self.list_teams()?;
        Ok(teams
            .into_iter()
            .filter(|team| {
                contains_ignore_case(&team.name, term) || contains_ignore_case(&team.specialty, term)
            })
            .collect())
    }

    /// Teams whose specialty contains `specialty`, ignoring case.
    pub fn list_teams_by_specialty(&self, specialty: &str) -> Result<Vec<Team>> {
        let teams = self.list_teams()?;
        Ok(teams
            .into_iter()
            .filter(|team| contains_ignore_case(&team.specialty, specialty))
            .collect())
    }

    /// Teams with at least one pending or in-progress task.
    pub fn list_active_teams(&self) -> Result<Vec<Team>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM teams tm
                 WHERE EXISTS (
                     SELECT 1 FROM tasks t
                     WHERE t.team_id = tm.id AND t.status IN (?1, ?2)
                 )
                 ORDER BY tm.id",
                params![TaskStatus::Pending, TaskStatus::InProgress],
                parse_team_row,
            )
        })
    }

    /// All teams, best performance first.
    pub fn list_teams_by_performance(&self) -> Result<Vec<Team>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM teams ORDER BY performance DESC, id",
                [],
                parse_team_row,
            )
        })
    }

    /// Fleet-wide average performance, `None` when there are no teams.
    pub fn average_team_performance(&self) -> Result<Option<f64>> {
        self.with_conn(|conn| {
            let avg: Option<f64> =
                conn.query_row("SELECT AVG(performance) FROM teams", [], |row| row.get(0))?;
            Ok(avg)
        })
    }

    /// Recompute one team's aggregates on demand.
    pub fn recompute_team_stats(&self, team_id: Id) -> Result<Team> {
        self.with_tx(|tx| {
            self.propagator().team_changed(tx, team_id)?;
            require_team(tx, team_id)
        })
    }

    /// Recompute every team's aggregates in one transaction.
    pub fn recompute_all_team_stats(&self) -> Result<Vec<Team>> {
        let teams = self.with_tx(|tx| {
            let ids: Vec<Id> =
                query_all(tx, "SELECT id FROM teams ORDER BY id", [], |row| row.get(0))?;
            for team_id in ids {
                self.propagator().team_changed(tx, team_id)?;
            }
            query_all(tx, "SELECT * FROM teams ORDER BY id", [], parse_team_row)
        })?;

        info!(count = teams.len(), "Recomputed team stats");
        Ok(teams)
    }

    /// Stamp a team's last activity with the current time.
    pub fn touch_team_activity(&self, team_id: Id) -> Result<Team> {
        self.with_tx(|tx| {
            require_team(tx, team_id)?;
            tx.execute(
                "UPDATE teams SET last_activity = ?1 WHERE id = ?2",
                params![now_ms(), team_id],
            )?;
            require_team(tx, team_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::contains_ignore_case;

    #[test]
    fn matching_folds_accented_letters() {
        assert!(contains_ignore_case("Électricité", "élec"));
        assert!(contains_ignore_case("Maçonnerie", "MAÇON"));
        assert!(contains_ignore_case("Plomberie", "plomb"));
        assert!(!contains_ignore_case("Plomberie", "50%"));
    }
}
