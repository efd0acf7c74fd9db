//! Explicit propagation of stats changes up the hierarchy.
//!
//! Mutators never rely on implicit hooks: a task write calls
//! [`StatsPropagator::category_changed`], which recomputes the category and
//! then calls [`StatsPropagator::villa_changed`] for its villa. Team stats are
//! only recomputed on explicit request unless the propagator opts in through
//! [`StatsPropagator::cascades_to_team`].

use super::stats;
use crate::types::Id;
use anyhow::Result;
use rusqlite::Connection;

/// One method per level of the hierarchy whose aggregates must be refreshed.
///
/// Every call receives the caller's open transaction, so a failure at any
/// level rolls back the triggering write as well.
pub trait StatsPropagator: Send + Sync {
    /// A task of this category was created, changed or removed.
    fn category_changed(&self, conn: &Connection, category_id: Id) -> Result<()>;

    /// A category of this villa was created, changed, recomputed or removed.
    fn villa_changed(&self, conn: &Connection, villa_id: Id) -> Result<()>;

    /// Recompute the aggregates of this team.
    fn team_changed(&self, conn: &Connection, team_id: Id) -> Result<()>;

    /// Whether task mutations should also call [`Self::team_changed`].
    fn cascades_to_team(&self) -> bool {
        false
    }
}

/// Default propagator: category → villa, with optional task → team.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cascade {
    cascade_team: bool,
}

impl Cascade {
    pub fn new(cascade_team: bool) -> Self {
        Self { cascade_team }
    }
}

impl StatsPropagator for Cascade {
    fn category_changed(&self, conn: &Connection, category_id: Id) -> Result<()> {
        let category = stats::recompute_category(conn, category_id)?;
        self.villa_changed(conn, category.villa_id)
    }

    fn villa_changed(&self, conn: &Connection, villa_id: Id) -> Result<()> {
        stats::recompute_villa(conn, villa_id)?;
        Ok(())
    }

    fn team_changed(&self, conn: &Connection, team_id: Id) -> Result<()> {
        stats::recompute_team(conn, team_id)?;
        Ok(())
    }

    fn cascades_to_team(&self) -> bool {
        self.cascade_team
    }
}

/// Report a task change: its category first, then (when enabled) each
/// distinct team it belonged to before or after the change.
pub(crate) fn task_changed(
    propagator: &dyn StatsPropagator,
    conn: &Connection,
    category_id: Id,
    teams: &[Option<Id>],
) -> Result<()> {
    propagator.category_changed(conn, category_id)?;
    let teams: Vec<Id> = teams.iter().flatten().copied().collect();
    teams_changed(propagator, conn, &teams)
}

/// Recompute each distinct team in `teams` when the propagator cascades to
/// teams. Called after tasks were written or removed in bulk.
pub(crate) fn teams_changed(
    propagator: &dyn StatsPropagator,
    conn: &Connection,
    teams: &[Id],
) -> Result<()> {
    if !propagator.cascades_to_team() {
        return Ok(());
    }

    let mut seen: Vec<Id> = Vec::with_capacity(teams.len());
    for team_id in teams {
        if !seen.contains(team_id) {
            seen.push(*team_id);
            propagator.team_changed(conn, *team_id)?;
        }
    }
    Ok(())
}
