//! Core types for the construction tracker.
//!
//! Entities mirror the store rows one-to-one. JSON uses camelCase field
//! names and SCREAMING_SNAKE_CASE enum values, which is what the web front
//! end sends and expects.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row identifier assigned by the store on first save.
pub type Id = i64;

/// Error for a status string that names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Text conversions shared by every status enum: `as_str`, `Display`,
/// case-insensitive `FromStr`, and rusqlite `ToSql`/`FromSql` as TEXT.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delayed,
}

text_enum!(TaskStatus, "task status" {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Delayed => "DELAYED",
});

impl TaskStatus {
    /// Status after a progress update: 100 completes the task, anything
    /// above zero marks it in progress, and zero (or below) keeps the
    /// current status. There is no regression to `Pending`.
    pub fn after_progress(self, progress: i32) -> Self {
        if progress == 100 {
            TaskStatus::Completed
        } else if progress > 0 {
            TaskStatus::InProgress
        } else {
            self
        }
    }

    /// Pending and in-progress tasks count toward a team's active load.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// Qualitative schedule-health tag on a task, independent of `TaskStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    #[default]
    OnSchedule,
    Ahead,
    Behind,
    AtRisk,
}

text_enum!(ProgressStatus, "progress status" {
    OnSchedule => "ON_SCHEDULE",
    Ahead => "AHEAD",
    Behind => "BEHIND",
    AtRisk => "AT_RISK",
});

/// Derived status of a category.
///
/// The names are kept for compatibility with existing clients even though
/// they read oddly: `OnSchedule` means fully complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryStatus {
    #[default]
    OnSchedule,
    InProgress,
    Warning,
    Delayed,
}

text_enum!(CategoryStatus, "category status" {
    OnSchedule => "ON_SCHEDULE",
    InProgress => "IN_PROGRESS",
    Warning => "WARNING",
    Delayed => "DELAYED",
});

impl CategoryStatus {
    /// Fixed threshold table, first match wins.
    pub fn from_progress(progress: i32) -> Self {
        if progress == 100 {
            CategoryStatus::OnSchedule
        } else if progress > 75 {
            CategoryStatus::InProgress
        } else if progress > 50 {
            CategoryStatus::Warning
        } else {
            CategoryStatus::Delayed
        }
    }
}

/// Derived status of a villa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VillaStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Delayed,
}

text_enum!(VillaStatus, "villa status" {
    NotStarted => "NOT_STARTED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Delayed => "DELAYED",
});

impl VillaStatus {
    pub fn from_progress(progress: i32) -> Self {
        if progress >= 100 {
            VillaStatus::Completed
        } else if progress > 0 {
            VillaStatus::InProgress
        } else {
            VillaStatus::NotStarted
        }
    }
}

/// `floor(part * 100 / total)`, or `None` for an empty set so callers can
/// leave the stored value untouched.
pub fn completion_percent(part: i64, total: i64) -> Option<i32> {
    if total > 0 {
        Some((part * 100 / total) as i32)
    } else {
        None
    }
}

/// A construction site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A building within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Villa {
    pub id: Id,
    pub project_id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub villa_type: Option<String>,
    pub surface: f64,
    pub progress: i32,
    pub status: VillaStatus,
    pub categories_count: i32,
    pub tasks_count: i32,
    pub last_modified: i64,
}

/// A work category within a villa (masonry, plumbing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Id,
    pub villa_id: Id,
    pub team_id: Option<Id>,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: i32,
    pub status: CategoryStatus,
    pub tasks_count: i32,
    pub completed_tasks: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A labor unit assignable to tasks and categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Id,
    pub name: String,
    pub specialty: String,
    pub members_count: i32,
    pub performance: i32,
    pub active_tasks: i32,
    pub last_activity: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An individual unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Id,
    pub category_id: Id,
    pub villa_id: Id,
    pub team_id: Option<Id>,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub progress: i32,
    pub progress_status: ProgressStatus,
    pub is_received: bool,
    pub is_paid: bool,
    pub amount: f64,
    pub remarks: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Reference to another record by id, as sent by clients (`{"id": 3}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<Id>,
}

impl EntityRef {
    pub fn to(id: Id) -> Self {
        Self { id: Some(id) }
    }
}

/// Id carried by an optional reference, if any.
pub fn ref_id(reference: &Option<EntityRef>) -> Option<Id> {
    reference.as_ref().and_then(|r| r.id)
}

/// Create/update payload for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Create/update payload for a villa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VillaInput {
    pub project: Option<EntityRef>,
    /// Flat alternative to `project`.
    pub project_id: Option<Id>,
    pub name: String,
    #[serde(rename = "type")]
    pub villa_type: Option<String>,
    pub surface: f64,
    pub status: VillaStatus,
}

impl VillaInput {
    pub fn project_id(&self) -> Option<Id> {
        ref_id(&self.project).or(self.project_id)
    }
}

/// Create/update payload for a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryInput {
    pub villa: Option<EntityRef>,
    pub team: Option<EntityRef>,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: i32,
    pub status: CategoryStatus,
}

/// Create/update payload for a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamInput {
    pub name: String,
    pub specialty: String,
    pub members_count: i32,
    pub performance: i32,
    /// Tasks to assign to the team on creation. Ignored by update.
    pub tasks: Vec<EntityRef>,
}

/// Create/update payload for a task.
///
/// Update replaces every mutable field with the value given here, so an
/// omitted field is reset to its default rather than preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskInput {
    pub category: Option<EntityRef>,
    pub villa: Option<EntityRef>,
    pub team: Option<EntityRef>,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub planned_start_date: Option<NaiveDate>,
    pub planned_end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub progress: i32,
    pub progress_status: ProgressStatus,
    pub is_received: bool,
    pub is_paid: bool,
    pub amount: f64,
    pub remarks: Option<String>,
}

/// Financial summary for one project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAmounts {
    pub total_amount: f64,
    pub paid_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_status_thresholds() {
        assert_eq!(CategoryStatus::from_progress(100), CategoryStatus::OnSchedule);
        assert_eq!(CategoryStatus::from_progress(99), CategoryStatus::InProgress);
        assert_eq!(CategoryStatus::from_progress(80), CategoryStatus::InProgress);
        assert_eq!(CategoryStatus::from_progress(76), CategoryStatus::InProgress);
        assert_eq!(CategoryStatus::from_progress(75), CategoryStatus::Warning);
        assert_eq!(CategoryStatus::from_progress(60), CategoryStatus::Warning);
        assert_eq!(CategoryStatus::from_progress(51), CategoryStatus::Warning);
        assert_eq!(CategoryStatus::from_progress(50), CategoryStatus::Delayed);
        assert_eq!(CategoryStatus::from_progress(30), CategoryStatus::Delayed);
        assert_eq!(CategoryStatus::from_progress(0), CategoryStatus::Delayed);
    }

    #[test]
    fn task_status_after_progress() {
        assert_eq!(TaskStatus::Pending.after_progress(100), TaskStatus::Completed);
        assert_eq!(TaskStatus::Pending.after_progress(50), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Completed.after_progress(1), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Completed.after_progress(0), TaskStatus::Completed);
        assert_eq!(TaskStatus::Delayed.after_progress(0), TaskStatus::Delayed);
        // Out-of-range values are not clamped.
        assert_eq!(TaskStatus::Pending.after_progress(150), TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.after_progress(-5), TaskStatus::InProgress);
    }

    #[test]
    fn completion_percent_floors_and_skips_empty() {
        assert_eq!(completion_percent(1, 3), Some(33));
        assert_eq!(completion_percent(2, 3), Some(66));
        assert_eq!(completion_percent(3, 3), Some(100));
        assert_eq!(completion_percent(0, 0), None);
    }

    #[test]
    fn enum_text_roundtrip_is_case_insensitive() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), *status);
        }
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("at_risk".parse::<ProgressStatus>().unwrap(), ProgressStatus::AtRisk);

        let err = "FINISHED".parse::<CategoryStatus>().unwrap_err();
        assert_eq!(err.kind, "category status");
    }

    #[test]
    fn task_input_accepts_front_end_payload() {
        let input: TaskInput = serde_json::from_str(
            r#"{
                "name": "Pose carrelage",
                "category": {"id": 4},
                "villa": {"id": 2},
                "team": null,
                "startDate": "2025-03-01",
                "status": "IN_PROGRESS",
                "progress": 40,
                "progressStatus": "BEHIND",
                "isReceived": false,
                "isPaid": false,
                "amount": 1250.5,
                "photos": []
            }"#,
        )
        .unwrap();

        assert_eq!(ref_id(&input.category), Some(4));
        assert_eq!(ref_id(&input.villa), Some(2));
        assert_eq!(ref_id(&input.team), None);
        assert_eq!(input.status, TaskStatus::InProgress);
        assert_eq!(input.progress_status, ProgressStatus::Behind);
        assert_eq!(input.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(input.remarks, None);
    }

    #[test]
    fn villa_serializes_type_field() {
        let villa = Villa {
            id: 1,
            project_id: 1,
            name: "Villa A".into(),
            villa_type: Some("F4".into()),
            surface: 180.0,
            progress: 0,
            status: VillaStatus::NotStarted,
            categories_count: 0,
            tasks_count: 0,
            last_modified: 0,
        };
        let json = serde_json::to_value(&villa).unwrap();
        assert_eq!(json["type"], "F4");
        assert_eq!(json["status"], "NOT_STARTED");
        assert_eq!(json["categoriesCount"], 0);
    }
}
