//! Domain types for the work-item forest.
//!
//! Concrete, field-complete entities rather than a dynamic value bag,
//! covering the full work-item/dependency/history schema this domain
//! needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work-item lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "todo" => Some(Status::Todo),
            "in-progress" => Some(Status::InProgress),
            "review" => Some(Status::Review),
            "done" => Some(Status::Done),
            _ => None,
        }
    }
}

/// Work-item priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A node in the work-item forest: a project, task, or sub-task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub work_item_id: Uuid,
    pub parent_work_item_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub order_key: String,
    pub shortname: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dependency edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    FinishToStart,
    Linked,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "finish-to-start",
            DependencyType::Linked => "linked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "finish-to-start" => Some(DependencyType::FinishToStart),
            "linked" => Some(DependencyType::Linked),
            _ => None,
        }
    }
}

/// An edge in the dependency graph. Identity is the `(work_item_id,
/// depends_on_work_item_id)` pair; `dependency_type` may change in place
/// via reactivation, never by replacing the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub work_item_id: Uuid,
    pub depends_on_work_item_id: Uuid,
    pub dependency_type: DependencyType,
    pub is_active: bool,
}

/// A single persisted action. Append-only: undo/redo flips `is_undone`
/// and links the pair via `undone_at_action_id`, never deletes rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHistory {
    pub action_id: Uuid,
    pub action_type: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub is_undone: bool,
    pub undone_at_action_id: Option<Uuid>,
}

/// One step of an action's compensating log, in `step_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepType {
    Insert,
    Update,
    Delete,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Insert => "INSERT",
            StepType::Update => "UPDATE",
            StepType::Delete => "DELETE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INSERT" => Some(StepType::Insert),
            "UPDATE" => Some(StepType::Update),
            "DELETE" => Some(StepType::Delete),
            _ => None,
        }
    }
}

/// An ordered child row of [`ActionHistory`] capturing one table mutation
/// as a before/after JSON snapshot pair, per the replay rules in
/// `holon::services::history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoStep {
    pub action_id: Uuid,
    pub step_order: i64,
    pub step_type: StepType,
    pub table_name: String,
    pub record_id: String,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [Status::Todo, Status::InProgress, Status::Review, Status::Done] {
            assert_eq!(Status::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn priority_round_trips_through_str() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::parse(p.as_str()), Some(p));
        }
    }

    #[test]
    fn dependency_type_round_trips_through_str() {
        for d in [DependencyType::FinishToStart, DependencyType::Linked] {
            assert_eq!(DependencyType::parse(d.as_str()), Some(d));
        }
    }

    #[test]
    fn step_type_round_trips_through_str() {
        for s in [StepType::Insert, StepType::Update, StepType::Delete] {
            assert_eq!(StepType::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn unknown_strings_fail_to_parse() {
        assert_eq!(Status::parse("bogus"), None);
        assert_eq!(Priority::parse("bogus"), None);
        assert_eq!(DependencyType::parse("bogus"), None);
        assert_eq!(StepType::parse("bogus"), None);
    }
}
