//! Field Update: `set_name`, `set_description`, `set_status`,
//! `set_priority`, `set_due_date`.

use chrono::{DateTime, Utc};
use holon_core::{slug, CoreError, Priority, Status, StepType, WorkItem};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::work_item_repo::{self, WorkItemPatch};
use crate::storage::Tx;

use super::utils::{snapshot, MutationOutcome};

/// One of the five single-field mutations exposed on the operation
/// surface.
#[derive(Debug, Clone)]
pub enum FieldUpdate {
    Name(String),
    Description(Option<String>),
    Status(Status),
    Priority(Priority),
    DueDate(Option<DateTime<Utc>>),
}

impl FieldUpdate {
    fn action_type(&self) -> &'static str {
        match self {
            FieldUpdate::Name(_) => "UPDATE_WORK_ITEM_NAME",
            FieldUpdate::Description(_) => "UPDATE_WORK_ITEM_DESCRIPTION",
            FieldUpdate::Status(_) => "UPDATE_WORK_ITEM_STATUS",
            FieldUpdate::Priority(_) => "UPDATE_WORK_ITEM_PRIORITY",
            FieldUpdate::DueDate(_) => "UPDATE_WORK_ITEM_DUE_DATE",
        }
    }
}

pub async fn update_field(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    id: Uuid,
    update: FieldUpdate,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let before = work_item_repo::find_by_id(tx, id, true)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))?;

    let mut patch = WorkItemPatch::default();
    match &update {
        FieldUpdate::Name(name) => {
            if name.is_empty() || name.chars().count() > 255 {
                return Err(CoreError::validation("name must be 1-255 characters"));
            }
            let siblings =
                work_item_repo::find_children(tx, before.parent_work_item_id, false).await?;
            let shortname = slug::slugify_unique(
                name,
                siblings
                    .iter()
                    .filter(|w| w.work_item_id != id)
                    .map(|w| w.shortname.as_str()),
            );
            patch.name = Some(name.clone());
            patch.shortname = Some(shortname);
        }
        FieldUpdate::Description(description) => {
            if let Some(d) = description {
                if d.chars().count() > 1024 {
                    return Err(CoreError::validation(
                        "description must be at most 1024 characters",
                    ));
                }
            }
            patch.description = Some(description.clone());
        }
        FieldUpdate::Status(status) => patch.status = Some(*status),
        FieldUpdate::Priority(priority) => patch.priority = Some(*priority),
        FieldUpdate::DueDate(due_date) => patch.due_date = Some(*due_date),
    }

    let after = work_item_repo::update_fields(tx, id, &patch, now).await?;

    let step = next_step(
        action_id,
        0,
        StepType::Update,
        "work_items",
        id.to_string(),
        Some(snapshot(&before)),
        Some(snapshot(&after)),
    );

    let description = format!("Updated \"{}\" on \"{}\"", update.action_type(), after.name);
    Ok(MutationOutcome {
        result: after,
        action_type: update.action_type(),
        description,
        steps: vec![step],
    })
}
