//! Add Work Item.

use chrono::{DateTime, Utc};
use holon_core::{slug, CoreError, DependencyType, Priority, Status, StepType, WorkItem};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

use super::utils::{resolve_order_key, snapshot, MutationOutcome, Position};

#[derive(Debug, Default, Clone)]
pub struct AddWorkItemInput {
    pub parent: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<(Uuid, DependencyType)>,
    pub position: Position,
}

pub async fn add_work_item(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    input: AddWorkItemInput,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    if input.name.is_empty() || input.name.chars().count() > 255 {
        return Err(CoreError::validation("name must be 1-255 characters"));
    }
    if let Some(description) = &input.description {
        if description.chars().count() > 1024 {
            return Err(CoreError::validation("description must be at most 1024 characters"));
        }
    }

    if let Some(parent_id) = input.parent {
        work_item_repo::find_by_id(tx, parent_id, false)
            .await?
            .ok_or_else(|| CoreError::not_found("work_item", parent_id.to_string()))?;
    }

    let order_key = resolve_order_key(tx, input.parent, input.position).await?;
    let siblings = work_item_repo::find_children(tx, input.parent, false).await?;
    let shortname = slug::slugify_unique(
        &input.name,
        siblings.iter().map(|w| w.shortname.as_str()),
    );

    let item = WorkItem {
        work_item_id: Uuid::new_v4(),
        parent_work_item_id: input.parent,
        name: input.name,
        description: input.description,
        status: input.status.unwrap_or(Status::Todo),
        priority: input.priority.unwrap_or(Priority::Medium),
        due_date: input.due_date,
        order_key,
        shortname,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    work_item_repo::create(tx, &item).await?;

    let mut steps = vec![next_step(
        action_id,
        0,
        StepType::Insert,
        "work_items",
        item.work_item_id.to_string(),
        None,
        Some(snapshot(&item)),
    )];

    let mut step_order = 1;
    for (depends_on, dependency_type) in &input.dependencies {
        if *depends_on == item.work_item_id {
            return Err(CoreError::validation("a work item cannot depend on itself"));
        }
        if *dependency_type == DependencyType::FinishToStart
            && dependency_repo::would_create_cycle(tx, item.work_item_id, *depends_on).await?
        {
            return Err(CoreError::validation(format!(
                "cycle: {} already reaches {} via finish-to-start edges",
                depends_on, item.work_item_id
            )));
        }
        work_item_repo::find_by_id(tx, *depends_on, false)
            .await?
            .ok_or_else(|| CoreError::not_found("work_item", depends_on.to_string()))?;

        let dep = dependency_repo::upsert_active(tx, item.work_item_id, *depends_on, *dependency_type).await?;
        steps.push(next_step(
            action_id,
            step_order,
            StepType::Insert,
            "work_item_dependencies",
            format!("{}:{}", dep.work_item_id, dep.depends_on_work_item_id),
            None,
            Some(serde_json::to_value(&dep).expect("Dependency serializes infallibly")),
        ));
        step_order += 1;
    }

    let description = format!("Added work item \"{}\"", item.name);
    Ok(MutationOutcome {
        result: item,
        action_type: "ADD_WORK_ITEM",
        description,
        steps,
    })
}
