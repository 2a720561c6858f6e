//! Promote to Project.

use chrono::{DateTime, Utc};
use holon_core::{CoreError, Dependency, DependencyType, StepType, WorkItem};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::work_item_repo::WorkItemPatch;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

use super::utils::{resolve_order_key, snapshot, MutationOutcome, Position};

pub async fn promote_to_project(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    id: Uuid,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let before = work_item_repo::find_by_id(tx, id, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))?;

    let Some(prior_parent) = before.parent_work_item_id else {
        return Err(CoreError::validation("work item is already a root project"));
    };

    let order_key = resolve_order_key(tx, None, Position::End).await?;
    let patch = WorkItemPatch {
        parent_work_item_id: Some(None),
        order_key: Some(order_key),
        ..Default::default()
    };
    let after = work_item_repo::update_fields(tx, id, &patch, now).await?;

    let mut steps = vec![next_step(
        action_id,
        0,
        StepType::Update,
        "work_items",
        id.to_string(),
        Some(snapshot(&before)),
        Some(snapshot(&after)),
    )];

    let before_edge = dependency_repo::find_edge(tx, prior_parent, id).await?;
    let after_edge = dependency_repo::upsert_active(tx, prior_parent, id, DependencyType::Linked).await?;
    steps.push(edge_step(action_id, 1, before_edge, &after_edge));

    let description = format!("Promoted \"{}\" to a root project", after.name);
    Ok(MutationOutcome {
        result: after,
        action_type: "PROMOTE_TO_PROJECT",
        description,
        steps,
    })
}

fn edge_step(
    action_id: Uuid,
    step_order: i64,
    before: Option<Dependency>,
    after: &Dependency,
) -> holon_core::UndoStep {
    let record_id = format!("{}:{}", after.work_item_id, after.depends_on_work_item_id);
    let after_json = serde_json::to_value(after).expect("Dependency serializes infallibly");
    match before {
        None => next_step(
            action_id,
            step_order,
            StepType::Insert,
            "work_item_dependencies",
            record_id,
            None,
            Some(after_json),
        ),
        Some(before) => next_step(
            action_id,
            step_order,
            StepType::Update,
            "work_item_dependencies",
            record_id,
            Some(serde_json::to_value(&before).expect("Dependency serializes infallibly")),
            Some(after_json),
        ),
    }
}
