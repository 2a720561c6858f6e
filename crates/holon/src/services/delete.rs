//! Delete / Soft Delete.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use holon_core::{CoreError, StepType};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

use super::utils::{snapshot, MutationOutcome};

pub async fn delete_work_items(
    tx: &Tx,
    action_id: Uuid,
    _now: DateTime<Utc>,
    ids: Vec<Uuid>,
) -> Result<MutationOutcome<usize>, CoreError> {
    if ids.is_empty() {
        return Err(CoreError::validation("delete_work_items requires at least 1 id"));
    }
    if ids.len() > 100 {
        return Err(CoreError::validation("delete_work_items accepts at most 100 ids"));
    }

    let mut affected_ids = HashSet::new();
    let mut affected_items = Vec::new();
    for id in &ids {
        let subtree = work_item_repo::soft_delete_subtree(tx, *id).await?;
        for item in subtree {
            if affected_ids.insert(item.work_item_id) {
                affected_items.push(item);
            }
        }
    }
    // soft_delete_subtree appends shallowest-first; reverse for "items deepest-first".
    affected_items.reverse();

    let touched_deps = dependency_repo::deactivate_touching(tx, &affected_ids).await?;

    let mut steps = Vec::new();
    let mut step_order = 0i64;
    for dep in &touched_deps {
        let mut after = dep.clone();
        after.is_active = false;
        steps.push(next_step(
            action_id,
            step_order,
            StepType::Update,
            "work_item_dependencies",
            format!("{}:{}", dep.work_item_id, dep.depends_on_work_item_id),
            Some(serde_json::to_value(dep).expect("Dependency serializes infallibly")),
            Some(serde_json::to_value(&after).expect("Dependency serializes infallibly")),
        ));
        step_order += 1;
    }
    for item in &affected_items {
        let mut after = item.clone();
        after.is_active = false;
        steps.push(next_step(
            action_id,
            step_order,
            StepType::Update,
            "work_items",
            item.work_item_id.to_string(),
            Some(snapshot(item)),
            Some(snapshot(&after)),
        ));
        step_order += 1;
    }

    let count = affected_items.len();
    let description = format!("Deleted {count} work item(s)");
    Ok(MutationOutcome {
        result: count,
        action_type: "DELETE_WORK_ITEMS",
        description,
        steps,
    })
}
