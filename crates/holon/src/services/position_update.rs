//! Position Update: reorder siblings via anchor or enum position.

use chrono::{DateTime, Utc};
use holon_core::{CoreError, StepType, WorkItem};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::work_item_repo::{self, WorkItemPatch};
use crate::storage::Tx;

use super::utils::{resolve_order_key, snapshot, MutationOutcome, Position};

async fn require_same_parent(tx: &Tx, target: Uuid, anchor: Uuid) -> Result<WorkItem, CoreError> {
    let target_item = work_item_repo::find_by_id(tx, target, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", target.to_string()))?;
    let anchor_item = work_item_repo::find_by_id(tx, anchor, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", anchor.to_string()))?;
    if target_item.parent_work_item_id != anchor_item.parent_work_item_id {
        return Err(CoreError::validation(
            "move target and anchor must share the same parent",
        ));
    }
    Ok(target_item)
}

async fn apply_move(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    target: Uuid,
    parent_id: Option<Uuid>,
    position: Position,
    action_type: &'static str,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let before = work_item_repo::find_by_id(tx, target, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", target.to_string()))?;

    let order_key = resolve_order_key(tx, parent_id, position).await?;
    let patch = WorkItemPatch {
        order_key: Some(order_key),
        ..Default::default()
    };
    let after = work_item_repo::update_fields(tx, target, &patch, now).await?;

    let step = next_step(
        action_id,
        0,
        StepType::Update,
        "work_items",
        target.to_string(),
        Some(snapshot(&before)),
        Some(snapshot(&after)),
    );

    let description = format!("Moved \"{}\"", after.name);
    Ok(MutationOutcome {
        result: after,
        action_type,
        description,
        steps: vec![step],
    })
}

pub async fn move_item_before(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    target: Uuid,
    anchor: Uuid,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let target_item = require_same_parent(tx, target, anchor).await?;
    apply_move(
        tx,
        action_id,
        now,
        target,
        target_item.parent_work_item_id,
        Position::Before(anchor),
        "MOVE_ITEM_BEFORE",
    )
    .await
}

pub async fn move_item_after(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    target: Uuid,
    anchor: Uuid,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let target_item = require_same_parent(tx, target, anchor).await?;
    apply_move(
        tx,
        action_id,
        now,
        target,
        target_item.parent_work_item_id,
        Position::After(anchor),
        "MOVE_ITEM_AFTER",
    )
    .await
}

pub async fn move_item_to_start(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    target: Uuid,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let target_item = work_item_repo::find_by_id(tx, target, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", target.to_string()))?;
    apply_move(
        tx,
        action_id,
        now,
        target,
        target_item.parent_work_item_id,
        Position::Start,
        "MOVE_ITEM_TO_START",
    )
    .await
}

pub async fn move_item_to_end(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    target: Uuid,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let target_item = work_item_repo::find_by_id(tx, target, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", target.to_string()))?;
    apply_move(
        tx,
        action_id,
        now,
        target,
        target_item.parent_work_item_id,
        Position::End,
        "MOVE_ITEM_TO_END",
    )
    .await
}
