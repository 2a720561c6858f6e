//! Shared helpers for the domain-service fan-out: position resolution
//! against the ordering utility, and the `MutationOutcome` shape every
//! service function returns so the orchestrator can record history
//! uniformly. Each service is a plain module of functions sharing a
//! common orchestrator context, not an inheritance hierarchy.

use holon_core::{ordering, CoreError, UndoStep, WorkItem};
use uuid::Uuid;

use crate::repositories::work_item_repo;
use crate::storage::Tx;

/// Where to insert relative to existing active siblings.
#[derive(Debug, Clone, Copy)]
pub enum Position {
    Start,
    End,
    After(Uuid),
    Before(Uuid),
}

impl Default for Position {
    fn default() -> Self {
        Position::End
    }
}

/// Result of a domain-service call: the value to return to the caller,
/// plus everything the orchestrator needs to persist one `ActionHistory`
/// row and its `UndoStep`s.
pub struct MutationOutcome<T> {
    pub result: T,
    pub action_type: &'static str,
    pub description: String,
    pub steps: Vec<UndoStep>,
}

/// Compute the `order_key` for inserting at `position` among the active
/// children of `parent_id`.
pub async fn resolve_order_key(
    tx: &Tx,
    parent_id: Option<Uuid>,
    position: Position,
) -> Result<String, CoreError> {
    let siblings = work_item_repo::find_children(tx, parent_id, false).await?;
    let (before, after) = match position {
        Position::Start => (None, siblings.first().map(|w| w.order_key.clone())),
        Position::End => (siblings.last().map(|w| w.order_key.clone()), None),
        Position::After(anchor) => {
            let idx = sibling_index(&siblings, anchor)?;
            let after = siblings.get(idx + 1).map(|w| w.order_key.clone());
            (Some(siblings[idx].order_key.clone()), after)
        }
        Position::Before(anchor) => {
            let idx = sibling_index(&siblings, anchor)?;
            let before = if idx == 0 {
                None
            } else {
                siblings.get(idx - 1).map(|w| w.order_key.clone())
            };
            (before, Some(siblings[idx].order_key.clone()))
        }
    };
    ordering::gen_key_between(before.as_deref(), after.as_deref())
}

fn sibling_index(siblings: &[WorkItem], anchor: Uuid) -> Result<usize, CoreError> {
    siblings
        .iter()
        .position(|w| w.work_item_id == anchor)
        .ok_or_else(|| CoreError::not_found("work_item", anchor.to_string()))
}

pub fn snapshot(item: &WorkItem) -> serde_json::Value {
    serde_json::to_value(item).expect("WorkItem serializes infallibly")
}
