//! Typed CRUD and query primitives for `work_items`.
//!
//! Tree traversal is SQL-backed recursive descent, one level per round
//! trip, rather than an in-memory walk. Every write takes a `&Tx` so it
//! participates in the orchestrator's single transaction.

use chrono::{DateTime, Utc};
use holon_core::{CoreError, Priority, Status, WorkItem};
use uuid::Uuid;

use crate::repositories::convert::{
    bool_param, opt_text_param, opt_timestamp_param, row_to_work_item, text_param,
    timestamp_param, work_item_insert_params,
};
use crate::storage::{Params, Tx};

/// Patch for `updateFields`; `None` means "leave unchanged", `Some(None)`
/// on the nullable fields means "clear to null".
#[derive(Debug, Default, Clone)]
pub struct WorkItemPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub shortname: Option<String>,
    pub order_key: Option<String>,
    pub parent_work_item_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub parent_id: Option<Option<Uuid>>,
    pub roots_only: bool,
    pub status: Option<Status>,
    pub is_active: Option<bool>,
}

pub async fn create(tx: &Tx, item: &WorkItem) -> Result<(), CoreError> {
    let params = work_item_insert_params(item);
    tx.execute(
        "INSERT INTO work_items (work_item_id, parent_work_item_id, name, description, status, \
         priority, due_date, order_key, shortname, is_active, created_at, updated_at) VALUES \
         ($work_item_id, $parent_work_item_id, $name, $description, $status, $priority, \
         $due_date, $order_key, $shortname, $is_active, $created_at, $updated_at)",
        params,
    )
    .await?;
    Ok(())
}

pub async fn find_by_id(
    tx: &Tx,
    id: Uuid,
    include_inactive: bool,
) -> Result<Option<WorkItem>, CoreError> {
    let mut sql = "SELECT * FROM work_items WHERE work_item_id = $id".to_string();
    if !include_inactive {
        sql.push_str(" AND is_active = 1");
    }
    let mut params = Params::new();
    params.insert("id".into(), text_param(id.to_string()));
    let rows = tx.query(&sql, params).await?;
    rows.first().map(row_to_work_item).transpose()
}

pub async fn list(tx: &Tx, filter: &ListFilter) -> Result<Vec<WorkItem>, CoreError> {
    let mut clauses = Vec::new();
    let mut params = Params::new();

    if filter.roots_only {
        clauses.push("parent_work_item_id IS NULL".to_string());
    } else if let Some(parent) = &filter.parent_id {
        match parent {
            Some(id) => {
                clauses.push("parent_work_item_id = $parent_id".to_string());
                params.insert("parent_id".into(), text_param(id.to_string()));
            }
            None => clauses.push("parent_work_item_id IS NULL".to_string()),
        }
    }

    if let Some(status) = filter.status {
        clauses.push("status = $status".to_string());
        params.insert("status".into(), text_param(status.as_str()));
    }

    match filter.is_active {
        Some(active) => {
            clauses.push("is_active = $is_active".to_string());
            params.insert("is_active".into(), bool_param(active));
        }
        None => clauses.push("is_active = 1".to_string()),
    }

    let mut sql = "SELECT * FROM work_items".to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY order_key");

    let rows = tx.query(&sql, params).await?;
    rows.iter().map(row_to_work_item).collect()
}

pub async fn find_children(
    tx: &Tx,
    parent_id: Option<Uuid>,
    include_inactive: bool,
) -> Result<Vec<WorkItem>, CoreError> {
    list(
        tx,
        &ListFilter {
            parent_id: Some(parent_id),
            roots_only: false,
            status: None,
            is_active: if include_inactive { None } else { Some(true) },
        },
    )
    .await
}

/// Recursive descent bounded by `max_depth` (root is depth 0).
pub async fn find_descendants(
    tx: &Tx,
    root_id: Uuid,
    max_depth: usize,
    include_inactive: bool,
) -> Result<Vec<WorkItem>, CoreError> {
    let mut out = Vec::new();
    let mut frontier = vec![root_id];
    let mut depth = 0;
    while !frontier.is_empty() && depth < max_depth {
        let mut next_frontier = Vec::new();
        for parent in frontier {
            let children = find_children(tx, Some(parent), include_inactive).await?;
            for child in children {
                next_frontier.push(child.work_item_id);
                out.push(child);
            }
        }
        frontier = next_frontier;
        depth += 1;
    }
    Ok(out)
}

pub async fn update_fields(
    tx: &Tx,
    id: Uuid,
    patch: &WorkItemPatch,
    now: DateTime<Utc>,
) -> Result<WorkItem, CoreError> {
    let mut sets = Vec::new();
    let mut params = Params::new();

    if let Some(name) = &patch.name {
        sets.push("name = $name");
        params.insert("name".into(), text_param(name.clone()));
    }
    if let Some(description) = &patch.description {
        sets.push("description = $description");
        params.insert("description".into(), opt_text_param(description.clone()));
    }
    if let Some(status) = patch.status {
        sets.push("status = $status");
        params.insert("status".into(), text_param(status.as_str()));
    }
    if let Some(priority) = patch.priority {
        sets.push("priority = $priority");
        params.insert("priority".into(), text_param(priority.as_str()));
    }
    if let Some(due_date) = patch.due_date {
        sets.push("due_date = $due_date");
        params.insert("due_date".into(), opt_timestamp_param(due_date));
    }
    if let Some(shortname) = &patch.shortname {
        sets.push("shortname = $shortname");
        params.insert("shortname".into(), text_param(shortname.clone()));
    }
    if let Some(order_key) = &patch.order_key {
        sets.push("order_key = $order_key");
        params.insert("order_key".into(), text_param(order_key.clone()));
    }
    if let Some(parent) = patch.parent_work_item_id {
        sets.push("parent_work_item_id = $parent_work_item_id");
        params.insert(
            "parent_work_item_id".into(),
            opt_text_param(parent.map(|id| id.to_string())),
        );
    }
    if let Some(is_active) = patch.is_active {
        sets.push("is_active = $is_active");
        params.insert("is_active".into(), bool_param(is_active));
    }

    if sets.is_empty() {
        return find_by_id(tx, id, true)
            .await?
            .ok_or_else(|| CoreError::not_found("work_item", id.to_string()));
    }

    sets.push("updated_at = $updated_at");
    params.insert("updated_at".into(), timestamp_param(now));
    params.insert("id".into(), text_param(id.to_string()));

    let sql = format!(
        "UPDATE work_items SET {} WHERE work_item_id = $id",
        sets.join(", ")
    );
    let affected = tx.execute(&sql, params).await?;
    if affected == 0 {
        return Err(CoreError::not_found("work_item", id.to_string()));
    }

    find_by_id(tx, id, true)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))
}

/// Flip `is_active = false` on `root_id` and every active descendant.
/// Returns the full set of rows as they were *before* the flip, deepest
/// descendants last, so the caller can synthesize undo steps in the
/// "dependencies before items, items deepest-first" order undo replay
/// requires.
pub async fn soft_delete_subtree(tx: &Tx, root_id: Uuid) -> Result<Vec<WorkItem>, CoreError> {
    let mut affected = Vec::new();
    if let Some(root) = find_by_id(tx, root_id, false).await? {
        affected.push(root);
    } else {
        return Ok(affected);
    }
    affected.extend(find_descendants(tx, root_id, usize::MAX, false).await?);

    for item in &affected {
        let mut params = Params::new();
        params.insert("id".into(), text_param(item.work_item_id.to_string()));
        tx.execute(
            "UPDATE work_items SET is_active = 0 WHERE work_item_id = $id",
            params,
        )
        .await?;
    }

    Ok(affected)
}

/// Administrative rebalance escape hatch: regenerate evenly spaced `order_key`s for every active child of
/// `parent_id`, preserving their current relative order. Not on the hot
/// insert/move path; intended for operational use when bisection depth
/// grows large enough to warrant a reset.
pub async fn rebalance_siblings(tx: &Tx, parent_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Vec<WorkItem>, CoreError> {
    let siblings = find_children(tx, parent_id, false).await?;
    let keys = holon_core::ordering::rebalance_keys(siblings.len())?;

    let mut rebalanced = Vec::with_capacity(siblings.len());
    for (sibling, key) in siblings.into_iter().zip(keys) {
        let patch = WorkItemPatch {
            order_key: Some(key),
            ..Default::default()
        };
        rebalanced.push(update_fields(tx, sibling.work_item_id, &patch, now).await?);
    }
    Ok(rebalanced)
}

pub async fn restore(tx: &Tx, ids: &[Uuid]) -> Result<(), CoreError> {
    for id in ids {
        let mut params = Params::new();
        params.insert("id".into(), text_param(id.to_string()));
        tx.execute(
            "UPDATE work_items SET is_active = 1 WHERE work_item_id = $id",
            params,
        )
        .await?;
    }
    Ok(())
}
