//! History / Undo / Redo.
//!
//! The replay engine is table-driven: `old_data`/`new_data` JSON blobs
//! plus a `step_type` tag are enough to reverse any mutation without the
//! engine knowing anything about work items or dependencies specifically.

use chrono::{DateTime, Utc};
use holon_core::{ActionHistory, CoreError, StepType, UndoStep};
use uuid::Uuid;

use crate::repositories::action_history_repo::{self, next_step};
use crate::storage::{Params, Tx};

use super::utils::MutationOutcome;

fn record_where(table: &str, record_id: &str) -> Result<(String, Params), CoreError> {
    let mut params = Params::new();
    match table {
        "work_items" | "action_history" => {
            let column = if table == "work_items" { "work_item_id" } else { "action_id" };
            params.insert("rid".into(), rusqlite::types::Value::Text(record_id.to_string()));
            Ok((format!("{column} = $rid"), params))
        }
        "work_item_dependencies" => {
            let (from, to) = record_id
                .split_once(':')
                .ok_or_else(|| CoreError::internal("malformed dependency record_id"))?;
            params.insert("from".into(), rusqlite::types::Value::Text(from.to_string()));
            params.insert("to".into(), rusqlite::types::Value::Text(to.to_string()));
            Ok((
                "work_item_id = $from AND depends_on_work_item_id = $to".to_string(),
                params,
            ))
        }
        other => Err(CoreError::internal(format!(
            "undo replay: unsupported table {other}"
        ))),
    }
}

fn json_to_sql(value: &serde_json::Value) -> Result<rusqlite::types::Value, CoreError> {
    use rusqlite::types::Value as SqlValue;
    Ok(match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                return Err(CoreError::internal("number snapshot out of range"));
            }
        }
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        other => {
            return Err(CoreError::internal(format!(
                "undo replay: unsupported snapshot value {other}"
            )))
        }
    })
}

async fn delete_row(tx: &Tx, table: &str, record_id: &str) -> Result<(), CoreError> {
    let (where_clause, params) = record_where(table, record_id)?;
    tx.execute(&format!("DELETE FROM {table} WHERE {where_clause}"), params)
        .await?;
    Ok(())
}

async fn set_row_to(
    tx: &Tx,
    table: &str,
    record_id: &str,
    data: &serde_json::Value,
) -> Result<(), CoreError> {
    let obj = data
        .as_object()
        .ok_or_else(|| CoreError::internal("undo replay: snapshot is not an object"))?;
    let mut sets = Vec::new();
    let mut params = Params::new();
    for (idx, (column, value)) in obj.iter().enumerate() {
        let placeholder = format!("v{idx}");
        sets.push(format!("{column} = ${placeholder}"));
        params.insert(placeholder, json_to_sql(value)?);
    }
    let (where_clause, where_params) = record_where(table, record_id)?;
    params.extend(where_params);
    let sql = format!("UPDATE {table} SET {} WHERE {where_clause}", sets.join(", "));
    tx.execute(&sql, params).await?;
    Ok(())
}

async fn insert_row(tx: &Tx, table: &str, data: &serde_json::Value) -> Result<(), CoreError> {
    let obj = data
        .as_object()
        .ok_or_else(|| CoreError::internal("undo replay: snapshot is not an object"))?;
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Params::new();
    for (idx, (column, value)) in obj.iter().enumerate() {
        let placeholder = format!("v{idx}");
        columns.push(column.clone());
        placeholders.push(format!("${placeholder}"));
        params.insert(placeholder, json_to_sql(value)?);
    }
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    tx.execute(&sql, params).await?;
    Ok(())
}

/// Apply the reverse mutation a step describes: `INSERT` deletes the row,
/// `UPDATE` restores `old_data`, `DELETE` re-inserts `old_data`.
async fn replay_step(tx: &Tx, step: &UndoStep) -> Result<(), CoreError> {
    match step.step_type {
        StepType::Insert => delete_row(tx, &step.table_name, &step.record_id).await,
        StepType::Update => {
            let data = step
                .old_data
                .clone()
                .ok_or_else(|| CoreError::internal("UPDATE step missing old_data"))?;
            set_row_to(tx, &step.table_name, &step.record_id, &data).await
        }
        StepType::Delete => {
            let data = step
                .old_data
                .clone()
                .ok_or_else(|| CoreError::internal("DELETE step missing old_data"))?;
            insert_row(tx, &step.table_name, &data).await
        }
    }
}

/// Describe, as a fresh `UndoStep`, the mutation `replay_step` just
/// performed — so that replaying *this* step later reproduces the
/// original forward mutation (undo of an undo is a redo).
fn mirror_step(action_id: Uuid, step_order: i64, step: &UndoStep) -> UndoStep {
    match step.step_type {
        StepType::Insert => next_step(
            action_id,
            step_order,
            StepType::Delete,
            step.table_name.clone(),
            step.record_id.clone(),
            step.new_data.clone(),
            None,
        ),
        StepType::Update => next_step(
            action_id,
            step_order,
            StepType::Update,
            step.table_name.clone(),
            step.record_id.clone(),
            step.new_data.clone(),
            step.old_data.clone(),
        ),
        StepType::Delete => next_step(
            action_id,
            step_order,
            StepType::Insert,
            step.table_name.clone(),
            step.record_id.clone(),
            None,
            step.old_data.clone(),
        ),
    }
}

async fn replay_in_reverse(
    tx: &Tx,
    mirror_action_id: Uuid,
    steps: &[UndoStep],
) -> Result<Vec<UndoStep>, CoreError> {
    let mut mirrored = Vec::with_capacity(steps.len());
    let mut order = 0i64;
    for step in steps.iter().rev() {
        replay_step(tx, step).await?;
        mirrored.push(mirror_step(mirror_action_id, order, step));
        order += 1;
    }
    Ok(mirrored)
}

pub async fn undo_last_action(
    tx: &Tx,
    undo_action_id: Uuid,
    _now: DateTime<Utc>,
) -> Result<Option<MutationOutcome<ActionHistory>>, CoreError> {
    let Some(target) = action_history_repo::find_last_undoable(tx).await? else {
        return Ok(None);
    };
    let steps = action_history_repo::find_steps(tx, target.action_id).await?;
    let mirrored = replay_in_reverse(tx, undo_action_id, &steps).await?;
    action_history_repo::mark_undone(tx, target.action_id, undo_action_id).await?;

    let description = format!("Undid \"{}\"", target.description);
    Ok(Some(MutationOutcome {
        result: target,
        action_type: "UNDO_ACTION",
        description,
        steps: mirrored,
    }))
}

pub async fn redo_last_undo(
    tx: &Tx,
    redo_action_id: Uuid,
    _now: DateTime<Utc>,
) -> Result<Option<MutationOutcome<ActionHistory>>, CoreError> {
    let Some(undo_action) = action_history_repo::find_last_redoable(tx).await? else {
        return Ok(None);
    };
    let original = action_history_repo::find_target_of_undo(tx, undo_action.action_id)
        .await?
        .ok_or_else(|| CoreError::internal("redoable UNDO_ACTION has no target"))?;

    let steps = action_history_repo::find_steps(tx, undo_action.action_id).await?;
    let mirrored = replay_in_reverse(tx, redo_action_id, &steps).await?;
    action_history_repo::clear_undone(tx, original.action_id).await?;

    let description = format!("Redid \"{}\"", original.description);
    Ok(Some(MutationOutcome {
        result: original,
        action_type: "REDO_ACTION",
        description,
        steps: mirrored,
    }))
}

pub async fn list_history(
    tx: &Tx,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<ActionHistory>, CoreError> {
    if limit == 0 || limit > 1000 {
        return Err(CoreError::validation("limit must be between 1 and 1000"));
    }
    action_history_repo::list_recent_actions(tx, start_date, end_date, limit).await
}
