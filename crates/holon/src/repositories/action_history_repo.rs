//! `action_history` / `undo_steps` CRUD.
//!
//! Append-only, status-flip-not-delete discipline, with a
//! `last_insert_rowid()`-adjacent pattern for fetching a just-written row.
//! One `ActionHistory` row carries an arbitrary number of ordered
//! `UndoStep` children rather than a single opaque operation/inverse pair.

use chrono::{DateTime, Utc};
use holon_core::{ActionHistory, CoreError, StepType, UndoStep};
use uuid::Uuid;

use crate::repositories::convert::{
    opt_json_param, row_to_action_history, row_to_undo_step, text_param, timestamp_param,
};
use crate::storage::{Params, Tx};

pub async fn create_action(
    tx: &Tx,
    action_id: Uuid,
    action_type: &str,
    description: &str,
    timestamp: DateTime<Utc>,
) -> Result<ActionHistory, CoreError> {
    let mut params = Params::new();
    params.insert("action_id".into(), text_param(action_id.to_string()));
    params.insert("action_type".into(), text_param(action_type));
    params.insert("description".into(), text_param(description));
    params.insert("timestamp".into(), timestamp_param(timestamp));
    tx.execute(
        "INSERT INTO action_history (action_id, action_type, timestamp, description, \
         is_undone, undone_at_action_id) VALUES ($action_id, $action_type, $timestamp, \
         $description, 0, NULL)",
        params,
    )
    .await?;

    Ok(ActionHistory {
        action_id,
        action_type: action_type.to_string(),
        timestamp,
        description: description.to_string(),
        is_undone: false,
        undone_at_action_id: None,
    })
}

pub async fn append_step(tx: &Tx, step: &UndoStep) -> Result<(), CoreError> {
    let mut params = Params::new();
    params.insert("action_id".into(), text_param(step.action_id.to_string()));
    params.insert(
        "step_order".into(),
        rusqlite::types::Value::Integer(step.step_order),
    );
    params.insert("step_type".into(), text_param(step.step_type.as_str()));
    params.insert("table_name".into(), text_param(step.table_name.clone()));
    params.insert("record_id".into(), text_param(step.record_id.clone()));
    params.insert("old_data".into(), opt_json_param(&step.old_data));
    params.insert("new_data".into(), opt_json_param(&step.new_data));
    tx.execute(
        "INSERT INTO undo_steps (action_id, step_order, step_type, table_name, record_id, \
         old_data, new_data) VALUES ($action_id, $step_order, $step_type, $table_name, \
         $record_id, $old_data, $new_data)",
        params,
    )
    .await?;
    Ok(())
}

pub async fn find_action_by_id(tx: &Tx, action_id: Uuid) -> Result<Option<ActionHistory>, CoreError> {
    let mut params = Params::new();
    params.insert("id".into(), text_param(action_id.to_string()));
    let rows = tx
        .query("SELECT * FROM action_history WHERE action_id = $id", params)
        .await?;
    rows.first().map(row_to_action_history).transpose()
}

/// Steps for `action_id`, ascending by `step_order`.
pub async fn find_steps(tx: &Tx, action_id: Uuid) -> Result<Vec<UndoStep>, CoreError> {
    let mut params = Params::new();
    params.insert("id".into(), text_param(action_id.to_string()));
    let rows = tx
        .query(
            "SELECT * FROM undo_steps WHERE action_id = $id ORDER BY step_order",
            params,
        )
        .await?;
    rows.iter().map(row_to_undo_step).collect()
}

pub async fn list_recent_actions(
    tx: &Tx,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<ActionHistory>, CoreError> {
    let mut clauses = Vec::new();
    let mut params = Params::new();

    if let Some(start) = start_date {
        clauses.push("timestamp >= $start".to_string());
        params.insert("start".into(), timestamp_param(start));
    }
    if let Some(end) = end_date {
        clauses.push("timestamp <= $end".to_string());
        params.insert("end".into(), timestamp_param(end));
    }

    let mut sql = "SELECT * FROM action_history".to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY timestamp DESC LIMIT {limit}"));

    let rows = tx.query(&sql, params).await?;
    rows.iter().map(row_to_action_history).collect()
}

/// Most recent action eligible for `undo_last_action`: not itself an
/// `UNDO_ACTION`/`REDO_ACTION`, and not already undone.
pub async fn find_last_undoable(tx: &Tx) -> Result<Option<ActionHistory>, CoreError> {
    let rows = tx
        .query(
            "SELECT * FROM action_history WHERE is_undone = 0 AND action_type NOT IN \
             ('UNDO_ACTION', 'REDO_ACTION') ORDER BY timestamp DESC LIMIT 1",
            Params::new(),
        )
        .await?;
    rows.first().map(row_to_action_history).transpose()
}

/// The action, if any, that `undo_action_id` marked undone.
pub async fn find_target_of_undo(
    tx: &Tx,
    undo_action_id: Uuid,
) -> Result<Option<ActionHistory>, CoreError> {
    let mut params = Params::new();
    params.insert("id".into(), text_param(undo_action_id.to_string()));
    let rows = tx
        .query(
            "SELECT * FROM action_history WHERE undone_at_action_id = $id",
            params,
        )
        .await?;
    rows.first().map(row_to_action_history).transpose()
}

/// The most recent `action_history` row overall, if it is an `UNDO_ACTION`
/// whose target is still undone (i.e. has not itself been redone). Any
/// other mutation landing after the undo — including one unrelated to
/// it — invalidates it as a redo candidate, so this only ever looks at
/// the single latest row, never merely the latest `UNDO_ACTION` row.
pub async fn find_last_redoable(tx: &Tx) -> Result<Option<ActionHistory>, CoreError> {
    let rows = tx
        .query(
            "SELECT * FROM action_history ORDER BY timestamp DESC LIMIT 1",
            Params::new(),
        )
        .await?;
    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let last_action = row_to_action_history(row)?;
    if last_action.action_type != "UNDO_ACTION" {
        return Ok(None);
    }

    // The undo action's target must still be marked undone; a prior redo
    // would have cleared this without inserting a new UNDO_ACTION row.
    if find_target_of_undo(tx, last_action.action_id).await?.is_none() {
        return Ok(None);
    }

    Ok(Some(last_action))
}

pub async fn mark_undone(tx: &Tx, action_id: Uuid, by_action_id: Uuid) -> Result<(), CoreError> {
    let mut params = Params::new();
    params.insert("id".into(), text_param(action_id.to_string()));
    params.insert("by".into(), text_param(by_action_id.to_string()));
    tx.execute(
        "UPDATE action_history SET is_undone = 1, undone_at_action_id = $by WHERE action_id = $id",
        params,
    )
    .await?;
    Ok(())
}

pub async fn clear_undone(tx: &Tx, action_id: Uuid) -> Result<(), CoreError> {
    let mut params = Params::new();
    params.insert("id".into(), text_param(action_id.to_string()));
    tx.execute(
        "UPDATE action_history SET is_undone = 0, undone_at_action_id = NULL WHERE action_id = $id",
        params,
    )
    .await?;
    Ok(())
}

pub fn next_step(action_id: Uuid, step_order: i64, step_type: StepType, table_name: impl Into<String>, record_id: impl Into<String>, old_data: Option<serde_json::Value>, new_data: Option<serde_json::Value>) -> UndoStep {
    UndoStep {
        action_id,
        step_order,
        step_type,
        table_name: table_name.into(),
        record_id: record_id.into(),
        old_data,
        new_data,
    }
}
