//! Row <-> domain-type conversions shared by the three repositories.
//!
//! Kept table-driven and free of SQL generation, so tests can build rows
//! by hand without going through the storage layer. Errors here map to
//! `CoreError::Internal` because a malformed row means corrupted
//! storage, not a caller mistake.

use chrono::{DateTime, Utc};
use holon_core::{ActionHistory, CoreError, Dependency, DependencyType, Priority, Status, StepType, UndoStep, WorkItem};
use rusqlite::types::Value as SqlValue;
use uuid::Uuid;

use crate::storage::{Params, Row};

pub fn get_text(row: &Row, key: &str) -> Result<String, CoreError> {
    match row.get(key) {
        Some(SqlValue::Text(s)) => Ok(s.clone()),
        other => Err(CoreError::internal(format!(
            "column {key} is not text: {other:?}"
        ))),
    }
}

pub fn get_opt_text(row: &Row, key: &str) -> Result<Option<String>, CoreError> {
    match row.get(key) {
        None | Some(SqlValue::Null) => Ok(None),
        Some(SqlValue::Text(s)) => Ok(Some(s.clone())),
        other => Err(CoreError::internal(format!(
            "column {key} is not text or null: {other:?}"
        ))),
    }
}

pub fn get_bool(row: &Row, key: &str) -> Result<bool, CoreError> {
    match row.get(key) {
        Some(SqlValue::Integer(i)) => Ok(*i != 0),
        other => Err(CoreError::internal(format!(
            "column {key} is not an integer: {other:?}"
        ))),
    }
}

pub fn get_uuid(row: &Row, key: &str) -> Result<Uuid, CoreError> {
    let raw = get_text(row, key)?;
    Uuid::parse_str(&raw).map_err(|e| CoreError::internal(format!("column {key} is not a uuid: {e}")))
}

pub fn get_opt_uuid(row: &Row, key: &str) -> Result<Option<Uuid>, CoreError> {
    match get_opt_text(row, key)? {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::internal(format!("column {key} is not a uuid: {e}"))),
    }
}

pub fn get_timestamp(row: &Row, key: &str) -> Result<DateTime<Utc>, CoreError> {
    let raw = get_text(row, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::internal(format!("column {key} is not an RFC3339 timestamp: {e}")))
}

pub fn get_opt_timestamp(row: &Row, key: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
    match get_opt_text(row, key)? {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| CoreError::internal(format!("column {key} is not an RFC3339 timestamp: {e}"))),
    }
}

pub fn get_opt_json(row: &Row, key: &str) -> Result<Option<serde_json::Value>, CoreError> {
    match get_opt_text(row, key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::internal(format!("column {key} is not valid json: {e}"))),
    }
}

pub fn text_param(value: impl Into<String>) -> SqlValue {
    SqlValue::Text(value.into())
}

pub fn opt_text_param(value: Option<impl Into<String>>) -> SqlValue {
    match value {
        Some(v) => SqlValue::Text(v.into()),
        None => SqlValue::Null,
    }
}

pub fn bool_param(value: bool) -> SqlValue {
    SqlValue::Integer(if value { 1 } else { 0 })
}

pub fn timestamp_param(value: DateTime<Utc>) -> SqlValue {
    SqlValue::Text(value.to_rfc3339())
}

pub fn opt_timestamp_param(value: Option<DateTime<Utc>>) -> SqlValue {
    match value {
        Some(v) => SqlValue::Text(v.to_rfc3339()),
        None => SqlValue::Null,
    }
}

pub fn opt_json_param(value: &Option<serde_json::Value>) -> SqlValue {
    match value {
        Some(v) => SqlValue::Text(v.to_string()),
        None => SqlValue::Null,
    }
}

pub fn row_to_work_item(row: &Row) -> Result<WorkItem, CoreError> {
    Ok(WorkItem {
        work_item_id: get_uuid(row, "work_item_id")?,
        parent_work_item_id: get_opt_uuid(row, "parent_work_item_id")?,
        name: get_text(row, "name")?,
        description: get_opt_text(row, "description")?,
        status: Status::parse(&get_text(row, "status")?)
            .ok_or_else(|| CoreError::internal("unrecognized status"))?,
        priority: Priority::parse(&get_text(row, "priority")?)
            .ok_or_else(|| CoreError::internal("unrecognized priority"))?,
        due_date: get_opt_timestamp(row, "due_date")?,
        order_key: get_text(row, "order_key")?,
        shortname: get_text(row, "shortname")?,
        is_active: get_bool(row, "is_active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

pub fn work_item_insert_params(item: &WorkItem) -> Params {
    let mut p = Params::new();
    p.insert("work_item_id".into(), text_param(item.work_item_id.to_string()));
    p.insert(
        "parent_work_item_id".into(),
        opt_text_param(item.parent_work_item_id.map(|id| id.to_string())),
    );
    p.insert("name".into(), text_param(item.name.clone()));
    p.insert("description".into(), opt_text_param(item.description.clone()));
    p.insert("status".into(), text_param(item.status.as_str()));
    p.insert("priority".into(), text_param(item.priority.as_str()));
    p.insert("due_date".into(), opt_timestamp_param(item.due_date));
    p.insert("order_key".into(), text_param(item.order_key.clone()));
    p.insert("shortname".into(), text_param(item.shortname.clone()));
    p.insert("is_active".into(), bool_param(item.is_active));
    p.insert("created_at".into(), timestamp_param(item.created_at));
    p.insert("updated_at".into(), timestamp_param(item.updated_at));
    p
}

pub fn row_to_dependency(row: &Row) -> Result<Dependency, CoreError> {
    Ok(Dependency {
        work_item_id: get_uuid(row, "work_item_id")?,
        depends_on_work_item_id: get_uuid(row, "depends_on_work_item_id")?,
        dependency_type: DependencyType::parse(&get_text(row, "dependency_type")?)
            .ok_or_else(|| CoreError::internal("unrecognized dependency_type"))?,
        is_active: get_bool(row, "is_active")?,
    })
}

pub fn row_to_action_history(row: &Row) -> Result<ActionHistory, CoreError> {
    Ok(ActionHistory {
        action_id: get_uuid(row, "action_id")?,
        action_type: get_text(row, "action_type")?,
        timestamp: get_timestamp(row, "timestamp")?,
        description: get_text(row, "description")?,
        is_undone: get_bool(row, "is_undone")?,
        undone_at_action_id: get_opt_uuid(row, "undone_at_action_id")?,
    })
}

pub fn row_to_undo_step(row: &Row) -> Result<UndoStep, CoreError> {
    let step_order = match row.get("step_order") {
        Some(SqlValue::Integer(i)) => *i,
        other => return Err(CoreError::internal(format!("step_order is not an integer: {other:?}"))),
    };
    Ok(UndoStep {
        action_id: get_uuid(row, "action_id")?,
        step_order,
        step_type: StepType::parse(&get_text(row, "step_type")?)
            .ok_or_else(|| CoreError::internal("unrecognized step_type"))?,
        table_name: get_text(row, "table_name")?,
        record_id: get_text(row, "record_id")?,
        old_data: get_opt_json(row, "old_data")?,
        new_data: get_opt_json(row, "new_data")?,
    })
}
