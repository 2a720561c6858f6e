//! Idempotent schema migration, run once at `WorkItemService::connect`.
//!
//! Plain `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS`
//! statements issued at startup rather than a separate migration tool.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS work_items (
    work_item_id TEXT PRIMARY KEY,
    parent_work_item_id TEXT NULL REFERENCES work_items(work_item_id),
    name TEXT NOT NULL,
    description TEXT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    due_date TEXT NULL,
    order_key TEXT NOT NULL,
    shortname TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_items_parent_active_order
    ON work_items (parent_work_item_id, is_active, order_key);

CREATE INDEX IF NOT EXISTS idx_work_items_active_created
    ON work_items (is_active, created_at);

CREATE TABLE IF NOT EXISTS work_item_dependencies (
    work_item_id TEXT NOT NULL REFERENCES work_items(work_item_id),
    depends_on_work_item_id TEXT NOT NULL REFERENCES work_items(work_item_id),
    dependency_type TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (work_item_id, depends_on_work_item_id)
);

CREATE INDEX IF NOT EXISTS idx_deps_from_active
    ON work_item_dependencies (work_item_id, is_active);

CREATE INDEX IF NOT EXISTS idx_deps_to_active
    ON work_item_dependencies (depends_on_work_item_id, is_active);

CREATE TABLE IF NOT EXISTS action_history (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    description TEXT NOT NULL,
    is_undone INTEGER NOT NULL DEFAULT 0,
    undone_at_action_id TEXT NULL REFERENCES action_history(action_id)
);

CREATE INDEX IF NOT EXISTS idx_action_history_timestamp
    ON action_history (timestamp DESC);

CREATE TABLE IF NOT EXISTS undo_steps (
    action_id TEXT NOT NULL REFERENCES action_history(action_id),
    step_order INTEGER NOT NULL,
    step_type TEXT NOT NULL,
    table_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    old_data TEXT NULL,
    new_data TEXT NULL,
    PRIMARY KEY (action_id, step_order)
);

CREATE INDEX IF NOT EXISTS idx_undo_steps_action_order
    ON undo_steps (action_id, step_order);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_four_tables() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap(); // idempotent

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        for table in ["action_history", "undo_steps", "work_item_dependencies", "work_items"] {
            assert!(names.contains(&table.to_string()), "missing table {table}");
        }
    }
}
