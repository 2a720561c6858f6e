//! `WorkItemService`: the single facade exposing the operation surface to
//! external callers. Owns transaction boundaries and history recording:
//! one `ActionHistory` row plus its ordered, typed `UndoStep`s per
//! committed mutation, rather than a single opaque operation/inverse pair.
//!
//! Every method follows the same template:
//! begin tx -> domain service -> record ActionHistory + UndoSteps -> commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use holon_core::{ActionHistory, CoreError, DependencyType, Priority, Status, WorkItem};
use uuid::Uuid;

use crate::config::Config;
use crate::repositories::{action_history_repo, work_item_repo};
use crate::services::add::{self, AddWorkItemInput};
use crate::services::delete;
use crate::services::dependency_update::{self, WorkItemWithDeps};
use crate::services::field_update::{self, FieldUpdate};
use crate::services::history;
use crate::services::import_export;
use crate::services::position_update;
use crate::services::promote;
use crate::services::reading::{self, ListWorkItemsFilter, TreeNode, TreeOptions, WorkItemDetails};
use crate::services::utils::MutationOutcome;
use crate::storage::schema::SCHEMA_SQL;
use crate::storage::{Backend, ConnectionPool, DbTarget, Tx};

/// Owns the pooled connection and configuration; cheap to clone (wraps an
/// `Arc` internally via `Backend`).
#[derive(Clone)]
pub struct WorkItemService {
    backend: Backend,
}

impl WorkItemService {
    /// Build a service over an already-open pool, running the idempotent
    /// schema migration. Intended for tests and embedders that manage
    /// their own `ConnectionPool`.
    pub async fn new(pool: Arc<ConnectionPool>) -> Result<Self, CoreError> {
        let backend = Backend::new(pool);
        backend
            .execute_batch(SCHEMA_SQL)
            .await
            .map_err(CoreError::from)?;
        Ok(Self { backend })
    }

    /// Build a service from process configuration, opening the pool and
    /// running the schema migration.
    pub async fn connect(config: &Config) -> Result<Self, CoreError> {
        let pool = Arc::new(ConnectionPool::new(
            DbTarget::from_path_str(&config.db_path),
            config.pool_size,
        ));
        Self::new(pool).await
    }

    /// In-memory service for tests.
    pub async fn in_memory() -> Result<Self, CoreError> {
        Self::connect(&Config::in_memory()).await
    }

    async fn begin(&self) -> Result<Tx, CoreError> {
        self.backend.begin().await.map_err(CoreError::from)
    }
}

fn log_error(err: &CoreError) {
    match err {
        CoreError::Internal { .. } => tracing::error!("{err}"),
        CoreError::Conflict { .. } => tracing::warn!("{err}"),
        CoreError::Validation { .. } | CoreError::NotFound { .. } => tracing::debug!("{err}"),
    }
}

/// Persist one `ActionHistory` row and its `UndoStep`s, then commit.
async fn finish<T>(tx: Tx, action_id: Uuid, now: DateTime<Utc>, outcome: MutationOutcome<T>) -> Result<T, CoreError> {
    action_history_repo::create_action(&tx, action_id, outcome.action_type, &outcome.description, now).await?;
    for step in &outcome.steps {
        action_history_repo::append_step(&tx, step).await?;
    }
    tx.commit().await.map_err(CoreError::from)?;
    Ok(outcome.result)
}

macro_rules! mutate {
    ($self:expr, |$tx:ident, $action_id:ident, $now:ident| $body:expr) => {{
        let $tx = $self.begin().await?;
        let $action_id = Uuid::new_v4();
        let $now = Utc::now();
        match $body.await {
            Ok(outcome) => finish($tx, $action_id, $now, outcome).await,
            Err(e) => {
                log_error(&e);
                let _ = $tx.rollback().await;
                Err(e)
            }
        }
    }};
}

impl WorkItemService {
    pub async fn add_work_item(&self, input: AddWorkItemInput) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| add::add_work_item(
            &tx, action_id, now, input
        ))
    }

    pub async fn set_name(&self, id: Uuid, name: String) -> Result<WorkItem, CoreError> {
        self.update_field(id, FieldUpdate::Name(name)).await
    }

    pub async fn set_description(&self, id: Uuid, description: Option<String>) -> Result<WorkItem, CoreError> {
        self.update_field(id, FieldUpdate::Description(description)).await
    }

    pub async fn set_status(&self, id: Uuid, status: Status) -> Result<WorkItem, CoreError> {
        self.update_field(id, FieldUpdate::Status(status)).await
    }

    pub async fn set_priority(&self, id: Uuid, priority: Priority) -> Result<WorkItem, CoreError> {
        self.update_field(id, FieldUpdate::Priority(priority)).await
    }

    pub async fn set_due_date(&self, id: Uuid, due_date: Option<DateTime<Utc>>) -> Result<WorkItem, CoreError> {
        self.update_field(id, FieldUpdate::DueDate(due_date)).await
    }

    async fn update_field(&self, id: Uuid, update: FieldUpdate) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| field_update::update_field(
            &tx, action_id, now, id, update
        ))
    }

    pub async fn add_dependencies(
        &self,
        id: Uuid,
        edges: Vec<(Uuid, DependencyType)>,
    ) -> Result<WorkItemWithDeps, CoreError> {
        mutate!(self, |tx, action_id, _now| dependency_update::add_dependencies(
            &tx, action_id, id, edges
        ))
    }

    pub async fn delete_dependencies(
        &self,
        id: Uuid,
        depends_on_ids: Vec<Uuid>,
    ) -> Result<WorkItemWithDeps, CoreError> {
        mutate!(self, |tx, action_id, _now| dependency_update::delete_dependencies(
            &tx,
            action_id,
            id,
            depends_on_ids
        ))
    }

    pub async fn move_item_before(&self, target: Uuid, anchor: Uuid) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| position_update::move_item_before(
            &tx, action_id, now, target, anchor
        ))
    }

    pub async fn move_item_after(&self, target: Uuid, anchor: Uuid) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| position_update::move_item_after(
            &tx, action_id, now, target, anchor
        ))
    }

    pub async fn move_item_to_start(&self, target: Uuid) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| position_update::move_item_to_start(
            &tx, action_id, now, target
        ))
    }

    pub async fn move_item_to_end(&self, target: Uuid) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| position_update::move_item_to_end(
            &tx, action_id, now, target
        ))
    }

    pub async fn delete_work_items(&self, ids: Vec<Uuid>) -> Result<usize, CoreError> {
        mutate!(self, |tx, action_id, now| delete::delete_work_items(
            &tx, action_id, now, ids
        ))
    }

    pub async fn promote_to_project(&self, id: Uuid) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| promote::promote_to_project(
            &tx, action_id, now, id
        ))
    }

    /// Administrative rebalance escape hatch: regenerate evenly spaced `order_key`s for `parent_id`'s active children. Not
    /// part of the undo/redo stack — it does not change logical order,
    /// only the keys' spacing, so no `ActionHistory` row is recorded.
    pub async fn rebalance_siblings(&self, parent_id: Option<Uuid>) -> Result<Vec<WorkItem>, CoreError> {
        let tx = self.begin().await?;
        let now = Utc::now();
        let result = work_item_repo::rebalance_siblings(&tx, parent_id, now).await;
        self.finish_read(tx, result).await
    }

    pub async fn import_project(
        &self,
        document: serde_json::Value,
        new_name: Option<String>,
    ) -> Result<WorkItem, CoreError> {
        mutate!(self, |tx, action_id, now| import_export::import_project(
            &tx,
            action_id,
            now,
            &document,
            new_name
        ))
    }

    // --- Undo / redo: special-cased, since "nothing to undo/redo" is a
    // valid `None` result that records no history row at all. ---

    pub async fn undo_last_action(&self) -> Result<Option<ActionHistory>, CoreError> {
        let tx = self.begin().await?;
        let action_id = Uuid::new_v4();
        let now = Utc::now();
        match history::undo_last_action(&tx, action_id, now).await {
            Ok(Some(outcome)) => finish(tx, action_id, now, outcome).await.map(Some),
            Ok(None) => {
                tx.commit().await.map_err(CoreError::from)?;
                Ok(None)
            }
            Err(e) => {
                log_error(&e);
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn redo_last_undo(&self) -> Result<Option<ActionHistory>, CoreError> {
        let tx = self.begin().await?;
        let action_id = Uuid::new_v4();
        let now = Utc::now();
        match history::redo_last_undo(&tx, action_id, now).await {
            Ok(Some(outcome)) => finish(tx, action_id, now, outcome).await.map(Some),
            Ok(None) => {
                tx.commit().await.map_err(CoreError::from)?;
                Ok(None)
            }
            Err(e) => {
                log_error(&e);
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    // --- Read-only operations: implicit transaction, no history. ---

    pub async fn get_details(&self, id: Uuid, include_inactive_children: bool) -> Result<WorkItemDetails, CoreError> {
        let tx = self.begin().await?;
        let result = reading::get_details(&tx, id, include_inactive_children).await;
        self.finish_read(tx, result).await
    }

    pub async fn list_work_items(&self, filter: ListWorkItemsFilter) -> Result<Vec<WorkItem>, CoreError> {
        let tx = self.begin().await?;
        let result = reading::list_work_items(&tx, filter).await;
        self.finish_read(tx, result).await
    }

    pub async fn get_full_tree(&self, root_id: Uuid, options: TreeOptions) -> Result<Option<TreeNode>, CoreError> {
        let tx = self.begin().await?;
        let result = reading::get_full_tree(&tx, root_id, options).await;
        self.finish_read(tx, result).await
    }

    pub async fn export_project(&self, id: Uuid) -> Result<serde_json::Value, CoreError> {
        let tx = self.begin().await?;
        let result = import_export::export_project(&tx, id).await;
        self.finish_read(tx, result).await
    }

    pub async fn list_history(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<ActionHistory>, CoreError> {
        let tx = self.begin().await?;
        let result = history::list_history(&tx, start_date, end_date, limit.unwrap_or(100)).await;
        self.finish_read(tx, result).await
    }

    async fn finish_read<T>(&self, tx: Tx, result: Result<T, CoreError>) -> Result<T, CoreError> {
        match result {
            Ok(value) => {
                tx.commit().await.map_err(CoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                log_error(&e);
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}
