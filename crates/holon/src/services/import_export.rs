//! Import / Export.
//!
//! The wire document assigns every node a small integer `local_id` so
//! internal dependencies can be expressed without leaking real UUIDs;
//! import remaps `local_id -> freshly generated Uuid` as it inserts.
//! Dependencies whose target falls outside the exported subtree are
//! omitted on export.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use holon_core::{ordering, slug, CoreError, DependencyType, Priority, Status, StepType, WorkItem};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

use super::utils::{snapshot, MutationOutcome};

const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedDependency {
    pub depends_on_local_id: u32,
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedItem {
    pub local_id: u32,
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<ExportedDependency>,
    pub children: Vec<ExportedItem>,
}

pub async fn export_project(tx: &Tx, root_id: Uuid) -> Result<serde_json::Value, CoreError> {
    let root = work_item_repo::find_by_id(tx, root_id, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", root_id.to_string()))?;

    let mut subtree = vec![root.clone()];
    subtree.extend(work_item_repo::find_descendants(tx, root_id, usize::MAX, false).await?);

    let mut local_ids = HashMap::new();
    for (idx, item) in subtree.iter().enumerate() {
        local_ids.insert(item.work_item_id, idx as u32);
    }

    let doc = build_exported_item(tx, &root, &local_ids).await?;
    serde_json::to_value(&doc).map_err(|e| CoreError::internal(format!("export serialization failed: {e}")))
}

async fn build_exported_item(
    tx: &Tx,
    item: &WorkItem,
    local_ids: &HashMap<Uuid, u32>,
) -> Result<ExportedItem, CoreError> {
    let outgoing = dependency_repo::find_outgoing(tx, item.work_item_id, false).await?;
    let dependencies = outgoing
        .into_iter()
        .filter(|dep| local_ids.contains_key(&dep.depends_on_work_item_id))
        .map(|dep| ExportedDependency {
            depends_on_local_id: local_ids[&dep.depends_on_work_item_id],
            dependency_type: dep.dependency_type,
        })
        .collect();

    let children_items = work_item_repo::find_children(tx, Some(item.work_item_id), false).await?;
    let mut children = Vec::with_capacity(children_items.len());
    for child in &children_items {
        children.push(Box::pin(build_exported_item(tx, child, local_ids)).await?);
    }

    Ok(ExportedItem {
        local_id: local_ids[&item.work_item_id],
        name: item.name.clone(),
        description: item.description.clone(),
        status: item.status,
        priority: item.priority,
        due_date: item.due_date,
        dependencies,
        children,
    })
}

pub async fn import_project(
    tx: &Tx,
    action_id: Uuid,
    now: DateTime<Utc>,
    document: &serde_json::Value,
    new_name: Option<String>,
) -> Result<MutationOutcome<WorkItem>, CoreError> {
    let size = serde_json::to_vec(document)
        .map_err(|e| CoreError::internal(format!("re-serializing import document failed: {e}")))?
        .len();
    if size > MAX_DOCUMENT_BYTES {
        return Err(CoreError::validation(format!(
            "import document is {size} bytes, exceeding the 1 MiB limit"
        )));
    }

    let root_doc: ExportedItem = serde_json::from_value(document.clone())
        .map_err(|e| CoreError::validation(format!("import document failed schema validation: {e}")))?;

    let mut id_map: HashMap<u32, Uuid> = HashMap::new();
    let mut steps = Vec::new();
    let mut step_order = 0i64;

    let order_key = super::utils::resolve_order_key(tx, None, super::utils::Position::End).await?;
    let root = insert_imported_item(
        tx,
        &root_doc,
        new_name,
        None,
        order_key,
        now,
        &mut id_map,
        action_id,
        &mut steps,
        &mut step_order,
    )
    .await?;

    insert_imported_dependencies(tx, &root_doc, &id_map, action_id, &mut steps, &mut step_order).await?;

    let description = format!("Imported project \"{}\"", root.name);
    Ok(MutationOutcome {
        result: root,
        action_type: "IMPORT_PROJECT",
        description,
        steps,
    })
}

#[allow(clippy::too_many_arguments)]
async fn insert_imported_item(
    tx: &Tx,
    doc: &ExportedItem,
    name_override: Option<String>,
    parent_id: Option<Uuid>,
    order_key: String,
    now: DateTime<Utc>,
    id_map: &mut HashMap<u32, Uuid>,
    action_id: Uuid,
    steps: &mut Vec<holon_core::UndoStep>,
    step_order: &mut i64,
) -> Result<WorkItem, CoreError> {
    let name = name_override.unwrap_or_else(|| doc.name.clone());
    let siblings = work_item_repo::find_children(tx, parent_id, false).await?;
    let shortname = slug::slugify_unique(&name, siblings.iter().map(|w| w.shortname.as_str()));

    let item = WorkItem {
        work_item_id: Uuid::new_v4(),
        parent_work_item_id: parent_id,
        name,
        description: doc.description.clone(),
        status: doc.status,
        priority: doc.priority,
        due_date: doc.due_date,
        order_key,
        shortname,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    work_item_repo::create(tx, &item).await?;
    id_map.insert(doc.local_id, item.work_item_id);
    steps.push(next_step(
        action_id,
        *step_order,
        StepType::Insert,
        "work_items",
        item.work_item_id.to_string(),
        None,
        Some(snapshot(&item)),
    ));
    *step_order += 1;

    let mut prev_key: Option<String> = None;
    for child_doc in &doc.children {
        let child_order_key = ordering::gen_key_between(prev_key.as_deref(), None)?;
        prev_key = Some(child_order_key.clone());
        Box::pin(insert_imported_item(
            tx,
            child_doc,
            None,
            Some(item.work_item_id),
            child_order_key,
            now,
            id_map,
            action_id,
            steps,
            step_order,
        ))
        .await?;
    }

    Ok(item)
}

fn insert_imported_dependencies<'a>(
    tx: &'a Tx,
    doc: &'a ExportedItem,
    id_map: &'a HashMap<u32, Uuid>,
    action_id: Uuid,
    steps: &'a mut Vec<holon_core::UndoStep>,
    step_order: &'a mut i64,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), CoreError>> + Send + 'a>> {
    Box::pin(async move {
        let from = id_map
            .get(&doc.local_id)
            .copied()
            .ok_or_else(|| CoreError::internal("import: local_id missing from id map"))?;
        for dep in &doc.dependencies {
            let to = id_map
                .get(&dep.depends_on_local_id)
                .copied()
                .ok_or_else(|| CoreError::validation("import: dependency references an unknown local_id"))?;
            if to == from {
                return Err(CoreError::validation("a work item cannot depend on itself"));
            }
            if dep.dependency_type == DependencyType::FinishToStart
                && dependency_repo::would_create_cycle(tx, from, to).await?
            {
                return Err(CoreError::validation(format!(
                    "cycle: {to} already reaches {from} via finish-to-start edges"
                )));
            }
            let edge = dependency_repo::upsert_active(tx, from, to, dep.dependency_type).await?;
            steps.push(next_step(
                action_id,
                *step_order,
                StepType::Insert,
                "work_item_dependencies",
                format!("{}:{}", edge.work_item_id, edge.depends_on_work_item_id),
                None,
                Some(serde_json::to_value(&edge).expect("Dependency serializes infallibly")),
            ));
            *step_order += 1;
        }
        for child in &doc.children {
            insert_imported_dependencies(tx, child, id_map, action_id, steps, step_order).await?;
        }
        Ok(())
    })
}
