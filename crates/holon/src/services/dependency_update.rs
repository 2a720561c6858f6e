//! Dependency Update: add/delete dependency edges.

use chrono::{DateTime, Utc};
use holon_core::{CoreError, Dependency, DependencyType, StepType, WorkItem};
use uuid::Uuid;

use crate::repositories::action_history_repo::next_step;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

use super::utils::MutationOutcome;

pub struct WorkItemWithDeps {
    pub item: WorkItem,
    pub outgoing: Vec<Dependency>,
}

fn dep_json(dep: &Dependency) -> serde_json::Value {
    serde_json::to_value(dep).expect("Dependency serializes infallibly")
}

fn dep_record_id(from: Uuid, to: Uuid) -> String {
    format!("{from}:{to}")
}

pub async fn add_dependencies(
    tx: &Tx,
    action_id: Uuid,
    id: Uuid,
    edges: Vec<(Uuid, DependencyType)>,
) -> Result<MutationOutcome<WorkItemWithDeps>, CoreError> {
    let item = work_item_repo::find_by_id(tx, id, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))?;

    let mut steps = Vec::new();
    let mut step_order = 0;

    for (depends_on, dependency_type) in &edges {
        if *depends_on == id {
            return Err(CoreError::validation("a work item cannot depend on itself"));
        }
        work_item_repo::find_by_id(tx, *depends_on, false)
            .await?
            .ok_or_else(|| CoreError::not_found("work_item", depends_on.to_string()))?;
        if *dependency_type == DependencyType::FinishToStart
            && dependency_repo::would_create_cycle(tx, id, *depends_on).await?
        {
            return Err(CoreError::validation(format!(
                "cycle: {depends_on} already reaches {id} via finish-to-start edges"
            )));
        }

        let before = dependency_repo::find_edge(tx, id, *depends_on).await?;
        let after = dependency_repo::upsert_active(tx, id, *depends_on, *dependency_type).await?;

        let step = match before {
            None => next_step(
                action_id,
                step_order,
                StepType::Insert,
                "work_item_dependencies",
                dep_record_id(id, *depends_on),
                None,
                Some(dep_json(&after)),
            ),
            Some(before) => next_step(
                action_id,
                step_order,
                StepType::Update,
                "work_item_dependencies",
                dep_record_id(id, *depends_on),
                Some(dep_json(&before)),
                Some(dep_json(&after)),
            ),
        };
        steps.push(step);
        step_order += 1;
    }

    let outgoing = dependency_repo::find_outgoing(tx, id, false).await?;
    let description = format!("Added {} dependencies to \"{}\"", edges.len(), item.name);
    Ok(MutationOutcome {
        result: WorkItemWithDeps { item, outgoing },
        action_type: "ADD_DEPENDENCIES",
        description,
        steps,
    })
}

pub async fn delete_dependencies(
    tx: &Tx,
    action_id: Uuid,
    id: Uuid,
    depends_on_ids: Vec<Uuid>,
) -> Result<MutationOutcome<WorkItemWithDeps>, CoreError> {
    let item = work_item_repo::find_by_id(tx, id, false)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))?;

    let mut missing = Vec::new();
    let mut befores = Vec::new();
    for &depends_on in &depends_on_ids {
        match dependency_repo::find_edge(tx, id, depends_on).await? {
            Some(edge) if edge.is_active => befores.push(edge),
            _ => missing.push(depends_on),
        }
    }
    if !missing.is_empty() {
        return Err(CoreError::validation(format!(
            "not active dependencies of {id}: {}",
            missing
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let mut steps = Vec::new();
    for (step_order, before) in befores.iter().enumerate() {
        dependency_repo::deactivate(tx, id, before.depends_on_work_item_id).await?;
        let mut after = before.clone();
        after.is_active = false;
        steps.push(next_step(
            action_id,
            step_order as i64,
            StepType::Update,
            "work_item_dependencies",
            dep_record_id(id, before.depends_on_work_item_id),
            Some(dep_json(before)),
            Some(dep_json(&after)),
        ));
    }

    let outgoing = dependency_repo::find_outgoing(tx, id, false).await?;
    let description = format!(
        "Removed {} dependencies from \"{}\"",
        depends_on_ids.len(),
        item.name
    );
    Ok(MutationOutcome {
        result: WorkItemWithDeps { item, outgoing },
        action_type: "DELETE_DEPENDENCIES",
        description,
        steps,
    })
}
