//! `work_item_dependencies` CRUD and cycle detection.
//!
//! `would_create_cycle` is a DFS over the active `finish-to-start`
//! subgraph only, in the same recursive-traversal style as
//! `work_item_repo::find_descendants`; `linked` edges never participate
//! in cycle detection.

use holon_core::{CoreError, Dependency, DependencyType};
use std::collections::HashSet;
use uuid::Uuid;

use crate::repositories::convert::{bool_param, row_to_dependency, text_param};
use crate::storage::{Params, Tx};

pub async fn find_edge(
    tx: &Tx,
    from: Uuid,
    to: Uuid,
) -> Result<Option<Dependency>, CoreError> {
    let mut params = Params::new();
    params.insert("from".into(), text_param(from.to_string()));
    params.insert("to".into(), text_param(to.to_string()));
    let rows = tx
        .query(
            "SELECT * FROM work_item_dependencies WHERE work_item_id = $from AND \
             depends_on_work_item_id = $to",
            params,
        )
        .await?;
    rows.first().map(row_to_dependency).transpose()
}

/// Insert a new active edge, or reactivate/retype an existing one.
/// Duplicate edges are the one case this layer silently recovers from.
pub async fn upsert_active(
    tx: &Tx,
    from: Uuid,
    to: Uuid,
    dependency_type: DependencyType,
) -> Result<Dependency, CoreError> {
    match find_edge(tx, from, to).await? {
        Some(existing) => {
            let mut params = Params::new();
            params.insert("from".into(), text_param(from.to_string()));
            params.insert("to".into(), text_param(to.to_string()));
            params.insert("dependency_type".into(), text_param(dependency_type.as_str()));
            tx.execute(
                "UPDATE work_item_dependencies SET dependency_type = $dependency_type, \
                 is_active = 1 WHERE work_item_id = $from AND depends_on_work_item_id = $to",
                params,
            )
            .await?;
            let _ = existing;
            find_edge(tx, from, to)
                .await?
                .ok_or_else(|| CoreError::internal("dependency vanished after upsert"))
        }
        None => {
            let mut params = Params::new();
            params.insert("from".into(), text_param(from.to_string()));
            params.insert("to".into(), text_param(to.to_string()));
            params.insert("dependency_type".into(), text_param(dependency_type.as_str()));
            params.insert("is_active".into(), bool_param(true));
            tx.execute(
                "INSERT INTO work_item_dependencies (work_item_id, depends_on_work_item_id, \
                 dependency_type, is_active) VALUES ($from, $to, $dependency_type, $is_active)",
                params,
            )
            .await?;
            find_edge(tx, from, to)
                .await?
                .ok_or_else(|| CoreError::internal("dependency vanished after insert"))
        }
    }
}

pub async fn deactivate(tx: &Tx, from: Uuid, to: Uuid) -> Result<(), CoreError> {
    let mut params = Params::new();
    params.insert("from".into(), text_param(from.to_string()));
    params.insert("to".into(), text_param(to.to_string()));
    let affected = tx
        .execute(
            "UPDATE work_item_dependencies SET is_active = 0 WHERE work_item_id = $from AND \
             depends_on_work_item_id = $to AND is_active = 1",
            params,
        )
        .await?;
    if affected == 0 {
        return Err(CoreError::validation(format!(
            "no active dependency from {from} to {to}"
        )));
    }
    Ok(())
}

pub async fn reactivate(tx: &Tx, from: Uuid, to: Uuid) -> Result<(), CoreError> {
    let mut params = Params::new();
    params.insert("from".into(), text_param(from.to_string()));
    params.insert("to".into(), text_param(to.to_string()));
    tx.execute(
        "UPDATE work_item_dependencies SET is_active = 1 WHERE work_item_id = $from AND \
         depends_on_work_item_id = $to",
        params,
    )
    .await?;
    Ok(())
}

pub async fn find_outgoing(
    tx: &Tx,
    id: Uuid,
    include_inactive: bool,
) -> Result<Vec<Dependency>, CoreError> {
    let mut sql = "SELECT * FROM work_item_dependencies WHERE work_item_id = $id".to_string();
    if !include_inactive {
        sql.push_str(" AND is_active = 1");
    }
    let mut params = Params::new();
    params.insert("id".into(), text_param(id.to_string()));
    let rows = tx.query(&sql, params).await?;
    rows.iter().map(row_to_dependency).collect()
}

pub async fn find_incoming(
    tx: &Tx,
    id: Uuid,
    include_inactive: bool,
) -> Result<Vec<Dependency>, CoreError> {
    let mut sql =
        "SELECT * FROM work_item_dependencies WHERE depends_on_work_item_id = $id".to_string();
    if !include_inactive {
        sql.push_str(" AND is_active = 1");
    }
    let mut params = Params::new();
    params.insert("id".into(), text_param(id.to_string()));
    let rows = tx.query(&sql, params).await?;
    rows.iter().map(row_to_dependency).collect()
}

pub async fn deactivate_touching(tx: &Tx, ids: &HashSet<Uuid>) -> Result<Vec<Dependency>, CoreError> {
    let mut touched = Vec::new();
    for &id in ids {
        touched.extend(find_outgoing(tx, id, false).await?);
        touched.extend(find_incoming(tx, id, false).await?);
    }
    touched.sort_by_key(|d| (d.work_item_id, d.depends_on_work_item_id));
    touched.dedup_by_key(|d| (d.work_item_id, d.depends_on_work_item_id));

    for dep in &touched {
        deactivate(tx, dep.work_item_id, dep.depends_on_work_item_id).await?;
    }
    Ok(touched)
}

/// True if adding a `finish-to-start` edge `from -> to` would create a
/// cycle in the active `finish-to-start` subgraph, i.e. `to` can already
/// reach `from`.
pub async fn would_create_cycle(tx: &Tx, from: Uuid, to: Uuid) -> Result<bool, CoreError> {
    if from == to {
        return Ok(true);
    }

    let mut visited = HashSet::new();
    let mut stack = vec![to];
    while let Some(node) = stack.pop() {
        if node == from {
            return Ok(true);
        }
        if !visited.insert(node) {
            continue;
        }
        let edges = find_outgoing(tx, node, false).await?;
        for edge in edges {
            if edge.dependency_type == DependencyType::FinishToStart {
                stack.push(edge.depends_on_work_item_id);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Backend, ConnectionPool, DbTarget};
    use crate::storage::schema::SCHEMA_SQL;
    use holon_core::{Priority, Status, WorkItem};
    use std::sync::Arc;

    async fn setup() -> Backend {
        let pool = Arc::new(ConnectionPool::new(DbTarget::Memory, 4));
        let backend = Backend::new(pool);
        backend.execute_batch(SCHEMA_SQL).await.unwrap();
        backend
    }

    fn item(name: &str) -> WorkItem {
        let now = chrono::Utc::now();
        WorkItem {
            work_item_id: Uuid::new_v4(),
            parent_work_item_id: None,
            name: name.to_string(),
            description: None,
            status: Status::Todo,
            priority: Priority::Medium,
            due_date: None,
            order_key: "1000".to_string(),
            shortname: name.to_lowercase(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn direct_self_dependency_is_a_cycle() {
        let backend = setup().await;
        let tx = backend.begin().await.unwrap();
        let a = item("a");
        crate::repositories::work_item_repo::create(&tx, &a).await.unwrap();
        assert!(would_create_cycle(&tx, a.work_item_id, a.work_item_id).await.unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn two_node_cycle_is_detected() {
        let backend = setup().await;
        let tx = backend.begin().await.unwrap();
        let a = item("a");
        let b = item("b");
        crate::repositories::work_item_repo::create(&tx, &a).await.unwrap();
        crate::repositories::work_item_repo::create(&tx, &b).await.unwrap();

        upsert_active(&tx, b.work_item_id, a.work_item_id, DependencyType::FinishToStart)
            .await
            .unwrap();

        assert!(
            would_create_cycle(&tx, a.work_item_id, b.work_item_id)
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn unrelated_nodes_are_not_a_cycle() {
        let backend = setup().await;
        let tx = backend.begin().await.unwrap();
        let a = item("a");
        let b = item("b");
        crate::repositories::work_item_repo::create(&tx, &a).await.unwrap();
        crate::repositories::work_item_repo::create(&tx, &b).await.unwrap();

        assert!(!would_create_cycle(&tx, a.work_item_id, b.work_item_id).await.unwrap());
        tx.commit().await.unwrap();
    }
}
