//! Boundary cases against an in-memory `WorkItemService`.

use holon::{AddWorkItemInput, CoreError, DependencyType, WorkItemService};

async fn add_root(service: &WorkItemService, name: &str) -> holon::WorkItem {
    service
        .add_work_item(AddWorkItemInput {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn delete_work_items_rejects_empty_id_list() {
    let service = WorkItemService::in_memory().await.unwrap();
    let err = service.delete_work_items(vec![]).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn delete_work_items_rejects_over_100_ids() {
    let service = WorkItemService::in_memory().await.unwrap();
    let mut ids = Vec::with_capacity(101);
    for i in 0..101 {
        ids.push(add_root(&service, &format!("item-{i}")).await.work_item_id);
    }
    let err = service.delete_work_items(ids).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn self_dependency_is_rejected() {
    let service = WorkItemService::in_memory().await.unwrap();
    let a = add_root(&service, "A").await;
    let err = service
        .add_dependencies(a.work_item_id, vec![(a.work_item_id, DependencyType::FinishToStart)])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn two_node_cycle_is_rejected() {
    let service = WorkItemService::in_memory().await.unwrap();
    let a = add_root(&service, "A").await;
    let b = add_root(&service, "B").await;
    service
        .add_dependencies(a.work_item_id, vec![(b.work_item_id, DependencyType::FinishToStart)])
        .await
        .unwrap();
    let err = service
        .add_dependencies(b.work_item_id, vec![(a.work_item_id, DependencyType::FinishToStart)])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn promote_already_root_item_is_rejected() {
    let service = WorkItemService::in_memory().await.unwrap();
    let a = add_root(&service, "A").await;
    let err = service.promote_to_project(a.work_item_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn move_across_different_parents_is_rejected() {
    let service = WorkItemService::in_memory().await.unwrap();
    let p1 = add_root(&service, "P1").await;
    let p2 = add_root(&service, "P2").await;
    let c1 = service
        .add_work_item(AddWorkItemInput {
            parent: Some(p1.work_item_id),
            name: "C1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let c2 = service
        .add_work_item(AddWorkItemInput {
            parent: Some(p2.work_item_id),
            name: "C2".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = service
        .move_item_before(c1.work_item_id, c2.work_item_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn undo_and_redo_with_nothing_pending_returns_none() {
    let service = WorkItemService::in_memory().await.unwrap();
    assert!(service.undo_last_action().await.unwrap().is_none());
    assert!(service.redo_last_undo().await.unwrap().is_none());
}

#[tokio::test]
async fn delete_dependencies_reports_missing_edges_precisely() {
    let service = WorkItemService::in_memory().await.unwrap();
    let a = add_root(&service, "A").await;
    let b = add_root(&service, "B").await;
    let err = service
        .delete_dependencies(a.work_item_id, vec![b.work_item_id])
        .await
        .unwrap_err();
    match err {
        CoreError::Validation { message } => assert!(message.contains(&b.work_item_id.to_string())),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn name_and_description_length_limits_are_enforced() {
    let service = WorkItemService::in_memory().await.unwrap();

    let too_long_name = "x".repeat(256);
    let err = service
        .add_work_item(AddWorkItemInput {
            name: too_long_name,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let too_long_description = "x".repeat(1025);
    let err = service
        .add_work_item(AddWorkItemInput {
            name: "ok".to_string(),
            description: Some(too_long_description),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn redo_after_intervening_mutation_is_invalidated() {
    let service = WorkItemService::in_memory().await.unwrap();
    let alpha = add_root(&service, "Alpha").await;
    service
        .set_name(alpha.work_item_id, "Beta".to_string())
        .await
        .unwrap();
    service.undo_last_action().await.unwrap().unwrap();

    add_root(&service, "Gamma").await;

    assert!(service.redo_last_undo().await.unwrap().is_none());
    let details = service.get_details(alpha.work_item_id, false).await.unwrap();
    assert_eq!(details.item.name, "Alpha");
}

#[tokio::test]
async fn import_rejects_self_dependency() {
    let service = WorkItemService::in_memory().await.unwrap();
    let document = serde_json::json!({
        "local_id": 0,
        "name": "Root",
        "description": null,
        "status": "todo",
        "priority": "medium",
        "due_date": null,
        "dependencies": [{"depends_on_local_id": 0, "dependency_type": "finish-to-start"}],
        "children": []
    });
    let err = service.import_project(document, None).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn import_rejects_finish_to_start_cycle() {
    let service = WorkItemService::in_memory().await.unwrap();
    let document = serde_json::json!({
        "local_id": 0,
        "name": "Root",
        "description": null,
        "status": "todo",
        "priority": "medium",
        "due_date": null,
        "dependencies": [{"depends_on_local_id": 1, "dependency_type": "finish-to-start"}],
        "children": [{
            "local_id": 1,
            "name": "Child",
            "description": null,
            "status": "todo",
            "priority": "medium",
            "due_date": null,
            "dependencies": [{"depends_on_local_id": 0, "dependency_type": "finish-to-start"}],
            "children": []
        }]
    });
    let err = service.import_project(document, None).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn rebalance_siblings_preserves_order() {
    let service = WorkItemService::in_memory().await.unwrap();
    let p = add_root(&service, "P").await;
    let mut children = Vec::new();
    for name in ["C1", "C2", "C3"] {
        children.push(
            service
                .add_work_item(AddWorkItemInput {
                    parent: Some(p.work_item_id),
                    name: name.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap(),
        );
    }

    let rebalanced = service.rebalance_siblings(Some(p.work_item_id)).await.unwrap();
    let names: Vec<_> = rebalanced.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["C1", "C2", "C3"]);

    let mut keys: Vec<_> = rebalanced.iter().map(|c| c.order_key.clone()).collect();
    let mut sorted = keys.clone();
    sorted.sort_by(|a, b| {
        use std::str::FromStr;
        rust_decimal::Decimal::from_str(a)
            .unwrap()
            .cmp(&rust_decimal::Decimal::from_str(b).unwrap())
    });
    assert_eq!(keys, sorted);
    keys.dedup();
    assert_eq!(keys.len(), rebalanced.len(), "rebalanced keys must stay distinct");
}
