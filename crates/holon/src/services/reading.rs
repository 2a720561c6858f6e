//! Reading: `get_details`, `list_work_items`, `get_full_tree`.

use holon_core::{CoreError, Dependency, DependencyType, Status, WorkItem};
use uuid::Uuid;

use crate::repositories::work_item_repo::ListFilter;
use crate::repositories::{dependency_repo, work_item_repo};
use crate::storage::Tx;

const DEFAULT_MAX_DEPTH: u32 = 10;
const MAX_DEPTH_CAP: u32 = 20;
const LINKED_SUFFIX: &str = " (L)";

pub struct WorkItemDetails {
    pub item: WorkItem,
    pub children: Vec<WorkItem>,
    pub outgoing: Vec<Dependency>,
    pub incoming: Vec<Dependency>,
}

pub async fn get_details(
    tx: &Tx,
    id: Uuid,
    include_inactive_children: bool,
) -> Result<WorkItemDetails, CoreError> {
    let item = work_item_repo::find_by_id(tx, id, true)
        .await?
        .ok_or_else(|| CoreError::not_found("work_item", id.to_string()))?;
    let children = work_item_repo::find_children(tx, Some(id), include_inactive_children).await?;
    let outgoing = dependency_repo::find_outgoing(tx, id, false).await?;
    let incoming = dependency_repo::find_incoming(tx, id, false).await?;
    Ok(WorkItemDetails {
        item,
        children,
        outgoing,
        incoming,
    })
}

#[derive(Debug, Default, Clone)]
pub struct ListWorkItemsFilter {
    pub parent_id: Option<Option<Uuid>>,
    pub roots_only: bool,
    pub status: Option<Status>,
    pub is_active: Option<bool>,
}

pub async fn list_work_items(
    tx: &Tx,
    filter: ListWorkItemsFilter,
) -> Result<Vec<WorkItem>, CoreError> {
    work_item_repo::list(
        tx,
        &ListFilter {
            parent_id: filter.parent_id,
            roots_only: filter.roots_only,
            status: filter.status,
            is_active: filter.is_active,
        },
    )
    .await
}

#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    pub include_inactive_items: bool,
    pub include_inactive_dependencies: bool,
    pub max_depth: u32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            include_inactive_items: false,
            include_inactive_dependencies: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub item: WorkItem,
    pub display_name: String,
    pub is_linked: bool,
    pub children: Vec<TreeNode>,
}

pub async fn get_full_tree(
    tx: &Tx,
    root_id: Uuid,
    options: TreeOptions,
) -> Result<Option<TreeNode>, CoreError> {
    let max_depth = options.max_depth.min(MAX_DEPTH_CAP);
    build_node(tx, root_id, 0, max_depth, options, false).await
}

async fn build_node(
    tx: &Tx,
    id: Uuid,
    depth: u32,
    max_depth: u32,
    options: TreeOptions,
    is_linked: bool,
) -> Result<Option<TreeNode>, CoreError> {
    let Some(item) = work_item_repo::find_by_id(tx, id, options.include_inactive_items).await? else {
        return Ok(None);
    };

    let display_name = if is_linked {
        format!("{}{}", item.name, LINKED_SUFFIX)
    } else {
        item.name.clone()
    };

    let mut children = Vec::new();
    if depth < max_depth {
        let direct =
            work_item_repo::find_children(tx, Some(id), options.include_inactive_items).await?;
        for child in direct {
            if let Some(node) = Box::pin(build_node(
                tx,
                child.work_item_id,
                depth + 1,
                max_depth,
                options,
                is_linked,
            ))
            .await?
            {
                children.push(node);
            }
        }

        let outgoing = dependency_repo::find_outgoing(tx, id, options.include_inactive_dependencies).await?;
        for edge in outgoing {
            if edge.dependency_type != DependencyType::Linked {
                continue;
            }
            if let Some(node) = Box::pin(build_node(
                tx,
                edge.depends_on_work_item_id,
                depth + 1,
                max_depth,
                options,
                true,
            ))
            .await?
            {
                children.push(node);
            }
        }
    }

    Ok(Some(TreeNode {
        item,
        display_name,
        is_linked,
        children,
    }))
}
