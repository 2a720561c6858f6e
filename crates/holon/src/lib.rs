//! Storage adapter, repositories, domain services, and the
//! `WorkItemService` orchestrator over `holon-core`'s domain types.

pub mod config;
pub mod orchestrator;
pub mod repositories;
pub mod services;
pub mod storage;

pub use config::Config;
pub use orchestrator::WorkItemService;
pub use services::add::AddWorkItemInput;
pub use services::dependency_update::WorkItemWithDeps;
pub use services::field_update::FieldUpdate;
pub use services::import_export::{ExportedDependency, ExportedItem};
pub use services::reading::{ListWorkItemsFilter, TreeNode, TreeOptions, WorkItemDetails};
pub use services::utils::Position;

pub use holon_core::{
    ActionHistory, CoreError, Dependency, DependencyType, Priority, Status, StepType, UndoStep,
    WorkItem,
};
