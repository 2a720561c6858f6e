//! Dependency-free domain core for the work-item engine: entity types,
//! the error taxonomy, order-key arithmetic, and shortname slugging.
//! No I/O lives here; everything in this crate is pure data and pure
//! functions so the storage layer (`holon`) can be swapped without
//! touching domain semantics.

pub mod error;
pub mod model;
pub mod ordering;
pub mod slug;

pub use error::{CoreError, Result};
pub use model::{
    ActionHistory, Dependency, DependencyType, Priority, Status, StepType, UndoStep, WorkItem,
};
