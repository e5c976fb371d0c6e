//! Client-side data layer for the task detail screen.
//!
//! `ApiClient` talks HTTP, `TaskStore` holds fetched tasks and applies the
//! optimistic checklist protocol, `TaskDetail` drives both for one task and
//! exposes what a renderer needs.

mod api;
mod detail;
mod links;
mod store;

pub use api::{ApiClient, ClientError, TaskGateway};
pub use detail::{AttachmentRow, ChecklistRow, DetailPhase, StatusTone, TaskDetail, TaskDetailView};
pub use links::normalize_link;
pub use store::{Action, ItemState, PendingSync, TaskStore};
