//! Kanban Board Sync
//!
//! Client-side state synchronization for a kanban board: typed access to the
//! hosted data service, a single board store keeping the task and subtask
//! indices consistent, and Leptos hooks binding that store to views.

pub mod backend;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod state;
pub mod store;

pub use backend::{DataBackend, MemoryBackend, RestBackend};
pub use config::BackendConfig;
pub use context::{provide_board_context, use_board_context, BoardContext};
pub use error::{BackendError, KanbanError, Result};
pub use hooks::{use_board_detail, use_boards, UseBoardDetail, UseBoards};
pub use models::{Board, Column, Session, Subtask, SubtaskUpdate, Task, TaskUpdate};
pub use state::BoardState;
pub use store::BoardStore;
