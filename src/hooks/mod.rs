//! View-Binding Hooks
//!
//! Thin adapters exposing slices of the board state to components and running
//! store actions in the background.

mod use_board_detail;
mod use_boards;


use std::future::Future;

use leptos::task::spawn_local;

use crate::store::BoardStore;

pub use use_board_detail::*;
pub use use_boards::*;

/// Run a store action without blocking the caller
fn spawn_action<F, Fut>(store: &BoardStore, action: F)
where
    F: FnOnce(BoardStore) -> Fut,
    Fut: Future<Output = ()> + 'static,
{
    spawn_local(action(store.clone()));
}
