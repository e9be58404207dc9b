//! Board list binding

use leptos::prelude::*;
use tracing::warn;

use super::spawn_action;
use crate::context::{use_board_context, BoardContext};
use crate::models::{Board, Session};
use crate::state::BoardStateStoreFields;
use crate::store::BoardStore;

/// Boards visible to the signed-in user, with the board-level actions
#[derive(Clone)]
pub struct UseBoards {
    pub boards: Signal<Vec<Board>>,
    pub is_loading: Signal<bool>,
    pub error: Signal<Option<String>>,
    store: BoardStore,
    session: Signal<Session>,
}

/// Load boards whenever the signed-in user changes.
///
/// Nothing is fetched while the session is anonymous.
pub fn use_boards(session: Signal<Session>) -> UseBoards {
    let BoardContext { store, view } = use_board_context();

    Effect::new({
        let store = store.clone();
        move |_| {
            if session.with(Session::is_authenticated) {
                spawn_action(&store, |store| async move { store.fetch_boards().await });
            }
        }
    });

    UseBoards {
        boards: Signal::derive(move || view.boards().get()),
        is_loading: Signal::derive(move || view.is_loading().get()),
        error: Signal::derive(move || view.error().get()),
        store,
        session,
    }
}

impl UseBoards {
    pub fn refresh(&self) {
        spawn_action(&self.store, |store| async move { store.fetch_boards().await });
    }

    /// Create a board owned by the signed-in user
    pub fn create_board(&self, title: String) {
        let Some(owner_id) = self.session.with_untracked(|s| s.user_id.clone()) else {
            warn!("Cannot create a board without a signed-in user");
            return;
        };
        spawn_action(&self.store, move |store| async move {
            store.create_board(&title, &owner_id).await
        });
    }

    pub fn update_board(&self, id: String, title: String) {
        spawn_action(&self.store, move |store| async move {
            store.update_board(&id, &title).await
        });
    }

    pub fn delete_board(&self, id: String) {
        spawn_action(&self.store, move |store| async move { store.delete_board(&id).await });
    }
}
