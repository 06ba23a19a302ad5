//! Contains helper functions to reduce boilerplate code in other `app` modules.

use std::sync::{Arc, Mutex};

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::{lock_state, AppState};
use super::tasks;
use super::view_model::generate_ui_state;

/// Locks the `AppState`, performs a mutation and sends a `StateUpdate` event.
pub fn with_state_and_notify<F, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    update_fn: F,
) where
    F: FnOnce(&mut AppState),
{
    let mut state_guard = lock_state(state);
    update_fn(&mut state_guard);
    proxy.send_event(UserEvent::StateUpdate(Box::new(generate_ui_state(
        &state_guard,
    ))));
}

/// Like [`with_state_and_notify`], and also (re)schedules the debounced
/// selection notification.
pub fn with_selection_and_notify<F, P: EventProxy>(
    state: &Arc<Mutex<AppState>>,
    proxy: &P,
    update_fn: F,
) where
    F: FnOnce(&mut AppState),
{
    let mut state_guard = lock_state(state);
    update_fn(&mut state_guard);
    proxy.send_event(UserEvent::StateUpdate(Box::new(generate_ui_state(
        &state_guard,
    ))));
    schedule_selection_update(&mut state_guard, proxy, state);
}

/// Aborts a pending selection notification and starts a new timer.
///
/// Only the last call within the debounce window results in events.
pub fn schedule_selection_update<P: EventProxy>(
    state_guard: &mut AppState,
    proxy: &P,
    state: &Arc<Mutex<AppState>>,
) {
    if let Some(pending) = state_guard.selection_debounce.take() {
        pending.abort();
    }
    let handle = tokio::spawn(tasks::debounced_selection_task(
        proxy.clone(),
        state.clone(),
    ));
    state_guard.selection_debounce = Some(handle);
}
