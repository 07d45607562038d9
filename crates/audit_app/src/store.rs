use std::sync::Mutex;

use audit_core::{update, AppState, AuditViewModel, Msg};

use crate::effects::EffectRunner;

/// Callback invoked with a fresh view model after every observable change.
pub type Subscriber = Box<dyn Fn(&AuditViewModel) + Send + 'static>;

/// Exclusive owner of the application state. All mutation goes through
/// [`Store::dispatch`]; everyone else sees read-only view models.
pub struct Store {
    state: Mutex<AppState>,
    subscribers: Mutex<Vec<Subscriber>>,
    effects: EffectRunner,
}

impl Store {
    pub fn new(effects: EffectRunner) -> Self {
        Self {
            state: Mutex::new(AppState::new()),
            subscribers: Mutex::new(Vec::new()),
            effects,
        }
    }

    /// Apply one message, run its effects, and notify subscribers if the
    /// state changed in an observable way.
    ///
    /// Effects are handed to the runner while the state lock is held, so the
    /// engine sees commands in the same order the reducer produced them.
    pub fn dispatch(&self, msg: Msg) {
        let maybe_view = {
            let mut guard = self.state.lock().expect("lock app state");
            let state = std::mem::take(&mut *guard);
            let (mut state, effects) = update(state, msg);
            let was_dirty = state.consume_dirty();
            let view = if was_dirty { Some(state.view()) } else { None };
            *guard = state;
            self.effects.run(effects);
            view
        };

        if let Some(view) = maybe_view {
            let subscribers = self.subscribers.lock().expect("lock subscribers");
            for subscriber in subscribers.iter() {
                subscriber(&view);
            }
        }
    }

    pub fn subscribe(&self, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .expect("lock subscribers")
            .push(subscriber);
    }

    /// Read-only snapshot of the current state.
    pub fn view(&self) -> AuditViewModel {
        self.state.lock().expect("lock app state").view()
    }
}
