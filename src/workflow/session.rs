use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// A live authenticated session as handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_id: Uuid,
    pub phone: String,
}

type Listener = Box<dyn Fn(Option<&Session>) + Send + Sync>;

struct Inner {
    current: Mutex<Option<Session>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: Mutex<u64>,
}

/// Explicit session holder threaded through the stepper and gateway. Screens
/// subscribe for sign-out instead of watching ambient globals; dropping the
/// subscription unregisters the callback.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

pub struct SessionSubscription {
    inner: Arc<Inner>,
    id: u64,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                current: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: Mutex::new(0),
            }),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.current.lock().expect("session lock").clone()
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    pub fn set_session(&self, session: Session) {
        *self.inner.current.lock().expect("session lock") = Some(session);
        self.notify();
    }

    /// Clears the session, e.g. on sign-out or token expiry. Listeners are
    /// invoked with `None`; the stepper reacts by redirecting to login.
    pub fn clear(&self) {
        *self.inner.current.lock().expect("session lock") = None;
        self.notify();
    }

    pub fn on_session_change<F>(&self, callback: F) -> SessionSubscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.inner.next_listener_id.lock().expect("listener lock");
            let id = *next;
            *next += 1;
            id
        };
        self.inner
            .listeners
            .lock()
            .expect("listener lock")
            .push((id, Box::new(callback)));
        SessionSubscription {
            inner: self.inner.clone(),
            id,
        }
    }

    fn notify(&self) {
        let current = self.inner.current.lock().expect("session lock").clone();
        let listeners = self.inner.listeners.lock().expect("listener lock");
        for (_, listener) in listeners.iter() {
            listener(current.as_ref());
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        let mut listeners = self.inner.listeners.lock().expect("listener lock");
        listeners.retain(|(id, _)| *id != self.id);
    }
}
