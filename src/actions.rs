use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::notify::Notice;
use crate::registrations::UserContext;
use crate::store::EventStore;

/// Lifetime token for a view. Work scheduled through `after` is dropped if
/// the view closes before its timer fires.
pub struct ViewScope {
    closed: watch::Sender<bool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self { closed }
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Waits `delay`, then runs `action` unless the scope closed meanwhile.
    pub async fn after<T, F>(&self, delay: Duration, action: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return None;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = closed.wait_for(|is_closed| *is_closed) => {
                debug!("view closed before delayed action fired");
                return None;
            }
        }
        if self.is_closed() {
            return None;
        }
        Some(action())
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Registers after the UI delay and returns the notice to show. `None`
/// means the view went away first and nothing was changed.
pub async fn register_after(
    scope: &ViewScope,
    store: &EventStore,
    user: &UserContext,
    event_id: &str,
    delay: Duration,
) -> Option<Notice> {
    scope
        .after(delay, || {
            let Some(event) = store.get_by_id(event_id) else {
                return Notice::event_not_found();
            };
            let result = store.register(user, event_id);
            Notice::for_register(&event, &result)
        })
        .await
}

pub async fn cancel_after(
    scope: &ViewScope,
    store: &EventStore,
    user: &UserContext,
    event_id: &str,
    delay: Duration,
) -> Option<Notice> {
    scope
        .after(delay, || {
            let Some(event) = store.get_by_id(event_id) else {
                return Notice::event_not_found();
            };
            let result = store.cancel_registration(user, event_id);
            Notice::for_cancel(&event, &result)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::store::StoreOptions;
    use std::sync::Arc;

    const DELAY: Duration = Duration::from_millis(1000);

    fn store() -> Arc<EventStore> {
        Arc::new(EventStore::init(
            Box::new(MemoryStorage::new()),
            StoreOptions::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_lands_when_timer_fires() {
        let store = store();
        let scope = ViewScope::new();
        let user = UserContext::default();

        let notice = register_after(&scope, &store, &user, "2", DELAY)
            .await
            .expect("scope still open");
        assert_eq!(notice.title, "Registration successful!");
        assert!(store.is_user_registered(&user, "2"));

        let notice = cancel_after(&scope, &store, &user, "2", DELAY)
            .await
            .expect("scope still open");
        assert_eq!(notice.title, "Registration cancelled");
        assert_eq!(store.get_by_id("2").expect("event").attendees, 320);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_view_drops_the_mutation() {
        let store = store();
        let scope = Arc::new(ViewScope::new());
        let user = UserContext::default();

        let pending = {
            let store = Arc::clone(&store);
            let scope = Arc::clone(&scope);
            let user = user.clone();
            tokio::spawn(async move { register_after(&scope, &store, &user, "1", DELAY).await })
        };

        tokio::time::sleep(Duration::from_millis(400)).await;
        scope.close();

        assert_eq!(pending.await.expect("task"), None);
        assert!(!store.is_user_registered(&user, "1"));
        assert_eq!(store.get_by_id("1").expect("event").attendees, 847);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_scope_runs_nothing() {
        let scope = ViewScope::new();
        scope.close();
        let ran = scope.after(DELAY, || true).await;
        assert_eq!(ran, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_event_reports_not_found() {
        let store = store();
        let scope = ViewScope::new();
        let notice = register_after(&scope, &store, &UserContext::default(), "nope", DELAY)
            .await
            .expect("scope open");
        assert_eq!(notice, Notice::event_not_found());
    }
}
