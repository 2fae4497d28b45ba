//! In-process table of live connections and their subscriptions (§4.4).
//!
//! The registry is the single point of mutation for its state. All
//! mutations and the snapshot phase of `fanout` are serialized under one
//! `std::sync::Mutex`; the actual per-session send happens outside the
//! guard, on a snapshot of the connection list taken under it, so a slow
//! or stuck transport cannot block registration or other fanouts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strym_core::{Filters, LogEvent};

use crate::matcher;

/// A session's handle to its underlying connection. Implemented by the
/// WebSocket layer in `strym-api`; kept as a trait here so the registry
/// has no transport dependency.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, event: &LogEvent) -> Result<(), ()>;
}

#[derive(Debug, Clone)]
struct SubscriptionEntry {
    filters: Filters,
    paused: bool,
}

struct Session {
    transport: Arc<dyn Transport>,
    subscriptions: HashMap<String, SubscriptionEntry>,
}

/// Registers, tracks, and fans events out to live sessions.
#[derive(Default)]
pub struct SubscriptionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `Session`. Must be called after transport accept.
    pub fn register(&self, session_id: impl Into<String>, transport: Arc<dyn Transport>) {
        let mut sessions = self.sessions.lock().expect("registry mutex poisoned");
        sessions.insert(
            session_id.into(),
            Session {
                transport,
                subscriptions: HashMap::new(),
            },
        );
    }

    /// Removes the session and all its subscriptions. Idempotent.
    pub fn deregister(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().expect("registry mutex poisoned");
        sessions.remove(session_id);
    }

    /// Inserts or replaces a subscription on that session. No-op if the
    /// session is gone.
    pub fn subscribe(&self, session_id: &str, subscription_id: impl Into<String>, filters: Filters) {
        let mut sessions = self.sessions.lock().expect("registry mutex poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            session
                .subscriptions
                .insert(subscription_id.into(), SubscriptionEntry { filters, paused: false });
        }
    }

    /// Removes a subscription. Idempotent.
    pub fn unsubscribe(&self, session_id: &str, subscription_id: &str) {
        let mut sessions = self.sessions.lock().expect("registry mutex poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            session.subscriptions.remove(subscription_id);
        }
    }

    /// Flips the paused flag on a subscription. No-op if either the
    /// session or the subscription is gone.
    pub fn set_paused(&self, session_id: &str, subscription_id: &str, paused: bool) {
        let mut sessions = self.sessions.lock().expect("registry mutex poisoned");
        if let Some(session) = sessions.get_mut(session_id) {
            if let Some(sub) = session.subscriptions.get_mut(subscription_id) {
                sub.paused = paused;
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("registry mutex poisoned").len()
    }

    /// For each session, for each non-paused subscription whose filter
    /// matches, delivers `event` to that session's transport.
    ///
    /// A send failure deregisters that session and aborts further sends
    /// to it within this fanout; other sessions are unaffected.
    pub async fn fanout(&self, event: &LogEvent) {
        // Snapshot phase: decide who gets the event while holding the
        // guard, then release it before doing any I/O.
        let targets: Vec<(String, Arc<dyn Transport>)> = {
            let sessions = self.sessions.lock().expect("registry mutex poisoned");
            sessions
                .iter()
                .filter(|(_, session)| {
                    session
                        .subscriptions
                        .values()
                        .any(|sub| !sub.paused && matcher::matches(event, &sub.filters))
                })
                .map(|(session_id, session)| (session_id.clone(), Arc::clone(&session.transport)))
                .collect()
        };

        for (session_id, transport) in targets {
            if transport.send(event).await.is_err() {
                self.deregister(&session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use serde_json::json;
    use strym_core::{FilterValue, LogId, LogSource, Severity};

    use super::*;

    struct CountingTransport {
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _event: &LogEvent) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_event(app_id: &str) -> LogEvent {
        LogEvent {
            id: LogId::new(1),
            timestamp: Utc::now(),
            source: LogSource {
                app_id: app_id.to_string(),
                host: Some("host".to_string()),
                instance_id: None,
            },
            severity: Severity::Error,
            message: "oops".to_string(),
            metadata: json!({}),
            trace_id: None,
            span_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fanout_delivers_to_matching_subscriptions_only() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        registry.register(
            "s1",
            Arc::new(CountingTransport { count: Arc::clone(&count), fail: false }),
        );
        registry.subscribe(
            "s1",
            "sub1",
            Filters { source_app: Some(FilterValue::parse("api")), ..Default::default() },
        );

        registry.fanout(&sample_event("worker")).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        registry.fanout(&sample_event("api")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn paused_subscriptions_are_skipped() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        registry.register(
            "s1",
            Arc::new(CountingTransport { count: Arc::clone(&count), fail: false }),
        );
        registry.subscribe("s1", "sub1", Filters::default());
        registry.set_paused("s1", "sub1", true);

        registry.fanout(&sample_event("api")).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn send_failure_deregisters_session() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        registry.register(
            "s1",
            Arc::new(CountingTransport { count: Arc::clone(&count), fail: true }),
        );
        registry.subscribe("s1", "sub1", Filters::default());

        assert_eq!(registry.session_count(), 1);
        registry.fanout(&sample_event("api")).await;
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn unsubscribe_and_deregister_are_idempotent() {
        let registry = SubscriptionRegistry::new();
        registry.unsubscribe("ghost", "ghost-sub");
        registry.deregister("ghost");
    }
}
