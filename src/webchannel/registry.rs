//! In-memory session registry with fixed-window expiry.
//!
//! The proxy is stateless between requests apart from this map; there is no
//! background timer, so eviction runs lazily (a sweep at the start of every
//! inbound request, plus an age check on each lookup).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::webchannel::classifier::ChannelOperation;

/// One client's active channel conversation with the upstream.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub operation: ChannelOperation,
    /// Protocol query parameters captured at creation, verbatim.
    pub parameters: HashMap<String, String>,
    pub created_at: Instant,
    pub last_used_at: Instant,
}

impl Session {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        // Fixed window from creation; last_used_at never extends it.
        now.duration_since(self.created_at) >= ttl
    }
}

/// Time-bounded session cache keyed by session identifier.
///
/// Owned state, held by the server instance; tests construct their own.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Remove every session older than the TTL. Runs once per inbound
    /// request; the only other eviction trigger is `get` on an expired key.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        let before = sessions.len();
        sessions.retain(|_, s| !s.expired(now, self.ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
    }

    /// Look up a session, touching `last_used_at` on a hit. An expired
    /// entry is deleted as a side effect and reported as absent.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        match sessions.get_mut(session_id) {
            Some(s) if s.expired(now, self.ttl) => {
                sessions.remove(session_id);
                tracing::debug!(session_id, "Session expired on lookup");
                None
            }
            Some(s) => {
                s.last_used_at = now;
                Some(s.clone())
            }
            None => None,
        }
    }

    /// Insert or overwrite a session, restarting its window.
    pub fn store(
        &self,
        session_id: &str,
        operation: ChannelOperation,
        parameters: HashMap<String, String>,
    ) {
        let now = Instant::now();
        let session = Session {
            session_id: session_id.to_string(),
            operation,
            parameters,
            created_at: now,
            last_used_at: now,
        };
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        sessions.insert(session_id.to_string(), session);
    }

    /// Unconditional removal; used when the upstream reports the session
    /// as unknown.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        sessions.remove(session_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().expect("session registry mutex poisoned").len()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
