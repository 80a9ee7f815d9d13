//! Per-session state and the in-memory session store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info};

use super::rate_gate::RateState;
use crate::error::Result;
use crate::tools::{CustomerProfile, ProfileProvider, UiCommand};

/// One client connection's context
#[derive(Debug)]
pub struct Session {
    id: String,
    owner: String,
    created_at: DateTime<Utc>,
    customer_id: String,
    audio: AtomicBool,
    /// Live connections attached through the store
    connections: AtomicUsize,
    rate: Mutex<RateState>,
    deferred: Mutex<Option<UiCommand>>,
    profile: OnceCell<CustomerProfile>,
}

impl Session {
    pub fn new(id: impl Into<String>, customer_id: impl Into<String>, audio: bool) -> Self {
        let id = id.into();
        Session {
            owner: format!("user_{}", id),
            id,
            created_at: Utc::now(),
            customer_id: customer_id.into(),
            audio: AtomicBool::new(audio),
            connections: AtomicUsize::new(0),
            rate: Mutex::new(RateState::default()),
            deferred: Mutex::new(None),
            profile: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owner identity reported to the engine
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Customer this session is bound to
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn is_audio(&self) -> bool {
        self.audio.load(Ordering::Relaxed)
    }

    pub fn set_audio(&self, audio: bool) {
        self.audio.store(audio, Ordering::Relaxed);
    }

    /// Connections currently attached to this session
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    pub(crate) fn rate_state(&self) -> &Mutex<RateState> {
        &self.rate
    }

    /// Stage a deferred UI command, replacing any unconsumed one.
    /// Returns the replaced command.
    pub async fn stage_deferred(&self, command: UiCommand) -> Option<UiCommand> {
        self.deferred.lock().await.replace(command)
    }

    /// Remove the staged command, if any
    pub async fn take_deferred(&self) -> Option<UiCommand> {
        self.deferred.lock().await.take()
    }

    /// The bound profile, if it has been loaded
    pub fn profile(&self) -> Option<&CustomerProfile> {
        self.profile.get()
    }

    /// Load the bound profile once; later calls return the cached value
    pub async fn load_profile(&self, provider: &dyn ProfileProvider) -> Result<&CustomerProfile> {
        self.profile
            .get_or_try_init(|| async {
                debug!(session_id = %self.id, customer_id = %self.customer_id, "Loading customer profile");
                provider.fetch(&self.customer_id).await
            })
            .await
    }
}

/// In-memory session table keyed by session id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection to the live session for `id`, creating it if
    /// absent. Every attach must be paired with a [`SessionStore::detach`].
    pub async fn attach(&self, id: &str, customer_id: &str, audio: bool) -> Arc<Session> {
        // The count only changes under a store lock, so a detach holding the
        // write lock never removes a session another attach is joining.
        if let Some(existing) = self.sessions.read().await.get(id) {
            existing.set_audio(audio);
            let connections = existing.connections.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(session_id = %id, connections, "Reusing existing session");
            return existing.clone();
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session_id = %id, customer_id = %customer_id, audio, "Created session");
                Arc::new(Session::new(id, customer_id, audio))
            })
            .clone();
        session.set_audio(audio);
        session.connections.fetch_add(1, Ordering::AcqRel);
        session
    }

    /// Release one connection. The session leaves the store when its last
    /// connection is gone; returns whether it was removed.
    pub async fn detach(&self, session: &Arc<Session>) -> bool {
        let mut sessions = self.sessions.write().await;
        let remaining = session
            .connections
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        if remaining > 0 {
            debug!(session_id = %session.id(), remaining, "Connection detached, session still in use");
            return false;
        }

        match sessions.get(session.id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(session.id());
                debug!(session_id = %session.id(), "Removed session");
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "Removed session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
