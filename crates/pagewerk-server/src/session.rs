// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session registry — which stored files belong to which browser session.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pagewerk_core::SessionId;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Session {
    files: BTreeSet<String>,
    last_seen: DateTime<Utc>,
}

/// Shared map of session id to tracked file names. Sessions are created on
/// first use and removed by cleanup or by idling past the sweep age.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `session` owns `file`.
    pub async fn track(&self, session: &SessionId, file: impl Into<String>) {
        self.track_at(session, file, Utc::now()).await;
    }

    async fn track_at(&self, session: &SessionId, file: impl Into<String>, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session.clone()).or_insert_with(|| Session {
            files: BTreeSet::new(),
            last_seen: now,
        });
        entry.files.insert(file.into());
        entry.last_seen = now;
    }

    /// Files tracked for `session`, sorted.
    pub async fn files(&self, session: &SessionId) -> Vec<String> {
        self.sessions
            .read()
            .await
            .get(session)
            .map(|s| s.files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget `session`, returning the files it tracked.
    pub async fn remove(&self, session: &SessionId) -> Vec<String> {
        self.sessions
            .write()
            .await
            .remove(session)
            .map(|s| s.files.into_iter().collect())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than `max_idle`, returning their files.
    pub async fn expire_idle(&self, max_idle: Duration) -> Vec<(SessionId, Vec<String>)> {
        self.expire_idle_at(max_idle, Utc::now()).await
    }

    async fn expire_idle_at(
        &self,
        max_idle: Duration,
        now: DateTime<Utc>,
    ) -> Vec<(SessionId, Vec<String>)> {
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);
        let mut sessions = self.sessions.write().await;
        let idle: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, s)| now.signed_duration_since(s.last_seen) > max_idle)
            .map(|(id, _)| id.clone())
            .collect();

        idle.into_iter()
            .filter_map(|id| {
                let session = sessions.remove(&id)?;
                debug!(session = %id, files = session.files.len(), "session expired");
                Some((id, session.files.into_iter().collect()))
            })
            .collect()
    }
}
