// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background expiry of stale files and idle sessions.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppState;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub files: usize,
    pub sessions: usize,
}

/// Expire idle sessions (deleting their files) and delete every stored file
/// older than the configured age.
pub async fn sweep_once(state: &AppState) -> SweepReport {
    let max_age = state.config.max_file_age();
    let mut report = SweepReport::default();

    for (_, files) in state.sessions.expire_idle(max_age).await {
        report.sessions += 1;
        for file in files {
            report.files += state.store.delete(&file).await;
        }
    }

    let store = state.store.clone();
    match tokio::task::spawn_blocking(move || store.sweep(max_age)).await {
        Ok(deleted) => report.files += deleted,
        Err(err) => warn!(%err, "file sweep task failed"),
    }

    if report != SweepReport::default() {
        info!(files = report.files, sessions = report.sessions, "sweep finished");
    }
    report
}

/// Sweep now and then every `sweep_interval` until the runtime shuts down.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.sweep_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            // The first tick completes immediately, giving the startup sweep.
            ticker.tick().await;
            sweep_once(&state).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::{ServiceConfig, SessionId};
    use std::time::Duration;

    #[tokio::test]
    async fn sweep_expires_sessions_and_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServiceConfig {
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("merged"),
            max_file_age_secs: 0,
            ..ServiceConfig::default()
        };
        let state = AppState::new(config).expect("state");

        let stored = state.store.save_upload("a.pdf", b"x").await.expect("save");
        state
            .sessions
            .track(&SessionId("s1".into()), stored.original_name.clone())
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = sweep_once(&state).await;
        assert_eq!(report, SweepReport { files: 1, sessions: 1 });
        assert!(state.sessions.is_empty().await);
        assert!(state.store.upload_path(&stored.original_name).is_err());
    }
}
