// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared application state handed to every handler through axum's `State`.
//
// All fields are cheaply cloneable (Arc-backed), so the whole struct is
// cloned per request.

use std::sync::Arc;

use pagewerk_core::ServiceConfig;
use pagewerk_core::error::Result;
use pagewerk_document::DocumentConverter;
use tracing::info;

use crate::session::SessionRegistry;
use crate::storage::FileStore;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub store: FileStore,
    pub sessions: SessionRegistry,
    pub converter: Arc<DocumentConverter>,
}

impl AppState {
    /// Build state from configuration, creating the storage directories.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let store = FileStore::new(&config.upload_dir, &config.output_dir)?;
        let converter = DocumentConverter::new(config.tools.clone(), config.tool_timeout());
        info!(
            uploads = %config.upload_dir.display(),
            outputs = %config.output_dir.display(),
            "app state initialised"
        );
        Ok(Self {
            config: Arc::new(config),
            store,
            sessions: SessionRegistry::new(),
            converter: Arc::new(converter),
        })
    }
}
