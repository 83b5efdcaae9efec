// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Readiness, uploads, downloads and session cleanup.

use std::path::Path;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use pagewerk_core::{DocumentType, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::form::Form;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::storage::StoredUpload;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Pagewerk PDF backend ready" }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
    }))
}

/// `POST /upload`: Multipart `file`, optional `session_id`.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<StoredUpload>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;
    let stored = state.store.save_upload(&file.file_name, &file.data).await?;

    if let Some(session) = form.text("session_id").map(str::trim).filter(|s| !s.is_empty()) {
        state
            .sessions
            .track(&SessionId(session.to_string()), stored.original_name.clone())
            .await;
    }
    info!(stored = %stored.original_name, bytes = file.data.len(), "file uploaded");
    Ok(Json(stored))
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
    pub session_id: SessionId,
}

/// `POST /cleanup`: Delete the listed files plus everything the session
/// tracked, then forget the session.
pub async fn cleanup(
    State(state): State<AppState>,
    payload: Result<Json<CleanupRequest>, JsonRejection>,
) -> ApiResult<Json<CleanupResponse>> {
    let Json(request) = payload?;

    let mut names = state.sessions.remove(&request.session_id).await;
    names.extend(request.files);
    names.sort();
    names.dedup();

    let mut deleted = 0;
    for name in &names {
        deleted += state.store.delete(name).await;
    }
    info!(session = %request.session_id, deleted, "session cleaned up");
    Ok(Json(CleanupResponse {
        deleted,
        session_id: request.session_id,
    }))
}

/// `GET /download/{name}`: A produced artifact, as an attachment.
pub async fn download(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> ApiResult<Response> {
    let path = state.store.output_path(&name)?;
    serve(&path, &name, "attachment").await
}

/// `GET /uploads/{name}`: An uploaded file, inline for previews.
pub async fn uploaded(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> ApiResult<Response> {
    let path = state.store.upload_path(&name)?;
    serve(&path, &name, "inline").await
}

async fn serve(path: &Path, name: &str, disposition: &str) -> ApiResult<Response> {
    let body = tokio::fs::read(path).await.map_err(pagewerk_core::PagewerkError::from)?;
    let content_type = DocumentType::from_file_name(name)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Public URL of a published artifact.
pub fn download_url(name: &str) -> String {
    format!("/download/{name}")
}
