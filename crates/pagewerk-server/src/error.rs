// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error responses.
//
// Every failure leaves the service as `{"error": <kind>, "detail": <message>}`
// with a status derived from the error's class.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagewerk_core::{ErrorClass, PagewerkError};
use serde::Serialize;
use tracing::{error, warn};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Status code for a domain error.
pub fn status_for(err: &PagewerkError) -> StatusCode {
    match (err.class(), err) {
        (_, PagewerkError::NotFound(_)) => StatusCode::NOT_FOUND,
        (_, PagewerkError::UnreadableDocument(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        (ErrorClass::Caller, _) => StatusCode::BAD_REQUEST,
        (_, PagewerkError::ConversionTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        (_, PagewerkError::ConversionFailed(_)) => StatusCode::BAD_GATEWAY,
        (ErrorClass::Environment, _) => StatusCode::NOT_IMPLEMENTED,
        (ErrorClass::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PagewerkError> for ApiError {
    fn from(err: PagewerkError) -> Self {
        Self::new(status_for(&err), err.kind(), err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), "invalid_request", err.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            format!("worker task failed: {err}"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                status = %self.status,
                kind = self.kind,
                detail = %self.detail,
                "request failed"
            );
        } else {
            warn!(
                status = %self.status,
                kind = self.kind,
                detail = %self.detail,
                "request rejected"
            );
        }
        let body = ErrorBody {
            error: self.kind,
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
