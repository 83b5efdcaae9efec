// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routing.

pub mod files;
pub mod form;
pub mod pages;
pub mod tools;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let max_body = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config.cors_origins, state.config.allows_any_origin());

    Router::new()
        .route("/", get(files::root))
        .route("/health", get(files::health))
        .route("/upload", post(files::upload))
        .route("/cleanup", post(files::cleanup))
        .route("/download/{name}", get(files::download))
        .route("/uploads/{name}", get(files::uploaded))
        .route("/merge", post(pages::merge))
        .route("/split", post(pages::split))
        .route("/extract", post(pages::extract))
        .route("/organize", post(pages::organize))
        .route("/remove", post(pages::remove))
        .route("/rotate", post(pages::rotate))
        .route("/crop", post(pages::crop))
        .route("/page-numbers", post(pages::page_numbers))
        .route("/annotate", post(pages::annotate))
        .route("/watermark", post(tools::watermark))
        .route("/compress", post(tools::compress))
        .route("/protect", post(tools::protect))
        .route("/images-to-pdf", post(tools::images_to_pdf))
        .route("/pdf-to-images", post(tools::pdf_to_images))
        .route("/office-to-pdf", post(tools::office_to_pdf))
        .route("/pdf-to-word", post(tools::pdf_to_word))
        .route("/ocr", post(tools::ocr))
        // axum's own 2 MB default would shadow the configured limit.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String], any: bool) -> CorsLayer {
    if any {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Credentials rule out wildcards, so methods and headers are mirrored.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
}
