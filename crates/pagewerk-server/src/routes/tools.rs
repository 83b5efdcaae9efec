// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multipart endpoints: watermarking, compression, protection and format
// conversions.

use axum::Json;
use axum::extract::{Multipart, State};
use pagewerk_core::error::Result;
use pagewerk_core::{DocumentType, PagewerkError};
use pagewerk_document::pages::{
    Overlay, PageTarget, Placement, Rgb, TextLayer, TextStyle, Transform, WATERMARK_MARGIN,
};
use pagewerk_document::{CompressionReport, OcrOutput, OutputPlan, PdfReader, PdfWriter, pdf};
use serde::Serialize;
use tracing::info;

use super::files::download_url;
use super::form::{FilePart, Form};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CompressResponse {
    pub url: String,
    #[serde(flatten)]
    pub report: CompressionReport,
}

async fn publish(
    state: &AppState,
    prefix: &str,
    kind: DocumentType,
    data: &[u8],
) -> ApiResult<Json<UrlResponse>> {
    let name = state.store.publish(prefix, kind.extension(), data).await?;
    Ok(Json(UrlResponse {
        url: download_url(&name),
    }))
}

/// Reject anything that does not parse as a PDF. Parsing runs on a blocking
/// worker.
async fn ensure_pdf(file: &FilePart) -> ApiResult<()> {
    let data = file.data.clone();
    tokio::task::spawn_blocking(move || PdfReader::from_bytes(&data).map(|_| ())).await??;
    Ok(())
}

/// `POST /watermark`: Stamp text on every page.
pub async fn watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;

    let text = form.text("text").filter(|t| !t.is_empty()).unwrap_or("CONFIDENTIAL");
    let style = TextStyle {
        font_size: form.parse_or("font_size", 60.0)?,
        color: Rgb::parse_or(form.text("color").unwrap_or_default(), Rgb::GRAY),
        opacity: form.parse_or("opacity", 0.3)?,
        rotation: form.parse_or("rotation", 45.0)?,
    }
    .validated()?;
    let placement = Placement::from_position(
        form.text("position").unwrap_or("center"),
        WATERMARK_MARGIN,
        form.parse_or("repeat_x", 1)?,
        form.parse_or("repeat_y", 1)?,
    )?;
    let overlay = Overlay::single(TextLayer {
        text: text.to_string(),
        style,
        placement,
    });

    let data = file.data.clone();
    let stamped = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let reader = PdfReader::from_bytes(&data)?;
        let plan = OutputPlan::transform(
            reader.page_count(),
            &PageTarget::All,
            Transform::Overlay(overlay),
        )?;
        pdf::assemble(&plan, &[&reader])
    })
    .await??;

    info!(bytes = stamped.len(), "watermark applied");
    publish(&state, "watermarked", DocumentType::Pdf, &stamped).await
}

/// `POST /compress`: Lossless structural compression.
pub async fn compress(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CompressResponse>> {
    let form = Form::read(multipart).await?;
    let data = form.file("file")?.data.clone();

    let (compressed, report) =
        tokio::task::spawn_blocking(move || pdf::compress_pdf(&data)).await??;
    let name = state.store.publish("compressed", "pdf", &compressed).await?;
    Ok(Json(CompressResponse {
        url: download_url(&name),
        report,
    }))
}

/// `POST /protect`: AES-256 password protection.
pub async fn protect(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;
    let password = form.require("password")?;
    ensure_pdf(file).await?;

    let protected = state.converter.protect(&file.data, password).await?;
    publish(&state, "protected", DocumentType::Pdf, &protected).await
}

/// `POST /images-to-pdf`: One page per image, in upload order.
pub async fn images_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let mut files = form.files("files");
    if files.is_empty() {
        files = form.files("file");
    }
    let images: Vec<Vec<u8>> = files.into_iter().map(|f| f.data.clone()).collect();

    let writer = PdfWriter::new(state.config.paper_size);
    let pdf =
        tokio::task::spawn_blocking(move || writer.images_to_pdf(images.as_slice())).await??;
    publish(&state, "images", DocumentType::Pdf, &pdf).await
}

/// `POST /pdf-to-images`: PNG per page, zipped.
pub async fn pdf_to_images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;
    ensure_pdf(file).await?;

    let zip = state.converter.pdf_to_png_zip(&file.data).await?;
    publish(&state, "images", DocumentType::Zip, &zip).await
}

/// `POST /office-to-pdf`: Plain text is typeset in-process, everything else
/// goes through the office suite.
pub async fn office_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;

    let pdf = match DocumentType::from_file_name(&file.file_name) {
        Some(DocumentType::PlainText) => {
            let text = String::from_utf8_lossy(&file.data).into_owned();
            let writer = PdfWriter::new(state.config.paper_size).with_title(file.file_name.clone());
            tokio::task::spawn_blocking(move || writer.text_to_pdf(&text)).await??
        }
        _ => state.converter.office_to_pdf(&file.data, &file.file_name).await?,
    };
    publish(&state, "converted", DocumentType::Pdf, &pdf).await
}

/// `POST /pdf-to-word`
pub async fn pdf_to_word(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UrlResponse>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;
    ensure_pdf(file).await?;

    let docx = state.converter.pdf_to_word(&file.data).await?;
    publish(&state, "converted", DocumentType::WordProcessing, &docx).await
}

/// `POST /ocr`: Text of a PDF or a single image.
pub async fn ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<OcrOutput>> {
    let form = Form::read(multipart).await?;
    let file = form.file("file")?;

    let kind = DocumentType::from_file_name(&file.file_name).ok_or_else(|| {
        PagewerkError::invalid_parameter("file", format!("unknown file type `{}`", file.file_name))
    })?;
    if kind == DocumentType::Pdf {
        ensure_pdf(file).await?;
    }
    Ok(Json(state.converter.ocr(&file.data, kind).await?))
}
