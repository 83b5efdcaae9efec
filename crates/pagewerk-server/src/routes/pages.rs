// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection and composition endpoints.
//
// Every handler validates its parameters (range expressions included) before
// touching storage, builds an `OutputPlan` against the loaded documents on a
// blocking worker, and publishes the assembled PDF.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use pagewerk_core::PagewerkError;
use pagewerk_core::error::Result;
use pagewerk_document::pages::{
    Annotation, CropMargins, DroppedPage, PAGE_NUMBER_MARGIN, PageNumbering, PageTarget, Placement,
    ResolvedPageSet, Rotation, TextStyle, Transform,
};
use pagewerk_document::{OutputPlan, PdfReader, pdf, zip_entries};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::files::download_url;
use crate::error::ApiResult;
use crate::state::AppState;

/// Response of every page endpoint.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub url: String,
    pub page_count: usize,
    /// Requested pages that fell outside the document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DroppedPage>,
}

/// Load `names` from storage, plan against their page counts, assemble and
/// publish under `prefix`.
async fn compose<F>(
    state: &AppState,
    prefix: &str,
    names: &[String],
    plan: F,
) -> ApiResult<Json<PlanResponse>>
where
    F: FnOnce(&[usize]) -> Result<OutputPlan> + Send + 'static,
{
    let sources = load_all(state, names).await?;
    let (pdf, page_count, dropped) = tokio::task::spawn_blocking(move || -> Result<_> {
        let readers = open_all(&sources)?;
        let counts: Vec<usize> = readers.iter().map(PdfReader::page_count).collect();
        let plan = plan(&counts)?;
        let refs: Vec<&PdfReader> = readers.iter().collect();
        let pdf = pdf::assemble(&plan, &refs)?;
        Ok((pdf, plan.len(), plan.dropped().to_vec()))
    })
    .await??;

    let name = state.store.publish(prefix, "pdf", &pdf).await?;
    info!(output = %name, pages = page_count, dropped = dropped.len(), "{prefix} finished");
    Ok(Json(PlanResponse {
        url: download_url(&name),
        page_count,
        dropped,
    }))
}

async fn load_all(state: &AppState, names: &[String]) -> Result<Vec<Vec<u8>>> {
    let mut sources = Vec::with_capacity(names.len());
    for name in names {
        sources.push(state.store.read_input(name).await?);
    }
    Ok(sources)
}

fn open_all(sources: &[Vec<u8>]) -> Result<Vec<PdfReader>> {
    sources.iter().map(|data| PdfReader::from_bytes(data)).collect()
}

// -- Merge ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub files: Vec<String>,
}

/// `POST /merge`: Concatenate documents in list order.
pub async fn merge(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    if request.files.is_empty() {
        return Err(PagewerkError::invalid_parameter("files", "list at least one document").into());
    }
    compose(&state, "merged", &request.files, |counts| OutputPlan::merge(counts)).await
}

// -- Split / extract ------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One PDF holding the selected pages.
    #[default]
    Combined,
    /// One PDF per selected page, zipped.
    Separate,
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub filename: String,
    pub page_ranges: String,
    #[serde(default)]
    pub mode: Option<SplitMode>,
}

/// `POST /split`: Keep the pages named by `page_ranges`, ascending.
pub async fn split(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SplitRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let selection = ResolvedPageSet::parse(&request.page_ranges)?;
    let files = [request.filename];

    match request.mode.unwrap_or_default() {
        SplitMode::Combined => {
            compose(&state, "split", &files, move |counts| {
                OutputPlan::select(counts[0], &selection)
            })
            .await
        }
        SplitMode::Separate => split_separate(&state, &files[0], selection).await,
    }
}

/// One single-page PDF per selected page, zipped as `page_{n}.pdf` entries.
async fn split_separate(
    state: &AppState,
    name: &str,
    selection: ResolvedPageSet,
) -> ApiResult<Json<PlanResponse>> {
    let source = state.store.read_input(name).await?;
    let (zip, page_count, dropped) = tokio::task::spawn_blocking(move || -> Result<_> {
        let reader = PdfReader::from_bytes(&source)?;
        let plan = OutputPlan::select(reader.page_count(), &selection)?;
        let dropped = plan.dropped().to_vec();

        let mut entries = Vec::with_capacity(plan.len());
        for single in plan.into_singles() {
            let number = single.entries()[0].page + 1;
            entries.push((format!("page_{number}.pdf"), pdf::assemble(&single, &[&reader])?));
        }
        let count = entries.len();
        Ok((zip_entries(entries)?, count, dropped))
    })
    .await??;

    let name = state.store.publish("split", "zip", &zip).await?;
    info!(output = %name, pages = page_count, "split into separate pages");
    Ok(Json(PlanResponse {
        url: download_url(&name),
        page_count,
        dropped,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub filename: String,
    pub pages: String,
}

/// `POST /extract`: Same selection semantics as a combined split.
pub async fn extract(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SelectionRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let selection = ResolvedPageSet::parse(&request.pages)?;
    compose(&state, "extracted", &[request.filename], move |counts| {
        OutputPlan::select(counts[0], &selection)
    })
    .await
}

/// `POST /remove`: Drop the named pages, keep the rest in order.
pub async fn remove(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SelectionRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let selection = ResolvedPageSet::parse(&request.pages)?;
    compose(&state, "removed", &[request.filename], move |counts| {
        OutputPlan::remove(counts[0], &selection)
    })
    .await
}

// -- Organize -------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrganizeRequest {
    pub filename: String,
    /// 0-based indices in output order; repeats duplicate pages.
    pub page_indices: Vec<i64>,
}

/// `POST /organize`: Reorder, duplicate or drop pages by index.
pub async fn organize(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OrganizeRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let order = request.page_indices;
    compose(&state, "organized", &[request.filename], move |counts| {
        OutputPlan::organize(counts[0], &order)
    })
    .await
}

// -- Per-page transforms --------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RotateRequest {
    pub filename: String,
    pub angle: i32,
    #[serde(default)]
    pub pages: Option<String>,
}

/// `POST /rotate`
pub async fn rotate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RotateRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let rotation = Rotation::new(request.angle)?;
    let target = PageTarget::parse_or_all(request.pages.as_deref())?;
    compose(&state, "rotated", &[request.filename], move |counts| {
        OutputPlan::transform(counts[0], &target, Transform::Rotate(rotation))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct CropRequest {
    pub filename: String,
    #[serde(default)]
    pub top: f32,
    #[serde(default)]
    pub bottom: f32,
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub right: f32,
    #[serde(default)]
    pub pages: Option<String>,
}

/// `POST /crop`: Margins in points, trimmed from the visible box.
pub async fn crop(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CropRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let margins = CropMargins::new(request.top, request.bottom, request.left, request.right)?;
    let target = PageTarget::parse_or_all(request.pages.as_deref())?;
    compose(&state, "cropped", &[request.filename], move |counts| {
        OutputPlan::transform(counts[0], &target, Transform::Crop(margins))
    })
    .await
}

fn default_position() -> String {
    "bottom-right".into()
}

fn default_template() -> String {
    "{n}".into()
}

fn default_start() -> i64 {
    1
}

fn default_font_size() -> f32 {
    12.0
}

#[derive(Debug, Deserialize)]
pub struct PageNumbersRequest {
    pub filename: String,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_start")]
    pub start: i64,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub pages: Option<String>,
}

/// `POST /page-numbers`
pub async fn page_numbers(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PageNumbersRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    let placement = Placement::from_position(&request.position, PAGE_NUMBER_MARGIN, 1, 1)?;
    let style = TextStyle {
        font_size: request.font_size,
        ..TextStyle::default()
    };
    let numbering = PageNumbering::new(request.template, request.start, style, placement)?;
    let target = PageTarget::parse_or_all(request.pages.as_deref())?;
    compose(&state, "numbered", &[request.filename], move |counts| {
        OutputPlan::page_numbers(counts[0], &target, &numbering)
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    pub filename: String,
    pub annotations: Vec<Annotation>,
}

/// `POST /annotate`: Free-text notes at explicit coordinates.
pub async fn annotate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnnotateRequest>, JsonRejection>,
) -> ApiResult<Json<PlanResponse>> {
    let Json(request) = payload?;
    if request.annotations.is_empty() {
        return Err(PagewerkError::invalid_parameter("annotations", "nothing to annotate").into());
    }
    let annotations = request.annotations;
    compose(&state, "annotated", &[request.filename], move |counts| {
        OutputPlan::annotate(counts[0], &annotations)
    })
    .await
}
