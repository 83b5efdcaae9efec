// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositor — turns page counts plus a selection policy into an ordered
// output plan. Nothing here touches PDF bytes; the assembler executes plans.

use std::collections::BTreeMap;

use pagewerk_core::error::{PagewerkError, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use super::overlay::{Overlay, Placement, Rgb, TextLayer, TextStyle};
use super::range::{DroppedPage, PageTarget, ResolvedPageSet};
use super::transform::Transform;

/// One page of the output: which input document, which 0-based page of it,
/// and what to do to it on the way through.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPage {
    pub document: usize,
    pub page: usize,
    pub transform: Option<Transform>,
}

/// Ordered list of output pages. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlan {
    entries: Vec<PlannedPage>,
    dropped: Vec<DroppedPage>,
}

impl OutputPlan {
    fn build(entries: Vec<PlannedPage>, dropped: Vec<DroppedPage>) -> Result<Self> {
        if entries.is_empty() {
            return Err(PagewerkError::EmptyResult);
        }
        debug!(pages = entries.len(), dropped = dropped.len(), "output plan built");
        Ok(Self { entries, dropped })
    }

    /// Every page of every document, documents in caller order.
    pub fn merge(page_counts: &[usize]) -> Result<Self> {
        let entries = page_counts
            .iter()
            .enumerate()
            .flat_map(|(document, &count)| (0..count).map(move |page| untouched(document, page)))
            .collect();
        Self::build(entries, Vec::new())
    }

    /// The selected pages in ascending source order (split / extract).
    pub fn select(page_count: usize, selection: &ResolvedPageSet) -> Result<Self> {
        let resolution = selection.resolve(page_count);
        let entries = resolution
            .kept
            .into_iter()
            .map(|page| untouched(0, page))
            .collect();
        Self::build(entries, resolution.dropped)
    }

    /// Exactly the given 0-based indices, in order, repeats allowed.
    /// Indices outside the document are skipped and reported.
    pub fn organize(page_count: usize, order: &[i64]) -> Result<Self> {
        let mut entries = Vec::with_capacity(order.len());
        let mut dropped = Vec::new();
        for &index in order {
            match usize::try_from(index) {
                Ok(page) if page < page_count => entries.push(untouched(0, page)),
                _ => {
                    warn!(index, page_count, "page index out of range, skipping");
                    dropped.push(DroppedPage { index, page_count });
                }
            }
        }
        Self::build(entries, dropped)
    }

    /// Every page except the selected ones, in source order.
    pub fn remove(page_count: usize, selection: &ResolvedPageSet) -> Result<Self> {
        let resolution = selection.resolve(page_count);
        let entries = (0..page_count)
            .filter(|&page| !selection.contains(page))
            .map(|page| untouched(0, page))
            .collect();
        Self::build(entries, resolution.dropped)
    }

    /// Every page in order; targeted pages carry `transform`.
    pub fn transform(page_count: usize, target: &PageTarget, transform: Transform) -> Result<Self> {
        let dropped = dropped_targets(target, page_count);
        let entries = (0..page_count)
            .map(|page| PlannedPage {
                document: 0,
                page,
                transform: target.includes(page).then(|| transform.clone()),
            })
            .collect();
        Self::build(entries, dropped)
    }

    /// Stamp a rendered page number on every targeted page.
    pub fn page_numbers(
        page_count: usize,
        target: &PageTarget,
        numbering: &PageNumbering,
    ) -> Result<Self> {
        let dropped = dropped_targets(target, page_count);
        let numbered: Vec<usize> = (0..page_count).filter(|&p| target.includes(p)).collect();
        let total = numbered.len();

        let mut labels = BTreeMap::new();
        for (ordinal, page) in numbered.into_iter().enumerate() {
            labels.insert(page, numbering.label(ordinal, total));
        }

        let entries = (0..page_count)
            .map(|page| PlannedPage {
                document: 0,
                page,
                transform: labels.remove(&page).map(|text| {
                    Transform::Overlay(Overlay::single(TextLayer {
                        text,
                        style: numbering.style,
                        placement: numbering.placement,
                    }))
                }),
            })
            .collect();
        Self::build(entries, dropped)
    }

    /// Every page in order, annotated pages carrying one overlay layer per
    /// annotation. Annotations aimed past the last page are dropped.
    pub fn annotate(page_count: usize, annotations: &[Annotation]) -> Result<Self> {
        let mut per_page: BTreeMap<usize, Overlay> = BTreeMap::new();
        let mut dropped = Vec::new();

        for annotation in annotations {
            let layer = annotation.to_layer()?;
            let page = annotation.page - 1;
            if page < page_count {
                per_page.entry(page).or_default().push(layer);
            } else {
                warn!(page = annotation.page, page_count, "annotation beyond last page, skipping");
                dropped.push(DroppedPage {
                    index: page as i64,
                    page_count,
                });
            }
        }

        let entries = (0..page_count)
            .map(|page| PlannedPage {
                document: 0,
                page,
                transform: per_page.remove(&page).map(Transform::Overlay),
            })
            .collect();
        Self::build(entries, dropped)
    }

    /// One single-page plan per entry, in order.
    pub fn into_singles(self) -> Vec<OutputPlan> {
        self.entries
            .into_iter()
            .map(|entry| OutputPlan {
                entries: vec![entry],
                dropped: Vec::new(),
            })
            .collect()
    }

    pub fn entries(&self) -> &[PlannedPage] {
        &self.entries
    }

    pub fn dropped(&self) -> &[DroppedPage] {
        &self.dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed plan.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source pages in output order as `(document, page)` pairs.
    pub fn order(&self) -> Vec<(usize, usize)> {
        self.entries.iter().map(|e| (e.document, e.page)).collect()
    }
}

fn untouched(document: usize, page: usize) -> PlannedPage {
    PlannedPage {
        document,
        page,
        transform: None,
    }
}

fn dropped_targets(target: &PageTarget, page_count: usize) -> Vec<DroppedPage> {
    match target {
        PageTarget::All => Vec::new(),
        PageTarget::Pages(set) => set.resolve(page_count).dropped,
    }
}

// -- Page numbering -----------------------------------------------------------

/// Template placeholder for the page number.
pub const NUMBER_PLACEHOLDER: &str = "{n}";
/// Template placeholder for the count of numbered pages.
pub const TOTAL_PLACEHOLDER: &str = "{total}";

/// How page numbers are rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PageNumbering {
    pub template: String,
    /// Number printed on the first numbered page.
    pub start: i64,
    pub style: TextStyle,
    pub placement: Placement,
}

impl PageNumbering {
    pub fn new(
        template: impl Into<String>,
        start: i64,
        style: TextStyle,
        placement: Placement,
    ) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(PagewerkError::invalid_parameter("template", "must not be empty"));
        }
        Ok(Self {
            template,
            start,
            style: style.validated()?,
            placement,
        })
    }

    /// Text for the `ordinal`-th (0-based) of `total` numbered pages.
    pub fn label(&self, ordinal: usize, total: usize) -> String {
        let number = self.start.saturating_add(ordinal as i64);
        self.template
            .replace(NUMBER_PLACEHOLDER, &number.to_string())
            .replace(TOTAL_PLACEHOLDER, &total.to_string())
    }
}

// -- Annotations --------------------------------------------------------------

/// Default annotation font size in points.
pub const DEFAULT_ANNOTATION_FONT_SIZE: f32 = 12.0;

/// A free-text note placed at an explicit point on one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Hex colour, `#rrggbb`.
    #[serde(default)]
    pub color: Option<String>,
}

impl Annotation {
    fn to_layer(&self) -> Result<TextLayer> {
        if self.page == 0 {
            return Err(PagewerkError::invalid_parameter("page", "page numbers start at 1"));
        }
        if self.text.is_empty() {
            return Err(PagewerkError::invalid_parameter("text", "annotation text is empty"));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(PagewerkError::invalid_parameter("x/y", "coordinates must be numbers"));
        }
        let color = match &self.color {
            None => Rgb::BLACK,
            Some(hex) => Rgb::parse_hex(hex).ok_or_else(|| {
                PagewerkError::invalid_parameter("color", format!("`{hex}` is not a hex colour"))
            })?,
        };
        let style = TextStyle {
            font_size: self.font_size.unwrap_or(DEFAULT_ANNOTATION_FONT_SIZE),
            color,
            ..TextStyle::default()
        }
        .validated()?;

        Ok(TextLayer {
            text: self.text.clone(),
            style,
            placement: Placement::At {
                x: self.x,
                y: self.y,
            },
        })
    }
}
