// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document — Page selection and document processing for Pagewerk.
//
// `pages` holds the pure page-selection engine (range parsing, output plans,
// transforms, overlay layout). `pdf` executes plans with lopdf and creates
// PDFs from images with printpdf. `convert` shells out to external tools for
// the conversions that need a renderer or an office suite.

pub mod archive;
pub mod convert;
pub mod pages;
pub mod pdf;

// Re-export the primary types so callers can use `pagewerk_document::OutputPlan` etc.
pub use archive::zip_entries;
pub use convert::{DocumentConverter, ExternalTool, OcrOutput};
pub use pages::{OutputPlan, PageTarget, ResolvedPageSet, Transform};
pub use pdf::{CompressionReport, PdfAssembler, PdfReader, PdfWriter};
