// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading sources, assembling output plans, overlays,
// compression and creating PDFs from images or text.

pub mod assembler;
pub mod optimize;
pub mod overlay;
pub mod reader;
pub mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use assembler::{PdfAssembler, assemble};
pub use optimize::{CompressionReport, compress_pdf};
pub use overlay::{OverlayNames, render_overlay};
pub use reader::PdfReader;
pub use writer::PdfWriter;
