// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossless size reduction: deflate every stream, drop unreachable objects
// and strip the document information dictionary.

use lopdf::Document;
use pagewerk_core::error::{PagewerkError, Result};
use serde::Serialize;
use tracing::{info, instrument};

/// Before/after sizes of a compression pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionReport {
    pub original_size: usize,
    pub compressed_size: usize,
    /// `(1 - compressed / original) * 100`, one decimal place. Negative
    /// when the output grew.
    pub reduction_percent: f64,
}

impl CompressionReport {
    pub fn new(original_size: usize, compressed_size: usize) -> Self {
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            let ratio = compressed_size as f64 / original_size as f64;
            ((1.0 - ratio) * 1000.0).round() / 10.0
        };
        Self {
            original_size,
            compressed_size,
            reduction_percent,
        }
    }
}

/// Compress `data`, returning the new bytes and a size report.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn compress_pdf(data: &[u8]) -> Result<(Vec<u8>, CompressionReport)> {
    let mut document = Document::load_mem(data)
        .map_err(|err| PagewerkError::UnreadableDocument(err.to_string()))?;

    document.trailer.remove(b"Info");
    document.delete_zero_length_streams();
    document.prune_objects();
    document.renumber_objects();
    document.compress();

    let mut output = Vec::new();
    document.save_to(&mut output).map_err(|err| {
        PagewerkError::PdfError(format!("failed to serialise compressed PDF: {err}"))
    })?;

    let report = CompressionReport::new(data.len(), output.len());
    info!(
        original = report.original_size,
        compressed = report.compressed_size,
        reduction = report.reduction_percent,
        "PDF compressed"
    );
    Ok((output, report))
}
