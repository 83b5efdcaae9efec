// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page transforms carried by an output plan.

use pagewerk_core::error::{PagewerkError, Result};

use super::overlay::Overlay;

/// Operation applied to a single page while it is copied into the output.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Turn the page clockwise.
    Rotate(Rotation),
    /// Trim the visible area.
    Crop(CropMargins),
    /// Stamp synthesized content (watermark, page number, annotation) on top.
    Overlay(Overlay),
}

/// A clockwise rotation in whole quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation(i32);

impl Rotation {
    /// Accepts any multiple of 90, including negative (counter-clockwise)
    /// values.
    pub fn new(degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(PagewerkError::invalid_parameter(
                "angle",
                format!("rotation must be a multiple of 90, got {degrees}"),
            ));
        }
        Ok(Self(degrees))
    }

    pub fn degrees(&self) -> i32 {
        self.0
    }

    /// Combine with a page's existing `/Rotate` value, normalised to
    /// `0..360`.
    pub fn applied_to(&self, existing: i64) -> i64 {
        // Reduce first: `/Rotate` comes from the file and may be any i64.
        (existing.rem_euclid(360) + i64::from(self.0).rem_euclid(360)).rem_euclid(360)
    }
}

/// Margins trimmed from each edge of a page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropMargins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl CropMargins {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Result<Self> {
        for (name, value) in [
            ("top", top),
            ("bottom", bottom),
            ("left", left),
            ("right", right),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PagewerkError::invalid_parameter(
                    name,
                    format!("crop margin must be a non-negative number, got {value}"),
                ));
            }
        }
        Ok(Self {
            top,
            bottom,
            left,
            right,
        })
    }

    /// Shrink a `[llx, lly, urx, ury]` box. Fails when nothing would remain.
    pub fn apply(&self, page_box: [f32; 4]) -> Result<[f32; 4]> {
        let [llx, lly, urx, ury] = page_box;
        let cropped = [
            llx + self.left,
            lly + self.bottom,
            urx - self.right,
            ury - self.top,
        ];
        if cropped[2] <= cropped[0] || cropped[3] <= cropped[1] {
            return Err(PagewerkError::invalid_parameter(
                "margins",
                format!(
                    "cropping {:.1}x{:.1} page by {self:?} leaves no visible area",
                    urx - llx,
                    ury - lly
                ),
            ));
        }
        Ok(cropped)
    }
}
