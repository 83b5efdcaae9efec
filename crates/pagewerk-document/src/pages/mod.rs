// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection and composition: range parsing, output plans, per-page
// transforms and overlay layout. Pure logic, no PDF I/O.

pub mod compositor;
pub mod overlay;
pub mod range;
pub mod transform;

pub use compositor::{Annotation, OutputPlan, PageNumbering, PlannedPage};
pub use overlay::{
    Anchor, Overlay, PAGE_NUMBER_MARGIN, Placement, Rgb, TextLayer, TextStyle, WATERMARK_MARGIN,
};
pub use range::{DroppedPage, PageTarget, ResolvedPageSet, Resolution};
pub use transform::{CropMargins, Rotation, Transform};
