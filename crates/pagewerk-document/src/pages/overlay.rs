// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay layout — where synthesized text lands on a page.
//
// Coordinates are PDF user space: origin bottom-left, y grows upward, units
// are points. Every placement names the *centre* of the text run; the
// renderer centres the string on it and rotates about it.

use std::str::FromStr;

use pagewerk_core::error::{PagewerkError, Result};
use serde::Deserialize;

/// Distance from the page edges used by watermark anchors.
pub const WATERMARK_MARGIN: f32 = 100.0;

/// Distance from the page edges used by page-number anchors.
pub const PAGE_NUMBER_MARGIN: f32 = 36.0;

/// Upper bound on `repeat_x * repeat_y` for tiled placements.
pub const MAX_TILES: u32 = 400;

/// Named positions relative to the page box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Anchor {
    /// Fixed-margin coordinate for this anchor on a `width` x `height` page.
    pub fn point(&self, width: f32, height: f32, margin: f32) -> (f32, f32) {
        match self {
            Self::Center => (width / 2.0, height / 2.0),
            Self::TopLeft => (margin, height - margin),
            Self::TopRight => (width - margin, height - margin),
            Self::BottomLeft => (margin, margin),
            Self::BottomRight => (width - margin, margin),
        }
    }
}

impl FromStr for Anchor {
    type Err = PagewerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(Self::Center),
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(PagewerkError::invalid_parameter(
                "position",
                format!("unknown position `{other}`"),
            )),
        }
    }
}

/// Where the copies of an overlay layer go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// A single copy at a named anchor.
    Anchor { anchor: Anchor, margin: f32 },
    /// An evenly spaced `repeat_x` x `repeat_y` grid.
    Tiled { repeat_x: u32, repeat_y: u32 },
    /// A single copy at an explicit point.
    At { x: f32, y: f32 },
}

impl Placement {
    /// Parse a watermark `position` form value: an anchor name or `tiled`.
    pub fn from_position(
        position: &str,
        margin: f32,
        repeat_x: u32,
        repeat_y: u32,
    ) -> Result<Self> {
        if position.trim().eq_ignore_ascii_case("tiled") {
            Self::tiled(repeat_x, repeat_y)
        } else {
            Ok(Self::Anchor {
                anchor: position.parse()?,
                margin,
            })
        }
    }

    pub fn tiled(repeat_x: u32, repeat_y: u32) -> Result<Self> {
        if repeat_x == 0 || repeat_y == 0 {
            return Err(PagewerkError::invalid_parameter(
                "repeat",
                "tiled placement needs at least one row and one column",
            ));
        }
        if repeat_x.saturating_mul(repeat_y) > MAX_TILES {
            return Err(PagewerkError::invalid_parameter(
                "repeat",
                format!("at most {MAX_TILES} tiles per page"),
            ));
        }
        Ok(Self::Tiled { repeat_x, repeat_y })
    }

    /// Resolve to concrete points on a `width` x `height` page.
    pub fn points(&self, width: f32, height: f32) -> Vec<(f32, f32)> {
        match *self {
            Self::Anchor { anchor, margin } => vec![anchor.point(width, height, margin)],
            Self::At { x, y } => vec![(x, y)],
            Self::Tiled { repeat_x, repeat_y } => {
                let spacing_x = width / (repeat_x + 1) as f32;
                let spacing_y = height / (repeat_y + 1) as f32;
                (1..=repeat_x)
                    .flat_map(|i| {
                        (1..=repeat_y).map(move |j| (spacing_x * i as f32, spacing_y * j as f32))
                    })
                    .collect()
            }
        }
    }
}

/// An RGB fill colour, channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const GRAY: Self = Self {
        r: 128.0 / 255.0,
        g: 128.0 / 255.0,
        b: 128.0 / 255.0,
    };

    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse `#rrggbb` / `rrggbb` / `#rgb`.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| {
            u8::from_str_radix(expanded.get(i..i + 2)?, 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Parse a hex colour, falling back to `fallback` on anything unreadable.
    pub fn parse_or(hex: &str, fallback: Self) -> Self {
        Self::parse_hex(hex).unwrap_or(fallback)
    }
}

/// Font and paint settings for one text layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Rgb,
    /// Fill opacity, `0.0..=1.0`.
    pub opacity: f32,
    /// Counter-clockwise rotation about the placement point, in degrees.
    pub rotation: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: Rgb::BLACK,
            opacity: 1.0,
            rotation: 0.0,
        }
    }
}

impl TextStyle {
    pub fn validated(self) -> Result<Self> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 || self.font_size > 1000.0 {
            return Err(PagewerkError::invalid_parameter(
                "font_size",
                format!("must be between 0 and 1000, got {}", self.font_size),
            ));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(PagewerkError::invalid_parameter(
                "opacity",
                format!("must be between 0 and 1, got {}", self.opacity),
            ));
        }
        if !self.rotation.is_finite() {
            return Err(PagewerkError::invalid_parameter("rotation", "must be a number"));
        }
        Ok(self)
    }
}

/// One piece of text drawn at one or more points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub text: String,
    pub style: TextStyle,
    pub placement: Placement,
}

/// Everything stamped onto a single page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub layers: Vec<TextLayer>,
}

impl Overlay {
    pub fn single(layer: TextLayer) -> Self {
        Self {
            layers: vec![layer],
        }
    }

    pub fn push(&mut self, layer: TextLayer) {
        self.layers.push(layer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiled_two_by_one_splits_width_in_thirds() {
        let (w, h) = (600.0, 800.0);
        let points = Placement::tiled(2, 1).expect("tiled").points(w, h);
        assert_eq!(points, vec![(w / 3.0, h / 2.0), (2.0 * w / 3.0, h / 2.0)]);
    }

    #[test]
    fn tiled_grid_size() {
        let points = Placement::tiled(3, 4).expect("tiled").points(612.0, 792.0);
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|&(x, y)| x > 0.0 && x < 612.0 && y > 0.0 && y < 792.0));
    }

    #[test]
    fn tiled_rejects_empty_and_huge_grids() {
        assert!(Placement::tiled(0, 3).is_err());
        assert!(Placement::tiled(100, 100).is_err());
    }

    #[test]
    fn anchors_use_fixed_margin() {
        let (w, h, m) = (612.0, 792.0, WATERMARK_MARGIN);
        assert_eq!(Anchor::Center.point(w, h, m), (306.0, 396.0));
        assert_eq!(Anchor::TopLeft.point(w, h, m), (100.0, 692.0));
        assert_eq!(Anchor::TopRight.point(w, h, m), (512.0, 692.0));
        assert_eq!(Anchor::BottomLeft.point(w, h, m), (100.0, 100.0));
        assert_eq!(Anchor::BottomRight.point(w, h, m), (512.0, 100.0));
    }

    #[test]
    fn position_strings() {
        assert_eq!(
            Placement::from_position("bottom-right", 36.0, 1, 1).expect("anchor"),
            Placement::Anchor {
                anchor: Anchor::BottomRight,
                margin: 36.0
            }
        );
        assert_eq!(
            Placement::from_position("TILED", 100.0, 2, 2).expect("tiled"),
            Placement::Tiled {
                repeat_x: 2,
                repeat_y: 2
            }
        );
        assert!(Placement::from_position("middle", 100.0, 1, 1).is_err());
    }

    #[test]
    fn hex_colours() {
        let red = Rgb::parse_hex("#ff0000").expect("red");
        assert_eq!((red.r, red.g, red.b), (1.0, 0.0, 0.0));
        assert_eq!(Rgb::parse_hex("fff"), Some(Rgb { r: 1.0, g: 1.0, b: 1.0 }));
        assert_eq!(Rgb::parse_or("not-a-colour", Rgb::GRAY), Rgb::GRAY);
        assert_eq!(Rgb::parse_hex("#12345"), None);
    }

    #[test]
    fn style_validation() {
        let ok = TextStyle {
            font_size: 60.0,
            color: Rgb::GRAY,
            opacity: 0.3,
            rotation: 45.0,
        };
        assert!(ok.validated().is_ok());
        assert!(TextStyle { opacity: 1.5, ..ok }.validated().is_err());
        assert!(TextStyle { font_size: 0.0, ..ok }.validated().is_err());
    }
}
