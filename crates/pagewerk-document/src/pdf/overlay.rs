// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay renderer — turns overlay layers into a PDF content stream drawn
// with the standard Helvetica-Bold font.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object};
use pagewerk_core::error::{PagewerkError, Result};

use crate::pages::overlay::{Overlay, TextLayer};

/// Resource name of the overlay font inside `/Resources /Font`.
pub const FONT_RESOURCE: &str = "PagewerkOverlayF1";

/// Prefix for overlay graphics states inside `/Resources /ExtGState`.
pub const GSTATE_PREFIX: &str = "PagewerkOverlayGS";

/// Rough average advance of a Helvetica-Bold glyph, as a fraction of the
/// font size. Used only to centre text on its anchor.
const AVERAGE_GLYPH_WIDTH: f32 = 0.55;

/// Resource names one stamp registers on a page.
///
/// Generation 0 uses the bare names; later generations are suffixed so a
/// page stamped more than once keeps every earlier overlay's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayNames {
    pub font: String,
    pub gstate_prefix: String,
}

impl OverlayNames {
    pub fn generation(n: usize) -> Self {
        if n == 0 {
            return Self::default();
        }
        Self {
            font: format!("{FONT_RESOURCE}_{n}"),
            gstate_prefix: format!("{GSTATE_PREFIX}{n}_"),
        }
    }

    /// First generation whose names are absent from `fonts` and `states`.
    pub fn unused(fonts: &Dictionary, states: &Dictionary) -> Self {
        (0..)
            .map(Self::generation)
            .find(|names| {
                !fonts.has(names.font.as_bytes())
                    && !states
                        .iter()
                        .any(|(key, _)| key.starts_with(names.gstate_prefix.as_bytes()))
            })
            .unwrap_or_default()
    }
}

impl Default for OverlayNames {
    fn default() -> Self {
        Self {
            font: FONT_RESOURCE.to_string(),
            gstate_prefix: GSTATE_PREFIX.to_string(),
        }
    }
}

/// A rendered overlay: the content stream plus the resources it names.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    pub content: Vec<u8>,
    /// `(resource name, opacity)` for every graphics state used.
    pub graphics_states: Vec<(String, f32)>,
}

impl RenderedOverlay {
    /// Font dictionary to register under [`OverlayNames::font`].
    pub fn font_dictionary() -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica-Bold".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    /// Graphics-state dictionary applying `opacity` to fills and strokes.
    pub fn graphics_state_dictionary(opacity: f32) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"ExtGState".to_vec())),
            ("ca", Object::Real(opacity)),
            ("CA", Object::Real(opacity)),
        ])
    }
}

/// Render every layer of `overlay` for a page whose visible box is
/// `page_box`, naming resources after `names`.
///
/// Placement coordinates are relative to the lower-left corner of the box.
pub fn render_overlay(
    page_box: [f32; 4],
    overlay: &Overlay,
    names: &OverlayNames,
) -> Result<RenderedOverlay> {
    let [llx, lly, urx, ury] = page_box;
    let (width, height) = (urx - llx, ury - lly);

    let mut operations = Vec::new();
    let mut graphics_states = Vec::new();

    for (index, layer) in overlay.layers.iter().enumerate() {
        let gstate = (layer.style.opacity < 1.0).then(|| {
            let name = format!("{}{index}", names.gstate_prefix);
            graphics_states.push((name.clone(), layer.style.opacity));
            name
        });

        for (x, y) in layer.placement.points(width, height) {
            let text = TextRun {
                layer,
                font: &names.font,
                gstate: gstate.as_deref(),
            };
            draw_text(&mut operations, &text, llx + x, lly + y);
        }
    }

    let content = Content { operations }
        .encode()
        .map_err(|err| PagewerkError::PdfError(format!("failed to encode overlay: {err}")))?;

    Ok(RenderedOverlay {
        content,
        graphics_states,
    })
}

struct TextRun<'a> {
    layer: &'a TextLayer,
    font: &'a str,
    gstate: Option<&'a str>,
}

/// One centred, rotated copy of the run's layer at `(x, y)`.
fn draw_text(ops: &mut Vec<Operation>, run: &TextRun<'_>, x: f32, y: f32) {
    let layer = run.layer;
    let style = &layer.style;
    let encoded = encode_win_ansi(&layer.text);
    let text_width = encoded.len() as f32 * style.font_size * AVERAGE_GLYPH_WIDTH;

    let (sin, cos) = style.rotation.to_radians().sin_cos();
    // Shift back by half the run along the rotated baseline.
    let origin_x = x - cos * text_width / 2.0;
    let origin_y = y - sin * text_width / 2.0;

    ops.push(Operation::new("q", vec![]));
    if let Some(name) = run.gstate {
        ops.push(Operation::new("gs", vec![Object::Name(name.as_bytes().to_vec())]));
    }
    ops.push(Operation::new(
        "rg",
        vec![
            Object::Real(style.color.r),
            Object::Real(style.color.g),
            Object::Real(style.color.b),
        ],
    ));
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![
            Object::Name(run.font.as_bytes().to_vec()),
            Object::Real(style.font_size),
        ],
    ));
    ops.push(Operation::new(
        "Tm",
        vec![
            Object::Real(cos),
            Object::Real(sin),
            Object::Real(-sin),
            Object::Real(cos),
            Object::Real(origin_x),
            Object::Real(origin_y),
        ],
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(encoded)]));
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

/// Map text onto single-byte WinAnsi codes. Characters outside Latin-1
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::overlay::{Anchor, Placement, Rgb, TextStyle};

    fn layer(text: &str, opacity: f32, placement: Placement) -> TextLayer {
        TextLayer {
            text: text.into(),
            style: TextStyle {
                font_size: 20.0,
                color: Rgb::GRAY,
                opacity,
                rotation: 0.0,
            },
            placement,
        }
    }

    fn operators(content: &[u8]) -> Vec<String> {
        Content::decode(content)
            .expect("decode")
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn tiled_layer_draws_every_tile() {
        let overlay = Overlay::single(layer("DRAFT", 1.0, Placement::tiled(2, 3).expect("tiled")));
        let rendered =
            render_overlay([0.0, 0.0, 612.0, 792.0], &overlay, &OverlayNames::default())
                .expect("render");
        let text_ops = operators(&rendered.content)
            .iter()
            .filter(|op| op.as_str() == "Tj")
            .count();
        assert_eq!(text_ops, 6);
        assert!(rendered.graphics_states.is_empty());
    }

    #[test]
    fn translucent_layers_get_graphics_states() {
        let mut overlay = Overlay::default();
        overlay.push(layer("A", 0.3, Placement::At { x: 10.0, y: 10.0 }));
        overlay.push(layer("B", 1.0, Placement::At { x: 20.0, y: 20.0 }));
        let rendered = render_overlay([0.0, 0.0, 100.0, 100.0], &overlay, &OverlayNames::default())
            .expect("render");
        assert_eq!(
            rendered.graphics_states,
            vec![(format!("{GSTATE_PREFIX}0"), 0.3)]
        );
        assert!(operators(&rendered.content).contains(&"gs".to_string()));
    }

    #[test]
    fn text_is_centred_on_its_anchor() {
        let overlay = Overlay::single(layer(
            "ABCD",
            1.0,
            Placement::Anchor {
                anchor: Anchor::Center,
                margin: 100.0,
            },
        ));
        let rendered = render_overlay([0.0, 0.0, 200.0, 100.0], &overlay, &OverlayNames::default())
            .expect("render");
        let content = Content::decode(&rendered.content).expect("decode");
        let tm = content
            .operations
            .iter()
            .find(|op| op.operator == "Tm")
            .expect("Tm");
        // Four glyphs at 20pt are ~44pt wide, so the run starts at 100 - 22.
        let x = tm.operands[4].as_float().expect("x");
        assert!((x - 78.0).abs() < 0.01, "x = {x}");
    }

    #[test]
    fn box_origin_offsets_placements() {
        let overlay = Overlay::single(layer("", 1.0, Placement::At { x: 5.0, y: 5.0 }));
        let rendered =
            render_overlay([50.0, 60.0, 250.0, 260.0], &overlay, &OverlayNames::default())
                .expect("render");
        let content = Content::decode(&rendered.content).expect("decode");
        let tm = content
            .operations
            .iter()
            .find(|op| op.operator == "Tm")
            .expect("Tm");
        assert_eq!(tm.operands[4].as_float().expect("x"), 55.0);
        assert_eq!(tm.operands[5].as_float().expect("y"), 65.0);
    }

    #[test]
    fn later_generations_use_distinct_names() {
        let overlay = Overlay::single(layer("X", 0.5, Placement::At { x: 1.0, y: 1.0 }));
        let names = OverlayNames::generation(2);
        let rendered = render_overlay([0.0, 0.0, 100.0, 100.0], &overlay, &names)
            .expect("render");
        assert_eq!(
            rendered.graphics_states,
            vec![(format!("{GSTATE_PREFIX}2_0"), 0.5)]
        );
        let content = Content::decode(&rendered.content).expect("decode");
        let tf = content
            .operations
            .iter()
            .find(|op| op.operator == "Tf")
            .expect("Tf");
        assert_eq!(
            tf.operands[0].as_name().expect("font"),
            format!("{FONT_RESOURCE}_2").as_bytes()
        );
    }

    #[test]
    fn unused_names_skip_taken_generations() {
        let fonts = Dictionary::from_iter([(FONT_RESOURCE, Object::Null)]);
        let states = Dictionary::from_iter([(format!("{GSTATE_PREFIX}1_0"), Object::Null)]);
        assert_eq!(OverlayNames::unused(&fonts, &states), OverlayNames::generation(2));
        assert_eq!(
            OverlayNames::unused(&Dictionary::new(), &Dictionary::new()),
            OverlayNames::default()
        );
    }

    #[test]
    fn non_latin_text_degrades_to_question_marks() {
        assert_eq!(encode_win_ansi("Café"), b"Caf\xe9".to_vec());
        assert_eq!(encode_win_ansi("页"), b"?".to_vec());
    }
}
