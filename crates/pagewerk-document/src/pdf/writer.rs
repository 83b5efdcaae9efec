// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — new documents from raster images or plain text, via
// `printpdf` 0.8.
//
// printpdf 0.8 is data-oriented: pages are `PdfPage`s holding `Vec<Op>`,
// serialised in one go by `PdfDocument::save()`.

use pagewerk_core::PaperSize;
use pagewerk_core::error::{PagewerkError, Result};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Margin around images and text, in millimetres.
const MARGIN_MM: f32 = 15.0;

/// Resolution images are assumed to have when sizing them on the page.
const IMAGE_DPI: f32 = 150.0;

const TEXT_FONT_SIZE: f32 = 11.0;
const TEXT_LINE_HEIGHT: f32 = 14.0;

/// Lays images or text onto pages of a fixed paper size.
pub struct PdfWriter {
    paper_size: PaperSize,
    title: String,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: "Pagewerk Document".into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w, h) = self.paper_size.dimensions_mm();
        (Mm(w as f32), Mm(h as f32))
    }

    /// One page per image, in the order given. Each image is scaled down to
    /// fit inside the margins (never up) and centred.
    ///
    /// Every input must decode; the first bad one fails the whole call.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn images_to_pdf<B: AsRef<[u8]>>(&self, images: &[B]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(PagewerkError::invalid_parameter("files", "no images provided"));
        }
        info!(paper = ?self.paper_size, "laying out images");

        let (page_w, page_h) = self.page_dimensions();
        let margin = Mm(MARGIN_MM).into_pt().0;
        let usable_w = Mm(page_w.0 - 2.0 * MARGIN_MM).into_pt().0;
        let usable_h = Mm(page_h.0 - 2.0 * MARGIN_MM).into_pt().0;

        let mut doc = PdfDocument::new(&self.title);
        let mut pages = Vec::with_capacity(images.len());

        for (position, bytes) in images.iter().enumerate() {
            let decoded = ::image::load_from_memory(bytes.as_ref()).map_err(|err| {
                PagewerkError::invalid_parameter(
                    "files",
                    format!("image #{} is not a readable image: {err}", position + 1),
                )
            })?;
            let (px_w, px_h) = (decoded.width() as usize, decoded.height() as usize);

            // Alpha and palette images are flattened to RGB.
            let raw = RawImage {
                pixels: RawImageData::U8(decoded.to_rgb8().into_raw()),
                width: px_w,
                height: px_h,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject = doc.add_image(&raw);

            let native_w = px_w as f32 / IMAGE_DPI * 72.0;
            let native_h = px_h as f32 / IMAGE_DPI * 72.0;
            let scale = (usable_w / native_w).min(usable_h / native_h).min(1.0);
            let (drawn_w, drawn_h) = (native_w * scale, native_h * scale);

            let ops = vec![Op::UseXobject {
                id: xobject,
                transform: XObjectTransform {
                    translate_x: Some(Pt(margin + (usable_w - drawn_w) / 2.0)),
                    translate_y: Some(Pt(margin + (usable_h - drawn_h) / 2.0)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];
            debug!(position, px_w, px_h, scale, "image placed");
            pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pages);
        Ok(self.save(&doc))
    }

    /// Flow plain text down the page in Helvetica, wrapping long lines and
    /// breaking pages as needed. Empty input gives one blank page.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn text_to_pdf(&self, text: &str) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();
        let (page_w_pt, page_h_pt) = self.paper_size.dimensions_pt();
        let margin = Mm(MARGIN_MM).into_pt().0;

        // Helvetica averages about half an em per glyph.
        let usable_w_pt = page_w_pt - 2.0 * margin;
        let columns = (usable_w_pt / (0.5 * TEXT_FONT_SIZE)).max(1.0) as usize;
        let rows = ((page_h_pt - 2.0 * margin) / TEXT_LINE_HEIGHT).max(1.0) as usize;

        let lines = wrap_text(text, columns);
        let mut pages: Vec<PdfPage> = lines
            .chunks(rows)
            .map(|chunk| {
                let ops = chunk
                    .iter()
                    .enumerate()
                    .flat_map(|(row, line)| {
                        let y = page_h_pt - margin - row as f32 * TEXT_LINE_HEIGHT;
                        text_line_ops(line, margin, y)
                    })
                    .collect();
                PdfPage::new(page_w, page_h, ops)
            })
            .collect();
        if pages.is_empty() {
            pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }
        debug!(lines = lines.len(), pages = pages.len(), "text laid out");

        let mut doc = PdfDocument::new(&self.title);
        doc.with_pages(pages);
        Ok(self.save(&doc))
    }

    fn save(&self, doc: &PdfDocument) -> Vec<u8> {
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }
        output
    }
}

fn text_line_ops(line: &str, x: f32, y: f32) -> [Op; 5] {
    [
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(TEXT_FONT_SIZE),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

/// Greedy word wrap at `width` characters. Existing newlines are kept and
/// words longer than a line are hard-broken.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            if current.is_empty() {
                current = word;
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(&word);
            } else {
                lines.push(std::mem::replace(&mut current, word));
            }
        }
        lines.push(current);
    }
    lines
}
