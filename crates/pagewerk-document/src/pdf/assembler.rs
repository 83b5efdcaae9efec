// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler — builds a new document by copying pages out of source
// readers, applying per-page transforms on the way.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, info, instrument, warn};

use super::overlay::{OverlayNames, RenderedOverlay, render_overlay};
use super::reader::{INHERITABLE_KEYS, PdfReader};
use crate::pages::compositor::OutputPlan;
use crate::pages::overlay::Overlay;
use crate::pages::transform::Transform;

/// Output document under construction.
///
/// Objects referenced by copied pages are cloned once per source document,
/// so pages sharing fonts or images keep sharing them in the output.
pub struct PdfAssembler {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    copied: HashMap<(u64, ObjectId), ObjectId>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy the 0-based page `index` of `source` to the end of the output,
    /// applying `transform` to the copy only.
    pub fn add_page(
        &mut self,
        source: &PdfReader,
        index: usize,
        transform: Option<&Transform>,
    ) -> Result<()> {
        let source_page_id = source.page_id(index)?;
        let source_page = source.page_dict(index)?;

        // Each added page gets its own dictionary, even for repeats, so a
        // transform on one copy never leaks into another.
        let page_id = self.document.new_object_id();
        self.copied.insert((source.source_id(), source_page_id), page_id);

        let mut page = Dictionary::new();
        for (key, value) in source_page.iter() {
            if key == b"Parent" {
                continue;
            }
            page.set(key.clone(), self.clone_object(source, value));
        }
        for key in INHERITABLE_KEYS {
            if page.get(key).is_err()
                && let Some(value) = source.inherited_attribute(index, key)
            {
                page.set(key.to_vec(), self.clone_object(source, &value));
            }
        }
        page.set("Parent", Object::Reference(self.pages_id));

        if let Some(transform) = transform {
            self.apply(&mut page, source, index, transform)?;
        }

        self.document.objects.insert(page_id, Object::Dictionary(page));
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    /// Serialise the assembled document.
    #[instrument(skip(self), fields(pages = self.kids.len()))]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.kids.is_empty() {
            return Err(PagewerkError::EmptyResult);
        }

        let count = self.kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(std::mem::take(&mut self.kids))),
                ("Count", Object::Integer(count)),
            ])),
        );
        let catalog_id = self.document.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.compress();

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            PagewerkError::PdfError(format!("failed to serialise assembled PDF: {err}"))
        })?;
        debug!(output_bytes = output.len(), "PDF assembled");
        Ok(output)
    }

    // -- Transforms -----------------------------------------------------------

    fn apply(
        &mut self,
        page: &mut Dictionary,
        source: &PdfReader,
        index: usize,
        transform: &Transform,
    ) -> Result<()> {
        match transform {
            Transform::Rotate(rotation) => {
                let rotate = rotation.applied_to(source.rotation(index));
                page.set("Rotate", Object::Integer(rotate));
            }
            Transform::Crop(margins) => {
                let cropped = margins.apply(source.visible_box(index))?;
                let rect = Object::Array(cropped.iter().map(|&v| Object::Real(v)).collect());
                page.set("MediaBox", rect.clone());
                page.set("CropBox", rect);
            }
            Transform::Overlay(overlay) => {
                self.stamp(page, source.visible_box(index), overlay)?;
            }
        }
        Ok(())
    }

    /// Draw `overlay` above the page's existing content.
    fn stamp(
        &mut self,
        page: &mut Dictionary,
        page_box: [f32; 4],
        overlay: &Overlay,
    ) -> Result<()> {
        let mut resources = self.inline_dictionary(page.get(b"Resources").ok());
        let mut fonts = self.inline_dictionary(resources.get(b"Font").ok());
        let mut states = self.inline_dictionary(resources.get(b"ExtGState").ok());

        // A page stamped before keeps its earlier overlay resources.
        let names = OverlayNames::unused(&fonts, &states);
        let rendered = render_overlay(page_box, overlay, &names)?;

        fonts.set(names.font.as_bytes().to_vec(), RenderedOverlay::font_dictionary());
        resources.set("Font", Object::Dictionary(fonts));
        if !rendered.graphics_states.is_empty() {
            for (name, opacity) in &rendered.graphics_states {
                states.set(
                    name.as_bytes().to_vec(),
                    RenderedOverlay::graphics_state_dictionary(*opacity),
                );
            }
            resources.set("ExtGState", Object::Dictionary(states));
        }
        page.set("Resources", Object::Dictionary(resources));

        let mut contents = vec![Object::Reference(self.add_stream(b"q\n".to_vec()))];
        match page.get(b"Contents") {
            Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
            Ok(Object::Reference(id)) => match self.document.get_object(*id) {
                // An indirect array is spliced so /Contents never nests arrays.
                Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
                _ => contents.push(Object::Reference(*id)),
            },
            Ok(other) => warn!(?other, "unexpected /Contents type, overlaying on blank page"),
            Err(_) => {}
        }
        contents.push(Object::Reference(self.add_stream(b"\nQ\n".to_vec())));
        contents.push(Object::Reference(self.add_stream(rendered.content)));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn add_stream(&mut self, content: Vec<u8>) -> ObjectId {
        self.document
            .add_object(Object::Stream(Stream::new(Dictionary::new(), content)))
    }

    /// A private copy of a (possibly referenced) dictionary in the output,
    /// so edits to one page never touch objects shared with others.
    fn inline_dictionary(&self, object: Option<&Object>) -> Dictionary {
        let resolved = match object {
            Some(Object::Reference(id)) => self.document.get_object(*id).ok(),
            other => other,
        };
        match resolved {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        }
    }

    // -- Object copying -------------------------------------------------------

    /// Deep-copy `object` from `source`, rewriting references to point at
    /// copies in the output. `/Parent` links are dropped; the page tree is
    /// rebuilt by [`PdfAssembler::finish`].
    fn clone_object(&mut self, source: &PdfReader, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.clone_reference(source, *id)),
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_object(source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(source, &stream.dict);
                let mut copy = Stream::new(dict, stream.content.clone());
                copy.allows_compression = stream.allows_compression;
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn clone_dictionary(&mut self, source: &PdfReader, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.clone_object(source, value));
        }
        copy
    }

    fn clone_reference(&mut self, source: &PdfReader, id: ObjectId) -> ObjectId {
        let key = (source.source_id(), id);
        if let Some(&copied) = self.copied.get(&key) {
            return copied;
        }
        // Reserve the id first so reference cycles terminate.
        let new_id = self.document.new_object_id();
        self.copied.insert(key, new_id);

        let copy = match source.document().get_object(id) {
            Ok(object) => self.clone_object(source, object),
            Err(err) => {
                warn!(?id, %err, "dangling reference, replacing with null");
                Object::Null
            }
        };
        self.document.objects.insert(new_id, copy);
        new_id
    }
}

/// Execute `plan` against `sources` (indexed by each entry's `document`).
#[instrument(skip_all, fields(pages = plan.len(), sources = sources.len()))]
pub fn assemble(plan: &OutputPlan, sources: &[&PdfReader]) -> Result<Vec<u8>> {
    let mut assembler = PdfAssembler::new();
    for entry in plan.entries() {
        let source = sources.get(entry.document).ok_or_else(|| {
            PagewerkError::PdfError(format!("plan names missing document #{}", entry.document))
        })?;
        assembler.add_page(source, entry.page, entry.transform.as_ref())?;
    }
    info!(pages = assembler.page_count(), "assembling output PDF");
    assembler.finish()
}
