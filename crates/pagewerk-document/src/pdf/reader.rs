// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — a read-only view of a loaded source document.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use lopdf::{Dictionary, Document, Object, ObjectId};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, instrument};

/// US Letter, used when a page tree carries no usable `/MediaBox`.
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes a page may inherit from its ancestors in the page tree.
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic `/Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 32;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// A parsed PDF that pages are copied *from*. Never mutated after load.
pub struct PdfReader {
    document: Document,
    /// Page object ids in document order.
    page_ids: Vec<ObjectId>,
    /// Process-unique identity, used to memoise copied objects per source.
    source_id: u64,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Parse raw PDF bytes. Anything lopdf cannot make sense of is reported
    /// as [`PagewerkError::UnreadableDocument`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| PagewerkError::UnreadableDocument(err.to_string()))?;
        Self::from_document(document)
    }

    /// Wrap an already loaded document.
    pub fn from_document(document: Document) -> Result<Self> {
        if document.catalog().is_err() {
            return Err(PagewerkError::UnreadableDocument(
                "document has no catalog".into(),
            ));
        }
        // get_pages is keyed by 1-based page number, so values come out ordered.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "PDF loaded");

        Ok(Self {
            document,
            page_ids,
            source_id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn source_id(&self) -> u64 {
        self.source_id
    }

    /// Object id of the 0-based page `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            PagewerkError::PdfError(format!(
                "page index {index} out of range for {} page document",
                self.page_count()
            ))
        })
    }

    /// The page dictionary of the 0-based page `index`.
    pub fn page_dict(&self, index: usize) -> Result<&Dictionary> {
        let id = self.page_id(index)?;
        self.document
            .get_dictionary(id)
            .map_err(|err| PagewerkError::PdfError(format!("page object {id:?}: {err}")))
    }

    /// Look up a page attribute, walking up the page tree when the page
    /// itself does not carry it. References are resolved.
    pub fn inherited_attribute(&self, index: usize, key: &[u8]) -> Option<Object> {
        let mut dict = self.page_dict(index).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(self.resolve(value).clone());
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Effective `/MediaBox` as `[llx, lly, urx, ury]`, normalised so the
    /// lower-left corner really is lower-left.
    pub fn media_box(&self, index: usize) -> [f32; 4] {
        self.inherited_attribute(index, b"MediaBox")
            .and_then(|value| self.rectangle(&value))
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// Effective visible area: `/CropBox` when present, otherwise the media box.
    pub fn visible_box(&self, index: usize) -> [f32; 4] {
        self.inherited_attribute(index, b"CropBox")
            .and_then(|value| self.rectangle(&value))
            .unwrap_or_else(|| self.media_box(index))
    }

    /// Width and height of the page in points.
    pub fn page_size(&self, index: usize) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.media_box(index);
        (urx - llx, ury - lly)
    }

    /// Effective `/Rotate`, 0 when absent.
    pub fn rotation(&self, index: usize) -> i64 {
        self.inherited_attribute(index, b"Rotate")
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0)
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    fn rectangle(&self, object: &Object) -> Option<[f32; 4]> {
        let values = self.resolve(object).as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut numbers = [0.0_f32; 4];
        for (slot, value) in numbers.iter_mut().zip(values) {
            *slot = self.resolve(value).as_float().ok()?;
        }
        let [x0, y0, x1, y1] = numbers;
        Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
    }
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("pages", &self.page_count())
            .field("source_id", &self.source_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(
            PdfReader::from_bytes(b"definitely not a pdf"),
            Err(PagewerkError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn counts_pages_in_order() {
        let reader = PdfReader::from_bytes(&sample_pdf(4)).expect("load");
        assert_eq!(reader.page_count(), 4);
        // Fixture pages have widths 100, 110, 120, ...
        let widths: Vec<f32> = (0..4).map(|i| reader.page_size(i).0).collect();
        assert_eq!(widths, vec![100.0, 110.0, 120.0, 130.0]);
    }

    #[test]
    fn inherits_attributes_from_the_page_tree() {
        let reader = PdfReader::from_bytes(&sample_pdf(2)).expect("load");
        // The fixture keeps /Resources and /Rotate on the /Pages node only.
        assert!(reader.page_dict(0).expect("page").get(b"Resources").is_err());
        assert!(reader.inherited_attribute(0, b"Resources").is_some());
        assert_eq!(reader.rotation(0), 90);
        assert_eq!(reader.visible_box(1), reader.media_box(1));
    }

    #[test]
    fn out_of_range_page_id_is_an_error() {
        let reader = PdfReader::from_bytes(&sample_pdf(1)).expect("load");
        assert!(reader.page_id(1).is_err());
    }

    #[test]
    fn readers_get_distinct_identities() {
        let a = PdfReader::from_bytes(&sample_pdf(1)).expect("load");
        let b = PdfReader::from_bytes(&sample_pdf(1)).expect("load");
        assert_ne!(a.source_id(), b.source_id());
    }
}
