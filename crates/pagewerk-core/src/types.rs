// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk document service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier assigned to every stored upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-chosen identifier grouping the files of one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document formats the service accepts or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    PlainText,
    /// Word processing documents (DOCX, DOC, ODT, RTF).
    WordProcessing,
    /// Spreadsheets (XLSX, XLS, ODS).
    Spreadsheet,
    /// Presentations (PPTX, PPT, ODP).
    Presentation,
    /// Zip archive bundling several outputs.
    Zip,
}

impl DocumentType {
    /// MIME type string for Content-Type headers.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::PlainText => "text/plain",
            Self::WordProcessing => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::Presentation => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Zip => "application/zip",
        }
    }

    /// Canonical file extension used when this type is produced.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::PlainText => "txt",
            Self::WordProcessing => "docx",
            Self::Spreadsheet => "xlsx",
            Self::Presentation => "pptx",
            Self::Zip => "zip",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "txt" => Some(Self::PlainText),
            "docx" | "doc" | "odt" | "rtf" => Some(Self::WordProcessing),
            "xlsx" | "xls" | "ods" => Some(Self::Spreadsheet),
            "pptx" | "ppt" | "odp" => Some(Self::Presentation),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Infer document type from a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Whether the office suite is needed to turn this type into a PDF.
    pub fn is_office(&self) -> bool {
        matches!(
            self,
            Self::WordProcessing | Self::Spreadsheet | Self::Presentation | Self::PlainText
        )
    }

    /// Whether this is a raster image format.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Tiff)
    }
}

/// Standard paper sizes, used when images are laid out onto PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w as f32 * 72.0 / 25.4, h as f32 * 72.0 / 25.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_from_file_name() {
        assert_eq!(
            DocumentType::from_file_name("report.final.PDF"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(
            DocumentType::from_file_name("notes.odt"),
            Some(DocumentType::WordProcessing)
        );
        assert_eq!(DocumentType::from_file_name("no-extension"), None);
        assert_eq!(DocumentType::from_file_name("archive.rar"), None);
    }

    #[test]
    fn office_and_image_predicates() {
        assert!(DocumentType::Spreadsheet.is_office());
        assert!(!DocumentType::Pdf.is_office());
        assert!(DocumentType::Png.is_image());
        assert!(!DocumentType::Zip.is_image());
    }

    #[test]
    fn a4_in_points() {
        let (w, h) = PaperSize::A4.dimensions_pt();
        assert!((w - 595.28).abs() < 0.1);
        assert!((h - 841.89).abs() < 0.1);
    }
}
