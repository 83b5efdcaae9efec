// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Buffered multipart forms: file parts plus plain text fields.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use pagewerk_core::PagewerkError;

use crate::error::ApiResult;

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// A fully read multipart body.
#[derive(Debug, Default)]
pub struct Form {
    files: Vec<(String, FilePart)>,
    fields: HashMap<String, String>,
}

impl Form {
    /// Drain `multipart`. Parts with a file name are files, the rest are
    /// text fields (last value wins).
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?.to_vec();
                    form.files.push((name, FilePart { file_name, data }));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// The first file part called `name`.
    pub fn file(&self, name: &str) -> Result<&FilePart, PagewerkError> {
        self.files
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, part)| part)
            .ok_or_else(|| PagewerkError::invalid_parameter(name, "file part is missing"))
    }

    /// Every file part called `name`, in upload order.
    pub fn files(&self, name: &str) -> Vec<&FilePart> {
        self.files
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, part)| part)
            .collect()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Required text field.
    pub fn require(&self, name: &str) -> Result<&str, PagewerkError> {
        self.text(name)
            .ok_or_else(|| PagewerkError::invalid_parameter(name, "field is missing"))
    }

    /// Parse an optional field, falling back to `default` when absent or blank.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> Result<T, PagewerkError> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                PagewerkError::invalid_parameter(name, format!("`{raw}` is not a valid value"))
            }),
        }
    }
}
