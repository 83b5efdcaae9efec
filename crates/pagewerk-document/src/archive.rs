// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip bundles for multi-file results (separate split pages, rasterised pages).

use std::io::{Cursor, Write};

use pagewerk_core::error::{PagewerkError, Result};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Deflate `entries` into an in-memory zip archive, preserving order.
pub fn zip_entries<I, N>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (N, Vec<u8>)>,
    N: Into<String>,
{
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in entries {
        let name: String = name.into();
        zip.start_file(name.as_str(), options)
            .map_err(|err| zip_error(&name, err))?;
        zip.write_all(&data)?;
    }

    let cursor = zip.finish().map_err(|err| zip_error("archive", err))?;
    Ok(cursor.into_inner())
}

fn zip_error(name: &str, err: zip::result::ZipError) -> PagewerkError {
    PagewerkError::Io(std::io::Error::other(format!("zip entry {name}: {err}")))
}
