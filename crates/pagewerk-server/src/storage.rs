// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transient on-disk file storage.
//
// Uploads live in one directory as `{uuid}_{sanitised name}`; produced
// artifacts live in another as `{prefix}_{uuid}.{ext}`. Outputs are written
// under a dot-prefixed temporary name and renamed into place, and names
// starting with a dot are never served, so a half-written file is never
// addressable.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pagewerk_core::FileId;
use pagewerk_core::error::{PagewerkError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Longest sanitised original file name kept in a stored name.
const MAX_NAME_LEN: usize = 120;

/// Result of storing an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    /// Fresh identifier of the upload.
    pub id: String,
    /// Name as the client sent it.
    pub filename: String,
    /// Name the file is stored (and later addressed) under.
    pub original_name: String,
}

/// Owner of the upload and output directories.
#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStore {
    /// Use (and create if missing) the two directories.
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        };
        std::fs::create_dir_all(&store.upload_dir)?;
        std::fs::create_dir_all(&store.output_dir)?;
        Ok(store)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Store an uploaded file under a fresh unique name.
    pub async fn save_upload(&self, client_name: &str, data: &[u8]) -> Result<StoredUpload> {
        let id = FileId::new().to_string();
        let stored = format!("{id}_{}", sanitise_file_name(client_name));
        write_atomically(&self.upload_dir, &stored, data).await?;
        debug!(stored = %stored, bytes = data.len(), "upload stored");
        Ok(StoredUpload {
            id,
            filename: client_name.to_string(),
            original_name: stored,
        })
    }

    /// Publish a produced artifact, returning its download name.
    pub async fn publish(&self, prefix: &str, extension: &str, data: &[u8]) -> Result<String> {
        let name = format!("{prefix}_{}.{extension}", FileId::new());
        write_atomically(&self.output_dir, &name, data).await?;
        info!(name = %name, bytes = data.len(), "artifact published");
        Ok(name)
    }

    /// Path of an uploaded file.
    pub fn upload_path(&self, name: &str) -> Result<PathBuf> {
        existing(&self.upload_dir, name)
    }

    /// Path of a produced artifact.
    pub fn output_path(&self, name: &str) -> Result<PathBuf> {
        existing(&self.output_dir, name)
    }

    /// Read an operation input: an upload, or failing that an earlier
    /// output so results can be chained.
    pub async fn read_input(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.upload_path(name).or_else(|_| self.output_path(name))?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Delete `name` from both directories, returning how many files went.
    pub async fn delete(&self, name: &str) -> usize {
        let mut deleted = 0;
        for dir in [&self.upload_dir, &self.output_dir] {
            let Ok(path) = existing(dir, name) else {
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!(path = %path.display(), %err, "failed to delete file"),
            }
        }
        deleted
    }

    /// Delete every file in both directories last modified more than
    /// `max_age` ago. Returns the number deleted.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let cutoff = SystemTime::now().checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut deleted = 0;
        for dir in [&self.upload_dir, &self.output_dir] {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "cannot list directory for sweep");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let stale = entry
                    .metadata()
                    .ok()
                    .filter(|meta| meta.is_file())
                    .and_then(|meta| meta.modified().ok())
                    .is_some_and(|modified| modified < cutoff);
                if !stale {
                    continue;
                }
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "swept stale file");
                        deleted += 1;
                    }
                    Err(err) => warn!(path = %path.display(), %err, "failed to sweep file"),
                }
            }
        }
        deleted
    }
}

/// Reduce a client-supplied name to a safe single path component.
pub fn sanitise_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "file".into();
    }
    // Keep the tail so the extension survives truncation.
    let skip = cleaned.chars().count().saturating_sub(MAX_NAME_LEN);
    cleaned.chars().skip(skip).collect()
}

/// Resolve `name` inside `dir`, refusing anything that is not a plain,
/// visible file name.
fn existing(dir: &Path, name: &str) -> Result<PathBuf> {
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().is_some_and(|f| f == name);
    if !plain {
        return Err(PagewerkError::NotFound(name.to_string()));
    }
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PagewerkError::NotFound(name.to_string()))
    }
}

async fn write_atomically(dir: &Path, name: &str, data: &[u8]) -> Result<()> {
    let temp = dir.join(format!(".{name}.{}.part", FileId::new()));
    if let Err(err) = tokio::fs::write(&temp, data).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err.into());
    }
    if let Err(err) = tokio::fs::rename(&temp, dir.join(name)).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store =
            FileStore::new(dir.path().join("uploads"), dir.path().join("merged")).expect("store");
        (dir, store)
    }

    #[test]
    fn names_are_sanitised() {
        assert_eq!(sanitise_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitise_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitise_file_name("C:\\docs\\my file.pdf"), "my_file.pdf");
        assert_eq!(sanitise_file_name("..."), "file");
        assert_eq!(sanitise_file_name(""), "file");
        let long = format!("{}.pdf", "a".repeat(500));
        let kept = sanitise_file_name(&long);
        assert_eq!(kept.len(), MAX_NAME_LEN);
        assert!(kept.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn uploads_round_trip() {
        let (_dir, store) = store();
        let stored = store.save_upload("a b.pdf", b"%PDF-1.7").await.expect("save");
        assert!(stored.original_name.ends_with("_a_b.pdf"));
        assert!(stored.original_name.starts_with(&stored.id));
        assert_eq!(store.read_input(&stored.original_name).await.expect("read"), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn outputs_are_readable_as_inputs() {
        let (_dir, store) = store();
        let name = store.publish("merged", "pdf", b"data").await.expect("publish");
        assert!(name.starts_with("merged_") && name.ends_with(".pdf"));
        assert!(store.output_path(&name).is_ok());
        assert!(store.upload_path(&name).is_err());
        assert_eq!(store.read_input(&name).await.expect("read"), b"data");
    }

    #[tokio::test]
    async fn traversal_and_hidden_names_are_not_found() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("secret.txt"), b"x").expect("write");
        std::fs::write(store.output_dir().join(".hidden"), b"x").expect("write");
        for name in ["../secret.txt", ".hidden", "", "a/b", "..\\secret.txt"] {
            assert!(matches!(
                store.output_path(name),
                Err(PagewerkError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn delete_counts_files_removed() {
        let (_dir, store) = store();
        let stored = store.save_upload("x.pdf", b"1").await.expect("save");
        assert_eq!(store.delete(&stored.original_name).await, 1);
        assert_eq!(store.delete(&stored.original_name).await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_files() {
        let (_dir, store) = store();
        let name = store.publish("split", "pdf", b"fresh").await.expect("publish");
        assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
        assert!(store.output_path(&name).is_ok());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.sweep(Duration::from_millis(1)), 1);
        assert!(store.output_path(&name).is_err());
    }
}
