// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PagewerkError, Result};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "PAGEWERK_CONFIG";

/// Settings for the HTTP service and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory holding uploaded source files.
    pub upload_dir: PathBuf,
    /// Directory holding produced artifacts served by `/download`.
    pub output_dir: PathBuf,
    /// Files and idle sessions older than this are swept.
    pub max_file_age_secs: u64,
    /// How often the background sweep runs.
    pub sweep_interval_secs: u64,
    /// Time budget for every external tool invocation.
    pub tool_timeout_secs: u64,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Allowed CORS origins; `["*"]` allows any.
    pub cors_origins: Vec<String>,
    /// Paper size used when laying images onto PDF pages.
    pub paper_size: crate::PaperSize,
    /// External tool binaries.
    pub tools: ToolPaths,
}

/// Names or paths of the external programs the service shells out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// LibreOffice (office ↔ PDF).
    pub office: String,
    /// Poppler's `pdftoppm` (PDF → PNG).
    pub rasterizer: String,
    /// Tesseract (OCR).
    pub ocr: String,
    /// qpdf (password protection).
    pub encryptor: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            office: "soffice".into(),
            rasterizer: "pdftoppm".into(),
            ocr: "tesseract".into(),
            encryptor: "qpdf".into(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".into(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("merged"),
            max_file_age_secs: 3600,
            sweep_interval_secs: 300,
            tool_timeout_secs: 120,
            max_upload_bytes: 64 * 1024 * 1024,
            cors_origins: vec!["*".into()],
            paper_size: crate::PaperSize::A4,
            tools: ToolPaths::default(),
        }
    }
}

impl ServiceConfig {
    /// Load settings: defaults, then the JSON file named by `PAGEWERK_CONFIG`
    /// (if set), then individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a JSON settings file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Apply `KEY=value` overrides from `lookup` (normally the process
    /// environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup("PAGEWERK_BIND") {
            self.bind_addr = bind;
        }
        if let Some(dir) = lookup("PAGEWERK_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("PAGEWERK_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(secs) = lookup("PAGEWERK_TOOL_TIMEOUT_SECS") {
            self.tool_timeout_secs = secs.trim().parse().map_err(|_| {
                PagewerkError::invalid_parameter(
                    "PAGEWERK_TOOL_TIMEOUT_SECS",
                    format!("`{secs}` is not a number of seconds"),
                )
            })?;
        }
        Ok(())
    }

    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Whether any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
