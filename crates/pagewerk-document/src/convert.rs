// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversions delegated to external programs.
//
// Every tool runs as a child process with a time budget. A missing binary is
// `ConversionUnavailable`, a blown budget is `ConversionTimeout` (the child
// is killed), and a non-zero exit is `ConversionFailed` carrying stderr.
//
//   soffice    office formats -> PDF, PDF -> DOCX
//   pdftoppm   PDF -> PNG pages
//   tesseract  image -> text
//   qpdf       PDF -> password-protected PDF

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use pagewerk_core::config::ToolPaths;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::DocumentType;
use serde::Serialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::archive::zip_entries;

/// Resolution used when rasterising pages for download.
pub const RASTER_DPI: u32 = 150;

/// Resolution used when rasterising pages for OCR.
pub const OCR_DPI: u32 = 300;

/// Longest stderr excerpt carried in an error.
const STDERR_EXCERPT: usize = 500;

/// A single external program with a time budget.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: String,
    timeout: Duration,
    /// Exit codes other than 0 that still mean success.
    extra_success_codes: Vec<i32>,
}

impl ExternalTool {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            extra_success_codes: Vec::new(),
        }
    }

    /// Treat `code` as a successful exit.
    pub fn accepting_exit_code(mut self, code: i32) -> Self {
        self.extra_success_codes.push(code);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion and return stdout.
    #[instrument(skip(self, args), fields(program = %self.program))]
    pub async fn run(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PagewerkError::ConversionUnavailable(format!("`{}` is not installed", self.program))
            } else {
                PagewerkError::ConversionUnavailable(format!(
                    "cannot start `{}`: {err}",
                    self.program
                ))
            }
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(program = %self.program, seconds = self.timeout.as_secs(), "tool timed out");
                PagewerkError::ConversionTimeout {
                    tool: self.program.clone(),
                    seconds: self.timeout.as_secs(),
                }
            })??;

        let succeeded = output.status.success()
            || output
                .status
                .code()
                .is_some_and(|code| self.extra_success_codes.contains(&code));
        if !succeeded {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(PagewerkError::ConversionFailed(format!(
                "`{}` exited with {}: {excerpt}",
                self.program, output.status
            )));
        }
        debug!(stdout_bytes = output.stdout.len(), "tool finished");
        Ok(output.stdout)
    }
}

/// Text recognised in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutput {
    /// Per-page text joined with blank lines.
    pub text: String,
    /// Number of pages (images) recognised.
    pub pages: usize,
}

/// Front end for every tool-backed conversion.
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    tools: ToolPaths,
    timeout: Duration,
}

impl DocumentConverter {
    pub fn new(tools: ToolPaths, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    fn office(&self) -> ExternalTool {
        ExternalTool::new(&self.tools.office, self.timeout)
    }

    fn rasterizer(&self) -> ExternalTool {
        ExternalTool::new(&self.tools.rasterizer, self.timeout)
    }

    fn ocr_engine(&self) -> ExternalTool {
        ExternalTool::new(&self.tools.ocr, self.timeout)
    }

    fn encryptor(&self) -> ExternalTool {
        // qpdf exits 3 when it succeeded with warnings.
        ExternalTool::new(&self.tools.encryptor, self.timeout).accepting_exit_code(3)
    }

    /// Office document (or plain text) to PDF.
    #[instrument(skip(self, data), fields(bytes_len = data.len()))]
    pub async fn office_to_pdf(&self, data: &[u8], file_name: &str) -> Result<Vec<u8>> {
        let kind = DocumentType::from_file_name(file_name)
            .filter(DocumentType::is_office)
            .ok_or_else(|| {
                PagewerkError::invalid_parameter(
                    "file",
                    format!("`{file_name}` is not a supported office document"),
                )
            })?;

        let workspace = Workspace::new()?;
        let input_name = format!("input.{}", extension_of(file_name, kind));
        let input = workspace.write(&input_name, data).await?;

        let mut args = workspace.office_profile_args();
        args.extend(os_args(["--headless", "--convert-to", "pdf", "--outdir"]));
        args.push(workspace.path().into());
        args.push(input.into());
        self.office().run(&args, Some(workspace.path())).await?;

        let pdf = workspace.read_output("input.pdf", &self.tools.office).await?;
        info!(output_bytes = pdf.len(), "office document converted");
        Ok(pdf)
    }

    /// PDF to a Word (DOCX) document.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub async fn pdf_to_word(&self, data: &[u8]) -> Result<Vec<u8>> {
        let workspace = Workspace::new()?;
        let input = workspace.write("input.pdf", data).await?;

        let mut args = workspace.office_profile_args();
        args.extend(os_args([
            "--headless",
            "--infilter=writer_pdf_import",
            "--convert-to",
            "docx:MS Word 2007 XML",
            "--outdir",
        ]));
        args.push(workspace.path().into());
        args.push(input.into());
        self.office().run(&args, Some(workspace.path())).await?;

        let docx = workspace.read_output("input.docx", &self.tools.office).await?;
        info!(output_bytes = docx.len(), "PDF converted to DOCX");
        Ok(docx)
    }

    /// Render every page to PNG and bundle them as `page_{n}.png` in a zip.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub async fn pdf_to_png_zip(&self, data: &[u8]) -> Result<Vec<u8>> {
        let workspace = Workspace::new()?;
        let pages = self.rasterize(&workspace, data, RASTER_DPI).await?;

        let mut entries = Vec::with_capacity(pages.len());
        for (number, path) in pages.iter().enumerate() {
            entries.push((format!("page_{}.png", number + 1), tokio::fs::read(path).await?));
        }
        info!(pages = entries.len(), "PDF rasterised");
        zip_entries(entries)
    }

    /// Recognise text in a PDF (rasterised first) or a single image.
    #[instrument(skip(self, data), fields(bytes_len = data.len()))]
    pub async fn ocr(&self, data: &[u8], kind: DocumentType) -> Result<OcrOutput> {
        let workspace = Workspace::new()?;
        let images = match kind {
            DocumentType::Pdf => self.rasterize(&workspace, data, OCR_DPI).await?,
            other if other.is_image() => {
                vec![workspace.write(&format!("input.{}", other.extension()), data).await?]
            }
            other => {
                return Err(PagewerkError::invalid_parameter(
                    "file",
                    format!("cannot OCR {}", other.mime_type()),
                ));
            }
        };

        let mut texts = Vec::with_capacity(images.len());
        for image in &images {
            let args = vec![image.clone().into_os_string(), "stdout".into()];
            let stdout = self.ocr_engine().run(&args, Some(workspace.path())).await?;
            texts.push(String::from_utf8_lossy(&stdout).trim().to_string());
        }
        info!(pages = texts.len(), "OCR finished");
        Ok(OcrOutput {
            text: texts.join("\n\n"),
            pages: texts.len(),
        })
    }

    /// Encrypt with AES-256; `password` opens and owns the document.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub async fn protect(&self, data: &[u8], password: &str) -> Result<Vec<u8>> {
        if password.is_empty() {
            return Err(PagewerkError::invalid_parameter("password", "must not be empty"));
        }
        if password.contains(['\n', '\r']) {
            return Err(PagewerkError::invalid_parameter("password", "must be a single line"));
        }
        let workspace = Workspace::new()?;
        let input = workspace.write("input.pdf", data).await?;
        let output = workspace.path().join("protected.pdf");

        // Arguments go through an @file so the password never shows up in
        // the process table.
        let arguments = format!(
            "--encrypt\n{password}\n{password}\n256\n--\n{}\n{}\n",
            input.display(),
            output.display()
        );
        let arg_file = workspace.write("qpdf.args", arguments.as_bytes()).await?;
        let mut at_file = OsString::from("@");
        at_file.push(arg_file.as_os_str());

        self.encryptor().run(&[at_file], Some(workspace.path())).await?;
        let protected = workspace
            .read_output("protected.pdf", &self.tools.encryptor)
            .await?;
        info!(output_bytes = protected.len(), "PDF protected");
        Ok(protected)
    }

    /// Rasterise into `workspace`, returning PNG paths in page order.
    async fn rasterize(
        &self,
        workspace: &Workspace,
        data: &[u8],
        dpi: u32,
    ) -> Result<Vec<PathBuf>> {
        let input = workspace.write("input.pdf", data).await?;
        let prefix = workspace.path().join("page");

        let mut args = os_args(["-png", "-r"]);
        args.push(dpi.to_string().into());
        args.push(input.into());
        args.push(prefix.into());
        self.rasterizer().run(&args, Some(workspace.path())).await?;

        // pdftoppm zero-pads the page suffix to the width of the page count.
        let mut pages: Vec<(u32, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(workspace.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        if pages.is_empty() {
            return Err(PagewerkError::ConversionFailed(format!(
                "`{}` produced no pages",
                self.tools.rasterizer
            )));
        }
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }
}

/// `page-007.png` -> 7.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

fn extension_of(file_name: &str, kind: DocumentType) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| kind.extension().to_string())
}

fn os_args<const N: usize>(args: [&str; N]) -> Vec<OsString> {
    args.into_iter().map(OsString::from).collect()
}

/// A private scratch directory, removed on drop.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("pagewerk-").tempdir()?,
        })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Read a file a tool was expected to produce.
    async fn read_output(&self, name: &str, tool: &str) -> Result<Vec<u8>> {
        let path = self.path().join(name);
        tokio::fs::read(&path).await.map_err(|_| {
            PagewerkError::ConversionFailed(format!("`{tool}` did not produce {name}"))
        })
    }

    /// Give each soffice run its own profile so concurrent conversions do
    /// not fight over the user installation lock.
    fn office_profile_args(&self) -> Vec<OsString> {
        let profile = self.path().join("profile");
        vec![format!("-env:UserInstallation=file://{}", profile.display()).into()]
    }
}
