//! DOCX to PDF conversion through an external office suite.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Result, TemplateError};

/// MIME type for PDF responses.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Converts rendered DOCX bytes into PDF bytes.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    /// Convert one document.
    async fn to_pdf(&self, docx: &[u8]) -> Result<Vec<u8>>;

    /// Short name for logs and health output.
    fn name(&self) -> &str;
}

/// Headless LibreOffice (`soffice --headless --convert-to pdf`).
///
/// Each conversion runs in its own scratch directory with a private user
/// profile, so concurrent conversions do not contend for the profile lock.
#[derive(Clone, Debug)]
pub struct SofficeConverter {
    program: PathBuf,
    timeout: Duration,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice", Duration::from_secs(60))
    }
}

impl SofficeConverter {
    /// Use `program` (a path or a name on `PATH`) with a per-conversion
    /// timeout.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// The configured program.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

#[async_trait]
impl PdfConverter for SofficeConverter {
    async fn to_pdf(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("document.docx");
        let output = scratch.path().join("document.pdf");
        let profile = scratch.path().join("profile");
        tokio::fs::write(&input, docx).await?;

        let mut command = Command::new(&self.program);
        command
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(scratch.path())
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TemplateError::ConverterUnavailable(format!(
                    "{} not found",
                    self.program.display()
                ))
            } else {
                TemplateError::ConverterUnavailable(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            }
        })?;

        log::debug!("Converting {} bytes to PDF with {}", docx.len(), self.program.display());
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                TemplateError::Conversion(format!("timed out after {}s", self.timeout.as_secs()))
            })??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TemplateError::Conversion(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        match tokio::fs::read(&output).await {
            Ok(pdf) => Ok(pdf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(TemplateError::Conversion(
                "converter finished without producing a PDF".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "soffice"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let converter = SofficeConverter::new(
            "/nonexistent/docuform-test/soffice",
            Duration::from_secs(5),
        );
        let err = converter.to_pdf(b"PK").await.unwrap_err();
        assert!(matches!(err, TemplateError::ConverterUnavailable(_)));
    }

    #[cfg(unix)]
    fn fake_converter(dir: &std::path::Path, script: &str) -> SofficeConverter {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-soffice");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        SofficeConverter::new(path, Duration::from_secs(5))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_converter_output_is_read() {
        // Arguments: -env:... --headless --convert-to pdf --outdir DIR INPUT
        let dir = tempfile::tempdir().unwrap();
        let converter = fake_converter(dir.path(), r#"printf '%%PDF-1.4 fake' > "$6/document.pdf""#);
        let pdf = converter.to_pdf(b"PK\x03\x04").await.unwrap();
        assert_eq!(pdf, b"%PDF-1.4 fake");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let converter = fake_converter(dir.path(), "echo 'source file could not be loaded' >&2; exit 3");
        let err = converter.to_pdf(b"PK").await.unwrap_err();
        assert!(matches!(err, TemplateError::Conversion(ref m) if m.contains("could not be loaded")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let converter = fake_converter(dir.path(), "exit 0");
        let err = converter.to_pdf(b"PK").await.unwrap_err();
        assert!(matches!(err, TemplateError::Conversion(_)));
    }
}
