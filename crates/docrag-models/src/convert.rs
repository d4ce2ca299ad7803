//! File → markdown-like text converters.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use docrag_core::traits::DocumentConverter;

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

/// Reads text formats as-is (lossy UTF-8).
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    pub const EXTENSIONS: &'static [&'static str] = &["txt", "md", "csv"];
}

#[async_trait]
impl DocumentConverter for PlainTextConverter {
    fn supports(&self, path: &Path) -> bool {
        extension(path).is_some_and(|e| Self::EXTENSIONS.contains(&e.as_str()))
    }

    async fn convert(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.with_context(|| format!("reading {}", path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Runs the external `docling` command and reads back its markdown export.
#[derive(Debug, Clone)]
pub struct DoclingConverter {
    bin: String,
}

impl DoclingConverter {
    pub const EXTENSIONS: &'static [&'static str] = &["pdf", "png", "jpg", "jpeg", "xlsx", "docx"];

    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

fn find_markdown(dir: &Path) -> Option<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .find(|p| extension(p).as_deref() == Some("md"))
}

#[async_trait]
impl DocumentConverter for DoclingConverter {
    fn supports(&self, path: &Path) -> bool {
        extension(path).is_some_and(|e| Self::EXTENSIONS.contains(&e.as_str()))
    }

    async fn convert(&self, path: &Path) -> Result<String> {
        let out_dir = tempfile::tempdir()?;
        let output = tokio::process::Command::new(&self.bin)
            .arg("--to")
            .arg("md")
            .arg("--output")
            .arg(out_dir.path())
            .arg(path)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.bin))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.bin, output.status, stderr.trim());
        }
        let md = find_markdown(out_dir.path())
            .ok_or_else(|| anyhow!("{} produced no markdown for {}", self.bin, path.display()))?;
        debug!(file = %path.display(), output = %md.display(), "docling conversion");
        Ok(tokio::fs::read_to_string(&md).await?)
    }
}

/// Dispatches to the first converter that supports the file.
pub struct RoutingConverter {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl RoutingConverter {
    pub fn new(converters: Vec<Box<dyn DocumentConverter>>) -> Self {
        Self { converters }
    }

    /// Plain text for text formats, docling for everything else.
    pub fn with_docling(bin: impl Into<String>) -> Self {
        Self::new(vec![Box::new(PlainTextConverter), Box::new(DoclingConverter::new(bin))])
    }
}

#[async_trait]
impl DocumentConverter for RoutingConverter {
    fn supports(&self, path: &Path) -> bool {
        self.converters.iter().any(|c| c.supports(path))
    }

    async fn convert(&self, path: &Path) -> Result<String> {
        match self.converters.iter().find(|c| c.supports(path)) {
            Some(c) => c.convert(path).await,
            None => bail!("no converter for {}", path.display()),
        }
    }
}
