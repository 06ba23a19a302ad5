//! Destinations for generated documents: the system clipboard and a read-only preview.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Where finished documents and trees are delivered.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Places `text` on the clipboard.
    async fn copy_text(&self, text: &str) -> Result<()>;
    /// Shows `text` as a read-only Markdown document.
    async fn present_markdown(&self, text: &str) -> Result<()>;
}

/// Clipboard commands, tried in the order they are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipboardProvider {
    MacOS,
    Windows,
    Wsl,
    Wayland,
    Xclip,
    Xsel,
}

impl ClipboardProvider {
    fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::MacOS => ("pbcopy", &[]),
            Self::Windows | Self::Wsl => ("clip.exe", &[]),
            Self::Wayland => ("wl-copy", &[]),
            Self::Xclip => ("xclip", &["-selection", "clipboard", "-in"]),
            Self::Xsel => ("xsel", &["-b", "-i"]),
        }
    }

    /// Candidates for the current platform and session.
    fn detect() -> Vec<Self> {
        if cfg!(target_os = "macos") {
            return vec![Self::MacOS];
        }
        if cfg!(windows) {
            return vec![Self::Windows];
        }

        let mut providers = Vec::new();
        if std::env::var_os("WSL_DISTRO_NAME").is_some() {
            providers.push(Self::Wsl);
        }
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            providers.push(Self::Wayland);
        }
        if std::env::var_os("DISPLAY").is_some() {
            providers.push(Self::Xclip);
            providers.push(Self::Xsel);
        }
        providers
    }

    async fn copy(self, text: &str) -> Result<()> {
        let (cmd, args) = self.command();
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {cmd}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            anyhow::bail!("{cmd} exited with {status}");
        }
        Ok(())
    }
}

/// The sink used by the binary: the desktop clipboard and the system Markdown viewer.
#[derive(Debug, Default, Clone)]
pub struct NativeSink;

#[async_trait]
impl OutputSink for NativeSink {
    async fn copy_text(&self, text: &str) -> Result<()> {
        let providers = ClipboardProvider::detect();
        if providers.is_empty() {
            anyhow::bail!("No suitable clipboard mechanism found");
        }

        let mut last_error = None;
        for provider in providers {
            match provider.copy(text).await {
                Ok(()) => {
                    tracing::debug!("Copied {} bytes with {:?}", text.len(), provider);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Clipboard provider {:?} failed: {}", provider, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Clipboard copy failed")))
    }

    async fn present_markdown(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || write_preview_file(&text)).await??;
        Ok(())
    }
}

/// Persists the preview as a read-only `.md` file and opens it with the default viewer.
fn write_preview_file(text: &str) -> Result<()> {
    let mut file = tempfile::Builder::new()
        .prefix("prompt-packer-preview-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create preview file")?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let (_, path) = file.keep().context("Failed to keep preview file")?;
    let mut permissions = std::fs::metadata(&path)?.permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(&path, permissions)?;

    tracing::info!("Opening preview {}", path.display());
    open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(())
}
