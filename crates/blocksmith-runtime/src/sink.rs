//! Delivery of generation results

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc;

use blocksmith_codegen::GenerationResult;

use crate::error::Result;

/// Receives the result of every coalesced generation run
#[async_trait]
pub trait GenerationSink: Send + Sync {
    /// Hand a result to the collaborator
    async fn deliver(&mut self, result: &GenerationResult) -> Result<()>;
}

#[async_trait]
impl GenerationSink for mpsc::UnboundedSender<GenerationResult> {
    async fn deliver(&mut self, result: &GenerationResult) -> Result<()> {
        self.send(result.clone())
            .map_err(|_| anyhow::anyhow!("Generation receiver dropped"))
    }
}

/// Writes the program, or the diagnostic placeholder, to a file
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl GenerationSink for FileSink {
    async fn deliver(&mut self, result: &GenerationResult) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, result.output())
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("Wrote {}", self.path.display());
        Ok(())
    }
}

/// Calls a closure with every result
pub struct CallbackSink<F>(pub F);

#[async_trait]
impl<F> GenerationSink for CallbackSink<F>
where
    F: FnMut(&GenerationResult) + Send + Sync,
{
    async fn deliver(&mut self, result: &GenerationResult) -> Result<()> {
        (self.0)(result);
        Ok(())
    }
}
