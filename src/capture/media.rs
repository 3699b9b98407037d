use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::backend::MediaChunk;

/// The assembled recording of one take
///
/// Built once when recording stops; cloning shares the underlying bytes.
#[derive(Debug, Clone)]
pub struct CapturedMedia {
    bytes: Arc<[u8]>,
    mime_type: String,
    chunk_count: usize,
}

impl CapturedMedia {
    /// Concatenate chunks in arrival order
    pub fn assemble(chunks: &[MediaChunk], mime_type: &str) -> Self {
        let total: usize = chunks.iter().map(MediaChunk::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.data);
        }

        Self {
            bytes: bytes.into(),
            mime_type: mime_type.to_string(),
            chunk_count: chunks.len(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the blob, for handing off without copying
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension for the container, ignoring codec parameters
    pub fn file_extension(&self) -> &'static str {
        let container = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        match container {
            "video/webm" | "audio/webm" => "webm",
            "video/mp4" | "audio/mp4" => "mp4",
            "video/ogg" | "audio/ogg" => "ogg",
            _ => "bin",
        }
    }

    /// Write the blob to `<dir>/<stem>.<ext>`, creating `dir` if needed
    pub fn save_to(&self, dir: impl AsRef<Path>, stem: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create media directory")?;

        let path = dir.join(format!("{}.{}", stem, self.file_extension()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create media file: {:?}", path))?;

        let mut writer = BufWriter::new(file);
        writer
            .write_all(&self.bytes)
            .context("Failed to write media bytes")?;
        writer.flush().context("Failed to flush media file")?;

        info!(
            "Saved captured media: {} ({} bytes, {} chunks)",
            path.display(),
            self.len(),
            self.chunk_count
        );

        Ok(path)
    }
}
