//! Document export sink.
//!
//! [`CourseDir`] is the build-context value for one output root: it owns the
//! reset-then-write lifecycle and every artifact write goes through it, so a
//! future transactional (write-to-temp, rename) upgrade needs no caller
//! changes. Text and JSON writes create parent directories as needed and
//! overwrite unconditionally; PDF rendering lives in [`pdf`].

mod pdf;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use courseforge_quiz::Quiz;
use courseforge_shared::{CourseForgeError, Result, RunId};

/// Build context for one course output root.
#[derive(Debug, Clone)]
pub struct CourseDir {
    root: PathBuf,
    run_id: RunId,
}

impl CourseDir {
    /// Create a context for the given output root. Nothing is touched on
    /// disk until [`reset`](Self::reset) is called.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run_id: RunId::new(),
        }
    }

    /// The output root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifier of this build run.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Delete any prior output directory and recreate it empty.
    ///
    /// Prior state is discarded wholesale; re-running a build never merges
    /// with stale artifacts. Failure here is fatal to the build.
    pub fn reset(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)
                .map_err(|e| CourseForgeError::io(&self.root, e))?;
        }
        std::fs::create_dir_all(&self.root).map_err(|e| CourseForgeError::io(&self.root, e))?;

        info!(root = %self.root.display(), run_id = %self.run_id, "output root reset");
        Ok(())
    }

    /// Write a text file at `rel_path`, returning `rel_path` for the manifest.
    pub fn write_text(&self, rel_path: &str, content: &str) -> Result<String> {
        let path = self.prepare(rel_path)?;
        std::fs::write(&path, content).map_err(|e| CourseForgeError::io(&path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "wrote text file");
        Ok(rel_path.to_string())
    }

    /// Write a pretty-printed JSON file at `rel_path`.
    pub fn write_json<T: serde::Serialize>(&self, rel_path: &str, data: &T) -> Result<String> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| CourseForgeError::validation(format!("JSON serialization failed: {e}")))?;
        self.write_text(rel_path, &json)
    }

    /// Render Markdown-like text as a paginated PDF at `rel_path`.
    pub fn render_document(
        &self,
        rel_path: &str,
        markdown: &str,
        title: Option<&str>,
    ) -> Result<String> {
        let path = self.prepare(rel_path)?;
        pdf::render_document(&path, markdown, title)?;
        debug!(path = %path.display(), "rendered document PDF");
        Ok(rel_path.to_string())
    }

    /// Render a quiz as a paginated PDF at `rel_path`.
    pub fn render_quiz(&self, rel_path: &str, quiz: &Quiz, title: Option<&str>) -> Result<String> {
        let path = self.prepare(rel_path)?;
        pdf::render_quiz(&path, quiz, title)?;
        debug!(path = %path.display(), "rendered quiz PDF");
        Ok(rel_path.to_string())
    }

    /// Resolve a relative artifact path and create its parent directories.
    fn prepare(&self, rel_path: &str) -> Result<PathBuf> {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CourseForgeError::io(parent, e))?;
        }
        Ok(path)
    }
}
