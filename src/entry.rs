//! The assembled content model handed to renderers.
//!
//! One [`Entry`] per content-bearing directory. Everything in here is
//! derived from the entry's `index.md` and its sidecar; renderers never
//! touch the filesystem again.

use crate::toc::TocEntry;
use std::path::PathBuf;

/// Body characters shown in index listings and feed items.
const SUMMARY_LEN: usize = 140;

/// Social-preview data attached when preview generation is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Absolute URL of the generated preview image.
    pub image_url: String,
    /// Truncated plain-text description fed to the preview card.
    pub description: String,
}

/// One published entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Path of the source `index.md`.
    pub source_path: PathBuf,
    /// Directory path relative to the content root, slash-normalized,
    /// always starting and ending with `/`.
    pub url_path: String,
    pub title: String,
    /// Markdown body as written (minus the title header line).
    pub markdown: String,
    /// Converted HTML with image snippets substituted and heading ids injected.
    pub html: String,
    /// Tag-stripped plain text; the hashing and summary source.
    pub body: String,
    /// Stored-format publish timestamp, stable across rebuilds.
    pub publish_date: String,
    /// Stored-format update timestamp; advances when content changes.
    pub update_date: String,
    /// SHA-256 hex digest of `body`.
    pub body_digest: String,
    pub toc: Vec<TocEntry>,
    pub preview: Option<Preview>,
}

impl Entry {
    pub fn summary(&self) -> String {
        summarize(&self.body)
    }
}

/// First 140 characters of the body, with `...` appended when cut.
pub fn summarize(body: &str) -> String {
    if body.chars().count() > SUMMARY_LEN {
        let cut: String = body.chars().take(SUMMARY_LEN).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}
