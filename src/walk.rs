//! Content-tree walking and entry assembly.
//!
//! One entry per directory holding an `index.md`. The walk is pre-order: a
//! directory's own index document is processed before its children, and
//! sibling directories are visited in *descending* lexicographic order.
//! That ordering is the sole ordering mechanism — date-named directories
//! (`2025/08/some-post`) come out newest-first without any explicit sort.
//!
//! Directories without an index document are skipped but still descended
//! into; dot-directories are pruned entirely. An unreadable directory is
//! fatal to the whole build — there is no partial-result recovery here.
//!
//! For each entry the assembler runs the Markdown loader, resolves and
//! commits the metadata sidecar, triggers the preview-image check, and
//! accumulates warnings and build statistics.

use crate::config::Configuration;
use crate::datetime;
use crate::entry::{self, Entry, Preview};
use crate::imaging::ImageBackend;
use crate::markdown::{self, LoadedDocument};
use crate::meta::{self, FreshMeta, LoadedMeta, MetaAction, MetaDecision};
use crate::ogp::{self, PreviewRenderer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Index document filename within an entry directory.
pub const INDEX_FILENAME: &str = "index.md";

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Invalid content root: {0}")]
    InvalidRoot(PathBuf),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sidecar write failed for {path}: {source}")]
    Meta {
        path: PathBuf,
        #[source]
        source: meta::MetaError,
    },
}

/// A recoverable failure, reported with path and cause.
#[derive(Debug, Clone)]
pub struct BuildWarning {
    pub path: PathBuf,
    pub cause: String,
}

/// Counters for one build run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub entries: u32,
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub migrated: u32,
    pub recreated: u32,
    pub images_encoded: u32,
    pub images_cached: u32,
    pub previews_drawn: u32,
    pub previews_cached: u32,
}

impl BuildStats {
    fn tally(&mut self, action: MetaAction) {
        match action {
            MetaAction::Unchanged => self.unchanged += 1,
            MetaAction::Created => self.created += 1,
            MetaAction::Updated => self.updated += 1,
            MetaAction::Migrated => self.migrated += 1,
            MetaAction::Recreated => self.recreated += 1,
        }
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} new, {} updated, {} unchanged",
            self.entries, self.created, self.updated, self.unchanged
        )?;
        if self.migrated > 0 {
            write!(f, ", {} migrated", self.migrated)?;
        }
        if self.recreated > 0 {
            write!(f, ", {} recreated", self.recreated)?;
        }
        Ok(())
    }
}

/// Everything a build run produced besides the rendered output.
#[derive(Debug)]
pub struct WalkOutcome {
    /// Entries in traversal order (newest-first for date-named trees).
    pub entries: Vec<Entry>,
    pub warnings: Vec<BuildWarning>,
    pub stats: BuildStats,
}

/// Walk the content root and assemble every entry.
pub fn collect_entries(
    config: &Configuration,
    root: &Path,
    backend: &impl ImageBackend,
    renderer: &mut PreviewRenderer,
) -> Result<WalkOutcome, WalkError> {
    if !root.is_dir() {
        return Err(WalkError::InvalidRoot(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut stats = BuildStats::default();

    if renderer.enabled() {
        for (label, path) in renderer.missing_assets() {
            warnings.push(BuildWarning {
                path,
                cause: format!("{label} does not point at a readable file"),
            });
        }
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| b.file_name().cmp(a.file_name()))
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_name(e.file_name()));

    for item in walker {
        let item = item?;
        if !item.file_type().is_dir() {
            continue;
        }
        let dir = item.path();
        let index_path = dir.join(INDEX_FILENAME);
        if !index_path.is_file() {
            continue;
        }
        let entry = assemble_entry(
            config,
            root,
            dir,
            &index_path,
            backend,
            renderer,
            &mut warnings,
            &mut stats,
        )?;
        stats.entries += 1;
        entries.push(entry);
    }

    Ok(WalkOutcome {
        entries,
        warnings,
        stats,
    })
}

fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

#[allow(clippy::too_many_arguments)]
fn assemble_entry(
    config: &Configuration,
    root: &Path,
    dir: &Path,
    index_path: &Path,
    backend: &impl ImageBackend,
    renderer: &mut PreviewRenderer,
    warnings: &mut Vec<BuildWarning>,
    stats: &mut BuildStats,
) -> Result<Entry, WalkError> {
    let raw = fs::read_to_string(index_path)?;
    let (doc, report) = markdown::load_document(&raw, dir, &config.images, backend);
    for warning in report.warnings {
        warnings.push(BuildWarning {
            path: warning.path,
            cause: warning.cause,
        });
    }
    stats.images_encoded += report.images_generated;
    stats.images_cached += report.images_reused;

    let loaded = meta::load(dir);
    if let LoadedMeta::Corrupt(cause) = &loaded {
        warnings.push(BuildWarning {
            path: meta::sidecar_path(dir),
            cause: format!("sidecar unreadable, recreating (publish date lost): {cause}"),
        });
    }
    let fresh = FreshMeta {
        body_digest: doc.body_digest.clone(),
        title: doc.title.clone(),
        summary: entry::summarize(&doc.body),
        toc: doc.toc.clone(),
    };
    let now = datetime::now_stored();
    let decision = meta::resolve(loaded, fresh, &now);
    meta::commit(dir, &decision).map_err(|source| WalkError::Meta {
        path: meta::sidecar_path(dir),
        source,
    })?;
    stats.tally(decision.action);

    let url_path = url_path_for(root, dir);
    let preview = attach_preview(config, renderer, dir, &url_path, &doc, &decision, warnings, stats);

    Ok(Entry {
        source_path: index_path.to_path_buf(),
        url_path,
        title: doc.title,
        markdown: doc.markdown,
        html: doc.html,
        body: doc.body,
        publish_date: decision.record.publish_date.clone(),
        update_date: decision.record.update_date.clone(),
        body_digest: doc.body_digest,
        toc: doc.toc,
        preview,
    })
}

/// Slash-normalized directory path relative to the content root, always
/// starting and ending with `/`.
fn url_path_for(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}

#[allow(clippy::too_many_arguments)]
fn attach_preview(
    config: &Configuration,
    renderer: &mut PreviewRenderer,
    dir: &Path,
    url_path: &str,
    doc: &LoadedDocument,
    decision: &MetaDecision,
    warnings: &mut Vec<BuildWarning>,
    stats: &mut BuildStats,
) -> Option<Preview> {
    if !renderer.enabled() {
        return None;
    }
    let output = dir.join(ogp::PREVIEW_FILENAME);
    let description = ogp::sanitize_description(&doc.body);
    if PreviewRenderer::needs_redraw(&output, decision.stored_digest_matches) {
        if let Err(e) = renderer.generate(&config.site.title, &doc.title, &description, &output) {
            warnings.push(BuildWarning {
                path: output,
                cause: e.to_string(),
            });
            return None;
        }
        stats.previews_drawn += 1;
    } else {
        stats.previews_cached += 1;
    }
    Some(Preview {
        image_url: format!(
            "{}{}{}",
            config.site.base_url.trim_end_matches('/'),
            url_path,
            ogp::PREVIEW_FILENAME
        ),
        description,
    })
}
