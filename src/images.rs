//! Markdown image rewriting and variant generation.
//!
//! Scans an entry's Markdown for `![alt](relative/path.jpg)` references.
//! For each reference that resolves to a file in the entry's directory, two
//! sibling variants are derived — `path-full.jpg` and `path-thumb.jpg` —
//! and the reference is replaced with a placeholder token. The finished
//! HTML snippet (a linked, zoomable thumbnail) cannot be expressed in
//! Markdown, so it is substituted for the token only after Markdown→HTML
//! conversion.
//!
//! Placeholder tokens are a structured per-document list keyed by
//! sequential index, so they are unique within a document by construction.
//!
//! ## Failure handling
//!
//! Everything here fails soft: a missing source file or a backend error
//! leaves the original Markdown reference untouched and records a warning.
//! A broken image never sinks the build.
//!
//! ## Incremental builds
//!
//! Variants already on disk and at least as new as their source are reused
//! rather than re-encoded, so idle rebuilds do no pixel work.

use crate::config::ImagesConfig;
use crate::imaging::{ImageBackend, VariantParams};
use maud::html;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMAGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());

/// Source extensions the pipeline will process.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One pending substitution: placeholder token → finished HTML snippet.
#[derive(Debug, Clone)]
struct PendingImage {
    token: String,
    html: String,
}

/// Entry-scoped placeholder list. Exists only during one render pass.
#[derive(Debug, Default)]
pub struct Substitutions {
    pending: Vec<PendingImage>,
}

impl Substitutions {
    fn push(&mut self, html: String) -> String {
        let token = format!("plainlog-image-{}", self.pending.len());
        self.pending.push(PendingImage {
            token: token.clone(),
            html,
        });
        token
    }

    /// Replace each placeholder token in converted HTML with its snippet.
    pub fn apply(&self, html: &str) -> String {
        let mut out = html.to_string();
        for pending in &self.pending {
            out = out.replacen(&pending.token, &pending.html, 1);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A recoverable per-asset failure, reported with path and cause.
#[derive(Debug, Clone)]
pub struct ImageWarning {
    pub path: PathBuf,
    pub cause: String,
}

/// Outcome of one document's image pass.
#[derive(Debug)]
pub struct PipelineResult {
    /// Markdown with resolvable image references replaced by tokens.
    pub markdown: String,
    pub substitutions: Substitutions,
    pub warnings: Vec<ImageWarning>,
    /// Variants freshly encoded this run.
    pub generated: u32,
    /// Variants reused because they were already up to date.
    pub reused: u32,
}

/// Run the image pass over one entry's raw Markdown.
pub fn rewrite_images(
    markdown: &str,
    entry_dir: &Path,
    config: &ImagesConfig,
    backend: &impl ImageBackend,
) -> PipelineResult {
    let mut substitutions = Substitutions::default();
    let mut warnings = Vec::new();
    let mut generated = 0u32;
    let mut reused = 0u32;

    let rewritten = IMAGE_TOKEN.replace_all(markdown, |caps: &Captures| {
        let alt = &caps[1];
        let target = &caps[2];

        let Some((full_rel, thumb_rel)) = variant_names(target) else {
            // External URLs, absolute paths, unrecognized extensions: not ours.
            return caps[0].to_string();
        };

        let source = entry_dir.join(target);
        if !source.is_file() {
            warnings.push(ImageWarning {
                path: source,
                cause: "referenced image not found".to_string(),
            });
            return caps[0].to_string();
        }

        let dest_full = entry_dir.join(&full_rel);
        let dest_thumb = entry_dir.join(&thumb_rel);
        if variants_current(&source, &dest_full, &dest_thumb) {
            reused += 1;
        } else {
            let params = VariantParams {
                source: source.clone(),
                dest_full,
                dest_thumb,
                full_max_width: config.full_max_width,
                thumb_width: config.thumb_width,
                filter: config.filter,
                quality: config.quality,
            };
            if let Err(e) = backend.generate_variants(&params) {
                warnings.push(ImageWarning {
                    path: source,
                    cause: e.to_string(),
                });
                return caps[0].to_string();
            }
            generated += 1;
        }

        substitutions.push(thumbnail_snippet(alt, &full_rel, &thumb_rel))
    });

    PipelineResult {
        markdown: rewritten.into_owned(),
        substitutions,
        warnings,
        generated,
        reused,
    }
}

/// Derive the `-full`/`-thumb` sibling names for a candidate reference.
///
/// Returns `None` for references the pipeline must leave alone: scheme
/// URLs, site-absolute paths, and extensions without a compiled-in decoder.
fn variant_names(target: &str) -> Option<(String, String)> {
    if target.starts_with('/') || target.contains("://") {
        return None;
    }
    let path = Path::new(target);
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    if !IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return None;
    }
    let full = path.with_file_name(format!("{stem}-full.{ext}"));
    let thumb = path.with_file_name(format!("{stem}-thumb.{ext}"));
    Some((
        full.to_string_lossy().replace('\\', "/"),
        thumb.to_string_lossy().replace('\\', "/"),
    ))
}

/// Both variants exist and are at least as new as the source.
fn variants_current(source: &Path, full: &Path, thumb: &Path) -> bool {
    let Ok(source_mtime) = std::fs::metadata(source).and_then(|m| m.modified()) else {
        return false;
    };
    [full, thumb].iter().all(|variant| {
        std::fs::metadata(variant)
            .and_then(|m| m.modified())
            .map(|mtime| mtime >= source_mtime)
            .unwrap_or(false)
    })
}

/// The snippet substituted for a placeholder: a thumbnail linked to the
/// full-size variant.
fn thumbnail_snippet(alt: &str, full_href: &str, thumb_src: &str) -> String {
    html! {
        a.entry-image href=(full_href) target="_blank" rel="noopener" {
            img src=(thumb_src) alt=(alt) loading="lazy";
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::tests::MockBackend;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> ImagesConfig {
        ImagesConfig::default()
    }

    #[test]
    fn missing_image_left_untouched_with_warning() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let md = "before\n\n![a photo](missing.jpg)\n\nafter";

        let result = rewrite_images(md, tmp.path(), &test_config(), &backend);

        assert_eq!(result.markdown, md);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].path.ends_with("missing.jpg"));
        assert!(backend.recorded().is_empty());
    }

    #[test]
    fn existing_image_replaced_with_token() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"jpeg bytes").unwrap();
        let backend = MockBackend::new();

        let result = rewrite_images(
            "![alt text](photo.jpg)",
            tmp.path(),
            &test_config(),
            &backend,
        );

        assert_eq!(result.markdown, "plainlog-image-0");
        assert_eq!(result.generated, 1);
        assert!(result.warnings.is_empty());

        let ops = backend.recorded();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].dest_full.ends_with("photo-full.jpg"));
        assert!(ops[0].dest_thumb.ends_with("photo-thumb.jpg"));
        assert_eq!(ops[0].full_max_width, 1200);
        assert_eq!(ops[0].thumb_width, 320);
    }

    #[test]
    fn tokens_are_sequential_per_document() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("b.png"), b"x").unwrap();
        let backend = MockBackend::new();

        let result = rewrite_images(
            "![one](a.jpg) and ![two](b.png)",
            tmp.path(),
            &test_config(),
            &backend,
        );

        assert_eq!(result.markdown, "plainlog-image-0 and plainlog-image-1");
        assert_eq!(result.substitutions.len(), 2);
    }

    #[test]
    fn apply_substitutes_snippets_into_html() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"x").unwrap();
        let backend = MockBackend::new();

        let result = rewrite_images("![alt](photo.jpg)", tmp.path(), &test_config(), &backend);
        let html = format!("<p>{}</p>", result.markdown);
        let substituted = result.substitutions.apply(&html);

        assert!(substituted.contains("href=\"photo-full.jpg\""));
        assert!(substituted.contains("src=\"photo-thumb.jpg\""));
        assert!(substituted.contains("alt=\"alt\""));
        assert!(substituted.contains("loading=\"lazy\""));
        assert!(!substituted.contains("plainlog-image-0"));
    }

    #[test]
    fn snippet_escapes_alt_text() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("p.jpg"), b"x").unwrap();
        let backend = MockBackend::new();

        let result = rewrite_images("![a<b>&c](p.jpg)", tmp.path(), &test_config(), &backend);
        let substituted = result.substitutions.apply("plainlog-image-0");

        assert!(substituted.contains("alt=\"a&lt;b&gt;&amp;c\""));
    }

    #[test]
    fn backend_failure_fails_soft() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"x").unwrap();
        let backend = MockBackend::failing();
        let md = "![alt](photo.jpg)";

        let result = rewrite_images(md, tmp.path(), &test_config(), &backend);

        assert_eq!(result.markdown, md);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].cause.contains("mock failure"));
        assert_eq!(result.generated, 0);
    }

    #[test]
    fn urls_and_absolute_paths_pass_through_silently() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let md = "![ext](https://example.com/x.jpg) ![abs](/static/y.png) ![vec](diagram.svg)";

        let result = rewrite_images(md, tmp.path(), &test_config(), &backend);

        assert_eq!(result.markdown, md);
        assert!(result.warnings.is_empty());
        assert!(backend.recorded().is_empty());
    }

    #[test]
    fn up_to_date_variants_are_reused() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("photo.jpg"), b"x").unwrap();
        let backend = MockBackend::new();

        let first = rewrite_images("![alt](photo.jpg)", tmp.path(), &test_config(), &backend);
        assert_eq!(first.generated, 1);
        assert_eq!(first.reused, 0);

        let second = rewrite_images("![alt](photo.jpg)", tmp.path(), &test_config(), &backend);
        assert_eq!(second.generated, 0);
        assert_eq!(second.reused, 1);
        // Still rewritten to a token — reuse affects encoding, not output.
        assert_eq!(second.markdown, "plainlog-image-0");
        assert_eq!(backend.recorded().len(), 1);
    }

    #[test]
    fn subdirectory_references_derive_sibling_names() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("img")).unwrap();
        fs::write(tmp.path().join("img/shot.png"), b"x").unwrap();
        let backend = MockBackend::new();

        let result = rewrite_images("![s](img/shot.png)", tmp.path(), &test_config(), &backend);

        assert_eq!(result.generated, 1);
        let substituted = result.substitutions.apply("plainlog-image-0");
        assert!(substituted.contains("href=\"img/shot-full.png\""));
        assert!(substituted.contains("src=\"img/shot-thumb.png\""));
    }
}
