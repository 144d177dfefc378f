//! Per-document Markdown loading.
//!
//! An entry's `index.md` starts with a `title: <text>` header line; the
//! rest is the Markdown body. Loading a document runs a fixed sequence:
//!
//! 1. image pipeline over the raw Markdown (references become tokens);
//! 2. TOC extraction from the pipeline-processed Markdown;
//! 3. Markdown→HTML conversion (pulldown-cmark, CommonMark);
//! 4. placeholder substitution into the converted HTML;
//! 5. heading-id injection for each TOC entry;
//! 6. tag stripping to a plain-text body;
//! 7. SHA-256 digest of the plain body.
//!
//! The digest covers the stripped body only — never the raw Markdown or the
//! HTML — so markup-only edits that leave the visible text unchanged do not
//! perturb cached metadata.
//!
//! A malformed or missing title header is not fatal: the whole first line
//! stands in for the title, and a blank one becomes `Untitled`.

use crate::config::ImagesConfig;
use crate::images::{self, ImageWarning, PipelineResult};
use crate::imaging::ImageBackend;
use crate::toc::{self, TocEntry};
use pulldown_cmark::{Options, Parser, html as md_html};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::LazyLock;

/// Title used when the header line is blank.
pub const UNTITLED: &str = "Untitled";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// A fully processed document, before sidecar resolution.
#[derive(Debug)]
pub struct LoadedDocument {
    pub title: String,
    /// Markdown body as written (header line removed, trimmed).
    pub markdown: String,
    /// Final HTML: converted, snippets substituted, heading ids injected.
    pub html: String,
    /// Tag-stripped plain text.
    pub body: String,
    /// SHA-256 hex digest of `body`.
    pub body_digest: String,
    pub toc: Vec<TocEntry>,
}

/// Image-pass bookkeeping surfaced to the caller.
#[derive(Debug)]
pub struct DocumentReport {
    pub warnings: Vec<ImageWarning>,
    pub images_generated: u32,
    pub images_reused: u32,
}

/// Parse the `title: <text>` header line.
///
/// A line without the prefix is used verbatim; blank becomes [`UNTITLED`].
pub fn parse_title(first_line: &str) -> String {
    let title = first_line.strip_prefix("title: ").unwrap_or(first_line).trim();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

/// Load one document from its raw text.
pub fn load_document(
    raw: &str,
    entry_dir: &Path,
    config: &ImagesConfig,
    backend: &impl ImageBackend,
) -> (LoadedDocument, DocumentReport) {
    let mut lines = raw.lines();
    let title = parse_title(lines.next().unwrap_or(""));
    let markdown = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    let PipelineResult {
        markdown: processed,
        substitutions,
        warnings,
        generated,
        reused,
    } = images::rewrite_images(&markdown, entry_dir, config, backend);

    let toc = toc::extract_toc(&processed);
    let html = convert_markdown(&processed);
    let html = substitutions.apply(&html);
    let html = inject_heading_ids(&html, &toc);
    let body = strip_tags(&html);
    let body_digest = digest_hex(&body);

    (
        LoadedDocument {
            title,
            markdown,
            html,
            body,
            body_digest,
            toc,
        },
        DocumentReport {
            warnings,
            images_generated: generated,
            images_reused: reused,
        },
    )
}

/// Markdown→HTML via pulldown-cmark, plain CommonMark. Pure function.
fn convert_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

/// Inject an `id` attribute into the first unclaimed heading tag for each
/// TOC entry, in TOC order.
///
/// First-match-only: once a slug appears in the document, later TOC entries
/// with the same slug are skipped, so a second identical heading never
/// receives a duplicate id.
pub fn inject_heading_ids(html: &str, toc: &[TocEntry]) -> String {
    let mut out = html.to_string();
    for entry in toc {
        let id_attr = format!("id=\"{}\"", entry.id);
        if out.contains(&id_attr) {
            continue;
        }
        let text = escape_text(&entry.text);
        let needle = format!("<h{level}>{text}</h{level}>", level = entry.level);
        let replacement = format!(
            "<h{level} {id_attr}>{text}</h{level}>",
            level = entry.level
        );
        out = out.replacen(&needle, &replacement, 1);
    }
    out
}

/// Escape text the way the HTML converter does, so injection needles match
/// the converted output.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Remove every tag, keeping text content. Entities are left as written.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").trim().to_string()
}

/// SHA-256 hex digest of the plain body.
pub fn digest_hex(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}
