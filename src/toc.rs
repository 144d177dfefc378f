//! Table-of-contents extraction from raw Markdown.
//!
//! Headings are recognized line-by-line, before Markdown conversion: after
//! left-trim, a line starting with exactly `## ` is a level-2 heading and
//! `### ` a level-3 heading. No other ATX levels participate in the TOC —
//! `#` is reserved for the page title and `####`+ is below the fold.
//!
//! ## Anchor slugs
//!
//! Slugs must be stable across builds so inbound fragment links keep working:
//! lowercase, strip everything outside `[a-z0-9\s-]`, collapse whitespace
//! runs to single hyphens. Headings that clean down to nothing (all symbols,
//! or entirely non-ASCII) fall back to `heading-<hex16>`, the first 16 hex
//! chars of the SHA-256 of the lowercased text — deterministic, so the same
//! heading always yields the same anchor. Identical headings within one
//! document share a slug; there is no per-document disambiguation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// One heading in a document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level: 2 or 3.
    pub level: u8,
    /// Display text, as written in the Markdown.
    pub text: String,
    /// Anchor slug injected into the rendered heading tag.
    pub id: String,
}

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Scan Markdown for `## `/`### ` headings, in document order.
pub fn extract_toc(markdown: &str) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        let (level, text) = if let Some(rest) = trimmed.strip_prefix("### ") {
            (3u8, rest)
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            (2u8, rest)
        } else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        entries.push(TocEntry {
            level,
            text: text.to_string(),
            id: slugify(text),
        });
    }
    entries
}

/// Compute the anchor slug for a heading.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let lowered = lowered.trim();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let slug = WHITESPACE_RUN.replace_all(cleaned.trim(), "-").to_string();
    if slug.is_empty() {
        let hex = format!("{:x}", Sha256::digest(lowered.as_bytes()));
        format!("heading-{}", &hex[..16])
    } else {
        slug
    }
}
