//! # plainlog
//!
//! A minimal static blog compiler for single-author Markdown journals.
//! Your filesystem is the data source: each directory holding an `index.md`
//! becomes one entry, and directory names decide ordering — date-named
//! trees come out newest-first with no explicit sort step.
//!
//! # Architecture: One Incremental Pass
//!
//! A build is a single depth-first walk over the content tree. For each
//! entry directory it loads the document, resolves the metadata sidecar,
//! refreshes image variants and the preview card when needed, then renders
//! every page at the end:
//!
//! ```text
//! walk posts/ ──▶ load index.md ──▶ meta.toml (dates, change detection)
//!                      │                  │
//!                      ▼                  ▼
//!               image variants        ogp.png (preview card)
//!                      │
//!                      ▼
//!            entry pages + index.html + feed.xml
//! ```
//!
//! State is fully distributed: one `meta.toml` and one optional `ogp.png`
//! per entry directory, no global index file. Two consecutive builds over
//! unchanged input write nothing — sidecars stay byte-identical and no
//! image or preview asset is re-encoded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Recursive discovery and entry assembly, descending-name order |
//! | [`markdown`] | Per-document pipeline: title header, conversion, id injection, hashing |
//! | [`toc`] | Heading extraction and stable anchor slugs |
//! | [`images`] | `![alt](...)` rewriting, variant generation, placeholder substitution |
//! | [`imaging`] | Resize/encode backend (`image` crate) behind a swappable trait |
//! | [`meta`] | `meta.toml` sidecars: publish-date pinning, change detection, legacy migration |
//! | [`ogp`] | Preview-card drawing and its digest-driven cache trigger |
//! | [`render`] | Entry pages, site index, and RSS feed |
//! | [`entry`] | The assembled content model handed to renderers |
//! | [`config`] | `config.toml` loading, validation, stock config generation |
//! | [`datetime`] | Stored-format timestamps and RSS/GMT conversion |
//! | [`output`] | CLI reporting — pure format functions plus print wrappers |
//!
//! # Design Decisions
//!
//! ## Content Hash Over Plain Text
//!
//! The change-detection digest covers the tag-stripped plain body, never
//! the raw Markdown or HTML. Reflowing a paragraph, switching emphasis
//! markers, or adding markup that leaves the visible text unchanged does
//! not touch the sidecar and does not advance the update date.
//!
//! ## Publish Dates Live Beside the Post
//!
//! There is no front-matter and no database: the first build stamps a
//! `meta.toml` next to the document, and that file pins the publish date
//! for as long as it exists. Edits advance only the update date.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/) — compile-time
//! checked templates, type-safe interpolation, auto-escaping, and no
//! runtime template directory to ship.
//!
//! ## Single-Threaded on Purpose
//!
//! A personal blog build is dominated by a handful of image encodes. One
//! writer and zero locks keeps the sidecar invariants trivial to reason
//! about; the walk is strictly sequential and deterministic.

pub mod config;
pub mod datetime;
pub mod entry;
pub mod images;
pub mod imaging;
pub mod markdown;
pub mod meta;
pub mod ogp;
pub mod output;
pub mod render;
pub mod toc;
pub mod walk;
