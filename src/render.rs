//! HTML page and RSS feed rendering.
//!
//! Takes the assembled entry list and writes the final outputs:
//!
//! - one `index.html` beside each entry's source document;
//! - the site index page listing the most recent entries;
//! - an RSS 2.0 feed over the same slice.
//!
//! HTML is generated with [maud](https://maud.lambda.xyz/) — compile-time
//! checked templates with automatic escaping. The feed is assembled as a
//! plain string with explicit XML escaping, since RSS is a fixed skeleton
//! that gains nothing from a template layer.

use crate::config::Configuration;
use crate::datetime;
use crate::entry::Entry;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the recent-entries sidebar and index listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub title: String,
    pub href: String,
    pub date_local: String,
    pub is_current: bool,
}

/// The bounded recent-entries summary shown on every page.
pub fn recent_entries(
    config: &Configuration,
    entries: &[Entry],
    current_url_path: Option<&str>,
) -> Vec<RecentEntry> {
    entries
        .iter()
        .take(config.index.recent_count)
        .map(|entry| RecentEntry {
            title: entry.title.clone(),
            href: absolute_url(config, &entry.url_path),
            date_local: local_date(entry),
            is_current: Some(entry.url_path.as_str()) == current_url_path,
        })
        .collect()
}

/// Write every output: entry pages, the site index, and the feed.
pub fn write_site(
    config: &Configuration,
    base_dir: &Path,
    entries: &[Entry],
) -> Result<(), RenderError> {
    for entry in entries {
        let page = render_entry_page(config, entries, entry);
        let target = entry
            .source_path
            .parent()
            .unwrap_or(Path::new("."))
            .join("index.html");
        fs::write(target, page.into_string())?;
    }

    let recent = &entries[..entries.len().min(config.index.recent_count)];

    let index_path = config.index_html_in(base_dir);
    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&index_path, render_index_page(config, recent).into_string())?;

    let feed_path = config.feed_xml_in(base_dir);
    if let Some(parent) = feed_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&feed_path, render_feed(config, recent))?;

    Ok(())
}

fn absolute_url(config: &Configuration, url_path: &str) -> String {
    format!("{}{}", config.site.base_url.trim_end_matches('/'), url_path)
}

/// Dates from sidecars normally parse; a hand-edited one that does not is
/// shown raw rather than sinking the entry.
fn local_date(entry: &Entry) -> String {
    datetime::to_local_display(&entry.publish_date)
        .unwrap_or_else(|_| entry.publish_date.clone())
}

fn rss_date(stored: &str) -> String {
    datetime::to_rfc1123_gmt(stored).unwrap_or_else(|_| stored.to_string())
}

// ============================================================================
// HTML components
// ============================================================================

fn page_head(config: &Configuration, title: &str, entry: Option<&Entry>) -> Markup {
    html! {
        head {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width,initial-scale=1";
            title { (title) }
            link rel="icon" href=(config.site.favicon_url);
            link rel="alternate" type="application/rss+xml" title="RSS Feed" href=(config.site.feed_url);
            @if let Some(entry) = entry {
                @if let Some(preview) = &entry.preview {
                    meta property="og:type" content="article";
                    meta property="og:title" content=(entry.title);
                    meta property="og:description" content=(preview.description);
                    meta property="og:url" content=(absolute_url(config, &entry.url_path));
                    meta property="og:image" content=(preview.image_url);
                    meta name="twitter:card" content="summary_large_image";
                }
            }
        }
    }
}

fn site_header(config: &Configuration) -> Markup {
    html! {
        header.site-header {
            h1 {
                a href=(config.site.top_url) { (config.site.title) }
            }
        }
    }
}

fn site_footer(config: &Configuration) -> Markup {
    html! {
        footer.site-footer {
            p {
                small {
                    a href=(config.author.url) { (config.author.name) }
                }
            }
        }
    }
}

fn links_list(config: &Configuration) -> Markup {
    html! {
        @if !config.links.is_empty() {
            nav.links {
                ul {
                    @for link in &config.links {
                        li {
                            a href=(link.url) rel="noopener" { (link.title) }
                        }
                    }
                }
            }
        }
    }
}

fn recent_list(recent: &[RecentEntry]) -> Markup {
    html! {
        aside.recent {
            h2 { "Recent entries" }
            ul {
                @for row in recent {
                    li class=[row.is_current.then_some("current")] {
                        a href=(row.href) { (row.title) }
                        span.date { (row.date_local) }
                    }
                }
            }
        }
    }
}

fn toc_block(entry: &Entry) -> Markup {
    html! {
        @if !entry.toc.is_empty() {
            nav.toc {
                ul {
                    @for item in &entry.toc {
                        li class={ "toc-level-" (item.level) } {
                            a href={ "#" (item.id) } { (item.text) }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Page renderers
// ============================================================================

/// Render one entry's page.
pub fn render_entry_page(config: &Configuration, all_entries: &[Entry], entry: &Entry) -> Markup {
    let recent = recent_entries(config, all_entries, Some(&entry.url_path));
    html! {
        (DOCTYPE)
        html lang=(config.site.language) {
            (page_head(config, &format!("{} - {}", entry.title, config.site.title), Some(entry)))
            body {
                (site_header(config))
                article.entry {
                    h1 { (entry.title) }
                    div.byline {
                        img.author-icon src=(config.author.icon_url) alt=(config.author.name) width="16" height="16";
                        span { "✍ : " (local_date(entry)) }
                    }
                    (toc_block(entry))
                    div.entry-body {
                        (PreEscaped(&entry.html))
                    }
                }
                (recent_list(&recent))
                (links_list(config))
                (site_footer(config))
            }
        }
    }
}

/// Render the site index listing the recent slice.
pub fn render_index_page(config: &Configuration, recent: &[Entry]) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(config.site.language) {
            (page_head(config, &config.site.title, None))
            body {
                (site_header(config))
                main.index {
                    ul.entries {
                        @for entry in recent {
                            li {
                                a href=(absolute_url(config, &entry.url_path)) { (entry.title) }
                                p.date { (local_date(entry)) }
                                p.summary { (entry.summary()) }
                            }
                        }
                    }
                }
                (links_list(config))
                (site_footer(config))
            }
        }
    }
}

// ============================================================================
// RSS feed
// ============================================================================

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the RSS 2.0 feed over the recent slice.
pub fn render_feed(config: &Configuration, recent: &[Entry]) -> String {
    let last_pub = recent
        .first()
        .map(|entry| rss_date(&entry.publish_date))
        .unwrap_or_default();

    let mut items = String::new();
    for entry in recent {
        let link = absolute_url(config, &entry.url_path);
        items.push_str(&format!(
            "    <item>\n        <title>{title}</title>\n        <link>{link}</link>\n        <description/>\n        <content:encoded>\n{content}\n        </content:encoded>\n        <pubDate>{pub_date}</pubDate>\n        <guid>{link}</guid>\n    </item>\n",
            title = escape_xml(&entry.title),
            link = link,
            content = escape_xml(&entry.summary()),
            pub_date = rss_date(&entry.publish_date),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" xmlns:atom=\"http://www.w3.org/2005/Atom\" version=\"2.0\">\n    <channel>\n    <title>{title}</title>\n    <link>{link}</link>\n    <atom:link href=\"{feed}\" rel=\"self\" type=\"application/rss+xml\"/>\n    <description>{description}</description>\n    <language>{language}</language>\n    <pubDate>{last_pub}</pubDate>\n{items}    </channel>\n</rss>\n",
        title = escape_xml(&config.site.title),
        link = escape_xml(&config.site.base_url),
        feed = escape_xml(&config.site.feed_url),
        description = escape_xml(&config.site.description),
        language = escape_xml(&config.site.language),
    )
}
