//! Site configuration module.
//!
//! Handles loading and validating the top-level `config.toml`. Relative
//! paths in the file (`document_root`, `index_html`, `feed_xml`) are
//! resolved against the config file's own directory, so a site can be built
//! from anywhere.
//!
//! ## Configuration Options
//!
//! See [`stock_config_toml`] for the full annotated stock config. Config
//! files are sparse — override just the values you want. Unknown keys are
//! rejected to catch typos early. A missing or unparseable file is fatal to
//! the whole build.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// Content tree holding one directory per entry.
    pub document_root: String,
    /// Output path of the site index page.
    pub index_html: String,
    /// Output path of the RSS feed.
    pub feed_xml: String,
    pub site: SiteConfig,
    pub author: AuthorConfig,
    pub index: IndexConfig,
    /// Ordered external links rendered on every page.
    pub links: Vec<Link>,
    pub images: ImagesConfig,
    pub ogp: OgpConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            document_root: "posts".to_string(),
            index_html: "public/index.html".to_string(),
            feed_xml: "public/feed.xml".to_string(),
            site: SiteConfig::default(),
            author: AuthorConfig::default(),
            index: IndexConfig::default(),
            links: Vec::new(),
            images: ImagesConfig::default(),
            ogp: OgpConfig::default(),
        }
    }
}

impl Configuration {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_root.is_empty() {
            return Err(ConfigError::Validation(
                "document_root must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be within 0..1".into(),
            ));
        }
        if self.images.thumb_width == 0 {
            return Err(ConfigError::Validation(
                "images.thumb_width must be non-zero".into(),
            ));
        }
        if self.index.recent_count == 0 {
            return Err(ConfigError::Validation(
                "index.recent_count must be at least 1".into(),
            ));
        }
        if self.ogp.enabled && (self.ogp.width == 0 || self.ogp.height == 0) {
            return Err(ConfigError::Validation(
                "ogp.width and ogp.height must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn document_root_in(&self, base: &Path) -> PathBuf {
        base.join(&self.document_root)
    }

    pub fn index_html_in(&self, base: &Path) -> PathBuf {
        base.join(&self.index_html)
    }

    pub fn feed_xml_in(&self, base: &Path) -> PathBuf {
        base.join(&self.feed_xml)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub language: String,
    /// Href of the site-title link in the page header.
    pub top_url: String,
    /// Prefix for absolute entry links (index, feed, OGP tags).
    pub base_url: String,
    pub favicon_url: String,
    /// Public URL of the feed, used in `rel="alternate"` links.
    pub feed_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Journal".to_string(),
            description: "Notes from a small corner of the web".to_string(),
            language: "en".to_string(),
            top_url: "/".to_string(),
            base_url: "https://example.com".to_string(),
            favicon_url: "/favicon.png".to_string(),
            feed_url: "/feed.xml".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: String,
    pub url: String,
    pub icon_url: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "@author".to_string(),
            url: "https://example.com/about".to_string(),
            icon_url: "/icon.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Bound on the index page, the feed, and the recent-entries sidebar.
    pub recent_count: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { recent_count: 30 }
    }
}

/// One external link shown on every page, in config order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Max width of the `-full` variant. Zero disables downscaling.
    pub full_max_width: u32,
    /// Width of the `-thumb` variant shown inline.
    pub thumb_width: u32,
    /// Lossy encode quality, 0..1.
    pub quality: f32,
    /// Resampling filter used for both variants.
    pub filter: ResizeFilter,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            full_max_width: 1200,
            thumb_width: 320,
            quality: 0.85,
            filter: ResizeFilter::default(),
        }
    }
}

/// Resampling filter names accepted in `images.filter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResizeFilter {
    pub fn to_filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OgpConfig {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub title_color: String,
    pub body_color: String,
    pub accent_color: String,
    /// TTF/OTF used for card text. Empty means no text is drawn.
    pub font_path: String,
    /// Raster icon composited bottom-right. Empty means none.
    pub author_icon_path: String,
}

impl Default for OgpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 1200,
            height: 630,
            background_color: "#101827".to_string(),
            title_color: "#ffffff".to_string(),
            body_color: "#e5e7eb".to_string(),
            accent_color: "#f97316".to_string(),
            font_path: String::new(),
            author_icon_path: String::new(),
        }
    }
}

/// Load and validate the configuration file. Any failure here is fatal.
pub fn load_config(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Configuration = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// The stock config with every option documented, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# plainlog site configuration
# All options are optional - defaults shown below

document_root = "posts"            # Content tree, one entry per directory
index_html = "public/index.html"   # Where the site index page is written
feed_xml = "public/feed.xml"       # Where the RSS feed is written

[site]
title = "My Journal"
description = "Notes from a small corner of the web"
language = "en"
top_url = "/"                      # Href of the site-title link
base_url = "https://example.com"   # Prefix for absolute entry links
favicon_url = "/favicon.png"
feed_url = "/feed.xml"             # Public URL of the feed

[author]
name = "@author"
url = "https://example.com/about"
icon_url = "/icon.png"

[index]
recent_count = 30                  # Entries shown on index, feed, sidebar

# Ordered list of external links shown on every page
# [[links]]
# title = "GitHub"
# url = "https://github.com/author"

[images]
full_max_width = 1200              # Max width of the -full variant
thumb_width = 320                  # Width of the -thumb variant
quality = 0.85                     # Lossy encode quality (0..1)
filter = "lanczos3"                # nearest|triangle|catmullrom|gaussian|lanczos3

[ogp]
enabled = false
width = 1200
height = 630
background_color = "#101827"
title_color = "#ffffff"
body_color = "#e5e7eb"
accent_color = "#f97316"
font_path = ""                     # TTF/OTF for card text; empty = no text
author_icon_path = ""              # Raster icon drawn bottom-right
"##
}
