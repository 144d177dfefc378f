//! Social preview-image (OGP) generation and caching.
//!
//! Each entry can carry an `ogp.png` beside its `index.md`, drawn from the
//! entry title and a truncated plain-text description. Validity derives
//! from the sidecar digest comparison, not from a hash of the PNG itself: a
//! card is redrawn only when the content changed or the file is missing.
//!
//! Drawing failures are never fatal — the entry just ships without preview
//! fields.
//!
//! ## Asset cache
//!
//! Decoding a TTF and the author icon is expensive relative to the rest of
//! the build, so the renderer memoizes both. The cache is owned by the
//! renderer instance rather than process-global state, keeping instances
//! independent in tests. Single-threaded builds make this safe without
//! locking.

use crate::config::OgpConfig;
use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Preview filename within an entry directory.
pub const PREVIEW_FILENAME: &str = "ogp.png";

/// Description limit in Unicode code points (not UTF-16 units, not bytes).
const DESCRIPTION_LIMIT: usize = 100;

const MARGIN: i32 = 64;
const ACCENT_BAR_HEIGHT: u32 = 8;
const ICON_SIZE: u32 = 96;

const SITE_SCALE: f32 = 42.0;
const TITLE_SCALE: f32 = 64.0;
const BODY_SCALE: f32 = 30.0;
const SITE_LINE_HEIGHT: i32 = 50;
const TITLE_LINE_HEIGHT: i32 = 70;
const BODY_LINE_HEIGHT: i32 = 46;
const BODY_MAX_LINES: usize = 5;

#[derive(Error, Debug)]
pub enum OgpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PNG encode failed: {0}")]
    Encode(String),
}

/// Prepare a plain body for the preview card: undo the entity escaping left
/// behind by tag stripping, then truncate to the code-point limit.
pub fn sanitize_description(body: &str) -> String {
    truncate_code_points(&unescape_entities(body), DESCRIPTION_LIMIT)
}

/// Truncate to at most `limit` code points, appending `…` only when
/// something was actually cut.
fn truncate_code_points(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push('…');
    cut
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Parse `#rrggbb`; anything else falls back to `default`.
pub fn parse_color(value: &str, default: [u8; 3]) -> [u8; 3] {
    let hex = match value.strip_prefix('#') {
        Some(hex) if hex.len() == 6 => hex,
        _ => return default,
    };
    let channel = |range| u8::from_str_radix(&hex[range], 16);
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Ok(r), Ok(g), Ok(b)) => [r, g, b],
        _ => default,
    }
}

/// Memoized font and icon, keyed by path so config edits are picked up.
#[derive(Default)]
struct AssetCache {
    font: Option<(PathBuf, FontVec)>,
    icon: Option<(PathBuf, DynamicImage)>,
}

/// Draws preview cards. Owns the decoded-asset cache.
pub struct PreviewRenderer {
    config: OgpConfig,
    cache: AssetCache,
}

impl PreviewRenderer {
    pub fn new(config: OgpConfig) -> Self {
        Self {
            config,
            cache: AssetCache::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// A preview is skipped only when the file exists *and* the stored
    /// sidecar digest equals the fresh one. A missing file is always drawn,
    /// even with an unchanged digest.
    pub fn needs_redraw(output: &Path, stored_digest_matches: bool) -> bool {
        !(output.exists() && stored_digest_matches)
    }

    /// Configured asset paths that do not point at readable files. Checked
    /// once per build so the degradation is reported, not silent.
    pub fn missing_assets(&self) -> Vec<(&'static str, PathBuf)> {
        let mut missing = Vec::new();
        for (label, configured) in [
            ("ogp.font_path", &self.config.font_path),
            ("ogp.author_icon_path", &self.config.author_icon_path),
        ] {
            if !configured.is_empty() && !Path::new(configured).is_file() {
                missing.push((label, PathBuf::from(configured)));
            }
        }
        missing
    }

    /// Draw one card and write it as PNG.
    pub fn generate(
        &mut self,
        site_title: &str,
        entry_title: &str,
        description: &str,
        output: &Path,
    ) -> Result<(), OgpError> {
        let width = self.config.width;
        let height = self.config.height;
        let background = parse_color(&self.config.background_color, [0x10, 0x18, 0x27]);
        let title_color = parse_color(&self.config.title_color, [0xFF, 0xFF, 0xFF]);
        let body_color = parse_color(&self.config.body_color, [0xE5, 0xE7, 0xEB]);
        let accent = parse_color(&self.config.accent_color, [0xF9, 0x73, 0x16]);

        self.ensure_font_loaded();
        self.ensure_icon_loaded();

        let mut canvas = RgbaImage::from_pixel(
            width,
            height,
            Rgba([background[0], background[1], background[2], 255]),
        );

        for y in height.saturating_sub(ACCENT_BAR_HEIGHT)..height {
            for x in 0..width {
                canvas.put_pixel(x, y, Rgba([accent[0], accent[1], accent[2], 255]));
            }
        }

        if let Some((_, font)) = &self.cache.font {
            let max_width = width as i32 - MARGIN * 2;
            let mut cursor_y = MARGIN;
            cursor_y = draw_wrapped(
                &mut canvas, font, SITE_SCALE, site_title, MARGIN, cursor_y, max_width,
                SITE_LINE_HEIGHT, usize::MAX, title_color,
            );
            cursor_y += 12;
            cursor_y = draw_wrapped(
                &mut canvas, font, TITLE_SCALE, entry_title, MARGIN, cursor_y, max_width,
                TITLE_LINE_HEIGHT, usize::MAX, title_color,
            );
            cursor_y += 18;
            draw_wrapped(
                &mut canvas, font, BODY_SCALE, description, MARGIN, cursor_y, max_width,
                BODY_LINE_HEIGHT, BODY_MAX_LINES, body_color,
            );
        }

        if let Some((_, icon)) = &self.cache.icon {
            draw_author_icon(&mut canvas, icon, width, height);
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        canvas
            .save(output)
            .map_err(|e| OgpError::Encode(format!("{}: {}", output.display(), e)))
    }

    fn ensure_font_loaded(&mut self) {
        let configured = &self.config.font_path;
        if configured.is_empty() {
            return;
        }
        let path = Path::new(configured);
        if let Some((cached_path, _)) = &self.cache.font
            && cached_path == path
        {
            return;
        }
        let Ok(data) = std::fs::read(path) else {
            return;
        };
        if let Ok(font) = FontVec::try_from_vec(data) {
            self.cache.font = Some((path.to_path_buf(), font));
        }
    }

    fn ensure_icon_loaded(&mut self) {
        let configured = &self.config.author_icon_path;
        if configured.is_empty() {
            return;
        }
        let path = Path::new(configured);
        if let Some((cached_path, _)) = &self.cache.icon
            && cached_path == path
        {
            return;
        }
        if let Ok(icon) = image::open(path) {
            self.cache.icon = Some((path.to_path_buf(), icon));
        }
    }
}

/// Word-wrap `text` into `max_width` and draw up to `max_lines` lines.
/// Returns the y cursor after the last line.
fn draw_wrapped(
    canvas: &mut RgbaImage,
    font: &FontVec,
    scale: f32,
    text: &str,
    x: i32,
    start_y: i32,
    max_width: i32,
    line_height: i32,
    max_lines: usize,
    color: [u8; 3],
) -> i32 {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure_line(font, scale, &candidate) > max_width as f32 && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
        if lines.len() >= max_lines {
            break;
        }
    }
    if lines.len() < max_lines && !current.is_empty() {
        lines.push(current);
    }

    let mut y = start_y;
    for line in lines.iter().take(max_lines) {
        draw_line(canvas, font, scale, line, x as f32, y as f32, color);
        y += line_height;
    }
    y
}

fn measure_line(font: &FontVec, scale: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(PxScale::from(scale));
    let mut width = 0.0;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev_id) = prev {
            width += scaled.kern(prev_id, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Rasterize one line with `y` as the baseline.
fn draw_line(
    canvas: &mut RgbaImage,
    font: &FontVec,
    scale: f32,
    text: &str,
    x: f32,
    baseline: f32,
    color: [u8; 3],
) {
    let scaled = font.as_scaled(PxScale::from(scale));
    let mut caret = x;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let id = scaled.glyph_id(ch);
        if let Some(prev_id) = prev {
            caret += scaled.kern(prev_id, id);
        }
        let glyph: Glyph = id.with_scale_and_position(PxScale::from(scale), point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                blend_pixel(canvas, px, py, color, coverage);
            });
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 3], coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for i in 0..3 {
        pixel.0[i] =
            (color[i] as f32 * alpha + pixel.0[i] as f32 * (1.0 - alpha)).round() as u8;
    }
}

/// Composite the author icon bottom-right, clipped to a circle with a thin
/// white ring.
fn draw_author_icon(canvas: &mut RgbaImage, icon: &DynamicImage, width: u32, height: u32) {
    if width < ICON_SIZE + MARGIN as u32 || height < ICON_SIZE + MARGIN as u32 {
        return;
    }
    let scaled = icon
        .resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Triangle)
        .to_rgba8();
    let x0 = width - MARGIN as u32 - ICON_SIZE;
    let y0 = height - MARGIN as u32 - ICON_SIZE;
    let center = ICON_SIZE as f32 / 2.0 - 0.5;
    let radius = ICON_SIZE as f32 / 2.0;
    for (dx, dy, pixel) in scaled.enumerate_pixels() {
        let distance =
            ((dx as f32 - center).powi(2) + (dy as f32 - center).powi(2)).sqrt();
        if distance > radius {
            continue;
        }
        let target = if distance >= radius - 2.0 {
            Rgba([255, 255, 255, 255])
        } else {
            *pixel
        };
        canvas.put_pixel(x0 + dx, y0 + dy, target);
    }
}
