//! CLI output formatting.
//!
//! Each report has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout/stderr.
//! Format functions are pure — no I/O, no side effects.
//!
//! Output is information-centric: entries are listed by positional index
//! and title, with the source path as indented secondary context.
//!
//! ```text
//! Entries
//! 001 Shipping the rewrite
//!     Source: 2025/08/shipping/index.md
//! 002 Hello again
//!     Source: 2025/07/hello/index.md
//!
//! warning: posts/2025/07/hello/pic.jpg: referenced image not found
//!
//! 2 entries: 0 new, 1 updated, 1 unchanged
//! ```

use crate::entry::Entry;
use crate::walk::{BuildStats, BuildWarning};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// One line per entry plus an indented source line, newest first.
pub fn format_entries(entries: &[Entry], root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    if entries.is_empty() {
        lines.push("No entries found".to_string());
        return lines;
    }
    lines.push("Entries".to_string());
    for (pos, entry) in entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(pos + 1), entry.title));
        let source = entry
            .source_path
            .strip_prefix(root)
            .unwrap_or(&entry.source_path);
        lines.push(format!("    Source: {}", source.display()));
    }
    lines
}

/// One line per recoverable failure, with path and cause.
pub fn format_warnings(warnings: &[BuildWarning]) -> Vec<String> {
    warnings
        .iter()
        .map(|w| format!("warning: {}: {}", w.path.display(), w.cause))
        .collect()
}

/// Closing lines: sidecar stats plus asset work, when any happened.
pub fn format_summary(stats: &BuildStats) -> Vec<String> {
    let mut lines = vec![stats.to_string()];
    if stats.images_encoded > 0 || stats.images_cached > 0 {
        lines.push(format!(
            "Images: {} encoded, {} cached",
            stats.images_encoded, stats.images_cached
        ));
    }
    if stats.previews_drawn > 0 || stats.previews_cached > 0 {
        lines.push(format!(
            "Previews: {} drawn, {} cached",
            stats.previews_drawn, stats.previews_cached
        ));
    }
    lines
}

pub fn print_build_output(entries: &[Entry], root: &Path, warnings: &[BuildWarning], stats: &BuildStats) {
    for line in format_entries(entries, root) {
        println!("{line}");
    }
    for line in format_warnings(warnings) {
        eprintln!("{line}");
    }
    for line in format_summary(stats) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(title: &str, source: &str) -> Entry {
        Entry {
            source_path: PathBuf::from(source),
            url_path: "/post/".to_string(),
            title: title.to_string(),
            markdown: String::new(),
            html: String::new(),
            body: String::new(),
            publish_date: "2025-01-01 00:00:00".to_string(),
            update_date: "2025-01-01 00:00:00".to_string(),
            body_digest: "d".to_string(),
            toc: Vec::new(),
            preview: None,
        }
    }

    #[test]
    fn entries_listed_with_relative_sources() {
        let lines = format_entries(
            &[entry("First Post", "/srv/posts/a/index.md")],
            Path::new("/srv/posts"),
        );
        assert_eq!(lines[0], "Entries");
        assert_eq!(lines[1], "001 First Post");
        assert_eq!(lines[2], "    Source: a/index.md");
    }

    #[test]
    fn empty_build_says_so() {
        let lines = format_entries(&[], Path::new("/srv"));
        assert_eq!(lines, vec!["No entries found"]);
    }

    #[test]
    fn warnings_show_path_and_cause() {
        let warnings = vec![BuildWarning {
            path: PathBuf::from("posts/a/pic.jpg"),
            cause: "referenced image not found".to_string(),
        }];
        let lines = format_warnings(&warnings);
        assert_eq!(
            lines,
            vec!["warning: posts/a/pic.jpg: referenced image not found"]
        );
    }

    #[test]
    fn summary_includes_asset_lines_only_when_used() {
        let mut stats = BuildStats::default();
        stats.entries = 1;
        stats.unchanged = 1;
        assert_eq!(format_summary(&stats).len(), 1);

        stats.images_encoded = 2;
        stats.previews_cached = 1;
        let lines = format_summary(&stats);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Images: 2 encoded, 0 cached");
        assert_eq!(lines[2], "Previews: 0 drawn, 1 cached");
    }
}
