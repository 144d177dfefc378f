//! Entry metadata sidecars for incremental builds.
//!
//! Each entry directory carries a `meta.toml` beside its `index.md`. The
//! sidecar pins the publish date across rebuilds and caches the fields used
//! for cheap change detection: the body digest plus title, summary, and
//! TOC. The comparison is the full tuple — a title edit must advance the
//! update date even when the body digest is unchanged.
//!
//! ## Lifecycle
//!
//! - First build: created with publish = update = now.
//! - Later builds, nothing changed: no disk write at all, so idle rebuilds
//!   leave byte-identical sidecars.
//! - Later builds, anything changed: rewritten with update = now and the
//!   cached fields replaced; the publish date is carried over.
//!
//! ## Legacy schema
//!
//! Earlier sidecars held only the dates and the digest. Those still parse
//! and are upgraded in place on the next build without losing the original
//! publish date. A sidecar that parses as neither schema is treated as
//! absent and recreated; the historical publish date is lost, and that loss
//! is reported.
//!
//! ## Phases
//!
//! [`resolve`] is a pure decision function — no I/O — so the caching logic
//! is unit-testable without touching a filesystem. [`commit`] performs the
//! write that the decision calls for.

use crate::toc::TocEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sidecar filename within an entry directory.
pub const SIDECAR_FILENAME: &str = "meta.toml";

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Current sidecar schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub publish_date: String,
    pub update_date: String,
    /// SHA-256 hex digest of the stripped plain body.
    pub body_digest: String,
    pub title: String,
    pub summary: String,
    pub toc: Vec<TocEntry>,
}

/// Legacy schema: dates and digest only. Read, never written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyEntryMeta {
    pub publish_date: String,
    pub update_date: String,
    pub body_digest: String,
}

/// Fresh values computed from the current document contents.
#[derive(Debug, Clone)]
pub struct FreshMeta {
    pub body_digest: String,
    pub title: String,
    pub summary: String,
    pub toc: Vec<TocEntry>,
}

/// What was found on disk.
#[derive(Debug)]
pub enum LoadedMeta {
    Absent,
    Current(EntryMeta),
    Legacy(LegacyEntryMeta),
    /// Unreadable or parseable as neither schema; carries the cause.
    Corrupt(String),
}

/// What [`resolve`] decided to do about the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaAction {
    /// Stored record matches the fresh values; nothing to write.
    Unchanged,
    /// No sidecar existed; a fresh one is created.
    Created,
    /// Cached fields diverged; rewritten with update = now.
    Updated,
    /// Legacy schema upgraded in place, publish date preserved.
    Migrated,
    /// Corrupt sidecar replaced; the old publish date is lost.
    Recreated,
}

/// Outcome of the pure resolution phase.
#[derive(Debug)]
pub struct MetaDecision {
    /// The record that is (or already was) on disk after [`commit`].
    pub record: EntryMeta,
    pub action: MetaAction,
    /// True when a previously stored digest equals the fresh one. Drives
    /// the preview-image regeneration check.
    pub stored_digest_matches: bool,
}

pub fn sidecar_path(entry_dir: &Path) -> PathBuf {
    entry_dir.join(SIDECAR_FILENAME)
}

/// Read the sidecar, trying the current schema first, then the legacy one.
pub fn load(entry_dir: &Path) -> LoadedMeta {
    let path = sidecar_path(entry_dir);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return LoadedMeta::Absent,
        Err(e) => return LoadedMeta::Corrupt(e.to_string()),
    };
    match toml::from_str::<EntryMeta>(&content) {
        Ok(meta) => LoadedMeta::Current(meta),
        Err(current_err) => match toml::from_str::<LegacyEntryMeta>(&content) {
            Ok(legacy) => LoadedMeta::Legacy(legacy),
            Err(_) => LoadedMeta::Corrupt(current_err.to_string()),
        },
    }
}

/// Decide dates and whether the sidecar needs rewriting. Pure — no I/O.
pub fn resolve(loaded: LoadedMeta, fresh: FreshMeta, now: &str) -> MetaDecision {
    match loaded {
        LoadedMeta::Absent => MetaDecision {
            record: new_record(fresh, now.to_string(), now.to_string()),
            action: MetaAction::Created,
            stored_digest_matches: false,
        },
        LoadedMeta::Corrupt(_) => MetaDecision {
            record: new_record(fresh, now.to_string(), now.to_string()),
            action: MetaAction::Recreated,
            stored_digest_matches: false,
        },
        LoadedMeta::Current(stored) => {
            let digest_matches = stored.body_digest == fresh.body_digest;
            let unchanged = digest_matches
                && stored.title == fresh.title
                && stored.summary == fresh.summary
                && stored.toc == fresh.toc;
            if unchanged {
                MetaDecision {
                    record: stored,
                    action: MetaAction::Unchanged,
                    stored_digest_matches: true,
                }
            } else {
                MetaDecision {
                    record: new_record(fresh, stored.publish_date, now.to_string()),
                    action: MetaAction::Updated,
                    stored_digest_matches: digest_matches,
                }
            }
        }
        LoadedMeta::Legacy(legacy) => {
            let digest_matches = legacy.body_digest == fresh.body_digest;
            let update_date = if digest_matches {
                legacy.update_date
            } else {
                now.to_string()
            };
            MetaDecision {
                record: new_record(fresh, legacy.publish_date, update_date),
                action: MetaAction::Migrated,
                stored_digest_matches: digest_matches,
            }
        }
    }
}

fn new_record(fresh: FreshMeta, publish_date: String, update_date: String) -> EntryMeta {
    EntryMeta {
        publish_date,
        update_date,
        body_digest: fresh.body_digest,
        title: fresh.title,
        summary: fresh.summary,
        toc: fresh.toc,
    }
}

/// Persist the decision. [`MetaAction::Unchanged`] writes nothing.
pub fn commit(entry_dir: &Path, decision: &MetaDecision) -> Result<(), MetaError> {
    if decision.action == MetaAction::Unchanged {
        return Ok(());
    }
    let serialized = toml::to_string(&decision.record)?;
    fs::write(sidecar_path(entry_dir), serialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fresh(digest: &str, title: &str) -> FreshMeta {
        FreshMeta {
            body_digest: digest.to_string(),
            title: title.to_string(),
            summary: format!("{title} summary"),
            toc: vec![TocEntry {
                level: 2,
                text: "Getting started".to_string(),
                id: "getting-started".to_string(),
            }],
        }
    }

    // =========================================================================
    // resolve() — pure decision phase
    // =========================================================================

    #[test]
    fn absent_sidecar_creates_with_both_dates_now() {
        let decision = resolve(LoadedMeta::Absent, fresh("d1", "T"), "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Created);
        assert_eq!(decision.record.publish_date, "2025-01-02 03:04:05");
        assert_eq!(decision.record.update_date, "2025-01-02 03:04:05");
        assert_eq!(decision.record.body_digest, "d1");
        assert!(!decision.stored_digest_matches);
    }

    #[test]
    fn unchanged_fields_keep_stored_dates() {
        let f = fresh("d1", "T");
        let stored = EntryMeta {
            publish_date: "2024-01-01 09:00:00".to_string(),
            update_date: "2024-06-01 10:00:00".to_string(),
            body_digest: f.body_digest.clone(),
            title: f.title.clone(),
            summary: f.summary.clone(),
            toc: f.toc.clone(),
        };
        let decision = resolve(LoadedMeta::Current(stored), f, "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Unchanged);
        assert_eq!(decision.record.publish_date, "2024-01-01 09:00:00");
        assert_eq!(decision.record.update_date, "2024-06-01 10:00:00");
        assert!(decision.stored_digest_matches);
    }

    #[test]
    fn digest_change_advances_update_and_keeps_publish() {
        let stored = EntryMeta {
            publish_date: "2024-01-01 09:00:00".to_string(),
            update_date: "2024-01-01 09:00:00".to_string(),
            body_digest: "old".to_string(),
            title: "T".to_string(),
            summary: "T summary".to_string(),
            toc: fresh("x", "T").toc,
        };
        let decision = resolve(
            LoadedMeta::Current(stored),
            fresh("new", "T"),
            "2025-01-02 03:04:05",
        );
        assert_eq!(decision.action, MetaAction::Updated);
        assert_eq!(decision.record.publish_date, "2024-01-01 09:00:00");
        assert_eq!(decision.record.update_date, "2025-01-02 03:04:05");
        assert_eq!(decision.record.body_digest, "new");
        assert!(!decision.stored_digest_matches);
    }

    #[test]
    fn title_change_alone_triggers_update() {
        let f = fresh("d1", "New Title");
        let stored = EntryMeta {
            publish_date: "2024-01-01 09:00:00".to_string(),
            update_date: "2024-01-01 09:00:00".to_string(),
            body_digest: "d1".to_string(),
            title: "Old Title".to_string(),
            summary: f.summary.clone(),
            toc: f.toc.clone(),
        };
        let decision = resolve(LoadedMeta::Current(stored), f, "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Updated);
        // Body digest alone matched; the full comparison still flagged change.
        assert!(decision.stored_digest_matches);
        assert_eq!(decision.record.title, "New Title");
    }

    #[test]
    fn toc_change_alone_triggers_update() {
        let f = fresh("d1", "T");
        let stored = EntryMeta {
            publish_date: "2024-01-01 09:00:00".to_string(),
            update_date: "2024-01-01 09:00:00".to_string(),
            body_digest: "d1".to_string(),
            title: "T".to_string(),
            summary: "T summary".to_string(),
            toc: Vec::new(),
        };
        let decision = resolve(LoadedMeta::Current(stored), f, "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Updated);
    }

    #[test]
    fn legacy_migrates_and_preserves_publish_date() {
        let legacy = LegacyEntryMeta {
            publish_date: "2023-05-05 05:05:05".to_string(),
            update_date: "2023-06-06 06:06:06".to_string(),
            body_digest: "d1".to_string(),
        };
        let decision = resolve(LoadedMeta::Legacy(legacy), fresh("d1", "T"), "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Migrated);
        assert_eq!(decision.record.publish_date, "2023-05-05 05:05:05");
        assert_eq!(decision.record.update_date, "2023-06-06 06:06:06");
        assert_eq!(decision.record.title, "T");
        assert!(decision.stored_digest_matches);
    }

    #[test]
    fn legacy_with_changed_digest_also_advances_update() {
        let legacy = LegacyEntryMeta {
            publish_date: "2023-05-05 05:05:05".to_string(),
            update_date: "2023-06-06 06:06:06".to_string(),
            body_digest: "old".to_string(),
        };
        let decision = resolve(LoadedMeta::Legacy(legacy), fresh("new", "T"), "2025-01-02 03:04:05");
        assert_eq!(decision.action, MetaAction::Migrated);
        assert_eq!(decision.record.publish_date, "2023-05-05 05:05:05");
        assert_eq!(decision.record.update_date, "2025-01-02 03:04:05");
        assert!(!decision.stored_digest_matches);
    }

    #[test]
    fn corrupt_recreates_from_scratch() {
        let decision = resolve(
            LoadedMeta::Corrupt("bad".to_string()),
            fresh("d1", "T"),
            "2025-01-02 03:04:05",
        );
        assert_eq!(decision.action, MetaAction::Recreated);
        assert_eq!(decision.record.publish_date, "2025-01-02 03:04:05");
    }

    // =========================================================================
    // load() — schema detection
    // =========================================================================

    #[test]
    fn load_absent() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(load(tmp.path()), LoadedMeta::Absent));
    }

    #[test]
    fn load_current_schema_with_toc_array() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            sidecar_path(tmp.path()),
            r#"
publish_date = "2024-01-01 09:00:00"
update_date = "2024-01-02 12:00:00"
body_digest = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
title = "Sample entry title"
summary = "Sample summary that describes the entry body."

[[toc]]
level = 2
text = "Getting started"
id = "getting-started"

[[toc]]
level = 3
text = "Sidebar"
id = "sidebar"
"#,
        )
        .unwrap();

        match load(tmp.path()) {
            LoadedMeta::Current(meta) => {
                assert_eq!(meta.publish_date, "2024-01-01 09:00:00");
                assert_eq!(meta.toc.len(), 2);
                assert_eq!(meta.toc[0].text, "Getting started");
                assert_eq!(meta.toc[1].level, 3);
            }
            other => panic!("expected current schema, got {other:?}"),
        }
    }

    #[test]
    fn load_legacy_schema() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            sidecar_path(tmp.path()),
            "publish_date = \"2023-05-05 05:05:05\"\nupdate_date = \"2023-06-06 06:06:06\"\nbody_digest = \"abc\"\n",
        )
        .unwrap();

        match load(tmp.path()) {
            LoadedMeta::Legacy(legacy) => {
                assert_eq!(legacy.publish_date, "2023-05-05 05:05:05");
                assert_eq!(legacy.body_digest, "abc");
            }
            other => panic!("expected legacy schema, got {other:?}"),
        }
    }

    #[test]
    fn load_garbage_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        fs::write(sidecar_path(tmp.path()), "not = [valid").unwrap();
        assert!(matches!(load(tmp.path()), LoadedMeta::Corrupt(_)));
    }

    // =========================================================================
    // commit() — write phase
    // =========================================================================

    #[test]
    fn commit_roundtrips_through_load() {
        let tmp = TempDir::new().unwrap();
        let decision = resolve(LoadedMeta::Absent, fresh("d1", "T"), "2025-01-02 03:04:05");
        commit(tmp.path(), &decision).unwrap();

        match load(tmp.path()) {
            LoadedMeta::Current(meta) => assert_eq!(meta, decision.record),
            other => panic!("expected current schema, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_decision_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let first = resolve(LoadedMeta::Absent, fresh("d1", "T"), "2025-01-02 03:04:05");
        commit(tmp.path(), &first).unwrap();
        let bytes_before = fs::read(sidecar_path(tmp.path())).unwrap();

        // Second build over unchanged input: delete the file to prove commit
        // does not touch the disk at all.
        let second = resolve(load(tmp.path()), fresh("d1", "T"), "2026-09-09 09:09:09");
        assert_eq!(second.action, MetaAction::Unchanged);
        fs::remove_file(sidecar_path(tmp.path())).unwrap();
        commit(tmp.path(), &second).unwrap();
        assert!(!sidecar_path(tmp.path()).exists());

        // And when left in place, the bytes stay identical.
        fs::write(sidecar_path(tmp.path()), &bytes_before).unwrap();
        let third = resolve(load(tmp.path()), fresh("d1", "T"), "2027-01-01 00:00:00");
        commit(tmp.path(), &third).unwrap();
        assert_eq!(fs::read(sidecar_path(tmp.path())).unwrap(), bytes_before);
    }

    #[test]
    fn migration_is_one_time() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            sidecar_path(tmp.path()),
            "publish_date = \"2023-05-05 05:05:05\"\nupdate_date = \"2023-06-06 06:06:06\"\nbody_digest = \"d1\"\n",
        )
        .unwrap();

        let migrated = resolve(load(tmp.path()), fresh("d1", "T"), "2025-01-02 03:04:05");
        assert_eq!(migrated.action, MetaAction::Migrated);
        commit(tmp.path(), &migrated).unwrap();

        let settled = resolve(load(tmp.path()), fresh("d1", "T"), "2026-01-01 00:00:00");
        assert_eq!(settled.action, MetaAction::Unchanged);
        assert_eq!(settled.record.publish_date, "2023-05-05 05:05:05");
    }
}
