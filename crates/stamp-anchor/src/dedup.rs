//! # Deduplication Engine
//!
//! Keeps one file per content id in the stamped directory. The survivor is
//! the first file in listing order; every later file with the same id is
//! removed. Directories are never touched.
//!
//! The pass is not transactional. A failed removal is logged and counted,
//! and the remaining removals still run. Running the pass again always
//! converges, and on an already deduplicated directory removes nothing.

use std::collections::HashSet;

use stamp_client::ContentStore;
use stamp_core::ContentEntry;

use crate::error::DedupError;

/// Which entries to keep and which to remove.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DedupPlan<'a> {
    /// First file per content id, in listing order.
    pub keep: Vec<&'a ContentEntry>,
    /// Later files sharing a kept file's content id.
    pub remove: Vec<&'a ContentEntry>,
}

/// Partition `entries` into survivors and duplicates.
pub fn plan_removals(entries: &[ContentEntry]) -> DedupPlan<'_> {
    let mut seen = HashSet::new();
    let mut plan = DedupPlan::default();
    for entry in entries.iter().filter(|e| e.is_file()) {
        if seen.insert(&entry.content_id) {
            plan.keep.push(entry);
        } else {
            plan.remove.push(entry);
        }
    }
    plan
}

/// Result of one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupReport {
    /// Files examined (directories excluded).
    pub scanned: usize,
    /// Duplicates removed.
    pub removed: usize,
    /// Duplicates whose removal failed.
    pub failed: usize,
    /// Surviving file per content id, in listing order.
    pub kept: Vec<ContentEntry>,
}

/// Remove every duplicate file from the stamped directory.
///
/// Fails only if the directory cannot be listed.
pub async fn remove_duplicates(store: &dyn ContentStore) -> Result<DedupReport, DedupError> {
    let entries = store.list().await?;
    let plan = plan_removals(&entries);

    let mut report = DedupReport {
        scanned: plan.keep.len() + plan.remove.len(),
        kept: plan.keep.iter().map(|e| (*e).clone()).collect(),
        ..DedupReport::default()
    };

    for victim in &plan.remove {
        match store.remove(&victim.name).await {
            Ok(()) => {
                tracing::info!(name = %victim.name, cid = %victim.content_id, "removed duplicate file");
                report.removed += 1;
            }
            Err(e) => {
                tracing::warn!(name = %victim.name, cid = %victim.content_id, error = %e, "failed to remove duplicate file");
                report.failed += 1;
            }
        }
    }

    if report.removed > 0 || report.failed > 0 {
        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "deduplication pass complete"
        );
    }
    Ok(report)
}
