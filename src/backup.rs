use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BackupConfig;

const STAMP_FMT: &str = "%Y%m%d%H%M%S%3f";

/// Copies `source` into `backup_dir` as `<stem>_<timestamp>.<ext>` and prunes
/// older copies per `policy`. Returns `None` when there is nothing to copy.
pub fn snapshot(source: &Path, backup_dir: &Path, policy: &BackupConfig) -> Result<Option<PathBuf>> {
    if !source.exists() {
        return Ok(None);
    }
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create {}", backup_dir.display()))?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("store");
    let ext = source.extension().and_then(|e| e.to_str()).unwrap_or("bak");
    let stamp = Local::now().format(STAMP_FMT);
    let dest = backup_dir.join(format!("{stem}_{stamp}.{ext}"));
    fs::copy(source, &dest)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;
    log::debug!("backed up {} to {}", source.display(), dest.display());
    prune(backup_dir, stem, policy)?;
    Ok(Some(dest))
}

/// Snapshots of `stem` in `dir`, newest first. Timestamped names sort in
/// creation order.
pub fn list_snapshots(dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let prefix = format!("{stem}_");
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();
    paths.sort();
    paths.reverse();
    Ok(paths)
}

fn prune(dir: &Path, stem: &str, policy: &BackupConfig) -> Result<()> {
    let paths = list_snapshots(dir, stem)?;
    if paths.len() <= policy.keep_recent + policy.keep_historical {
        return Ok(());
    }
    let older = paths[policy.keep_recent..].to_vec();
    let historical = pick_historical(&older, policy.keep_historical);
    for path in older {
        if !historical.contains(&path) {
            if let Err(err) = fs::remove_file(&path) {
                log::warn!("could not prune backup {}: {err}", path.display());
            }
        }
    }
    Ok(())
}

/// `count` snapshots spread evenly across `paths`.
fn pick_historical(paths: &[PathBuf], count: usize) -> Vec<PathBuf> {
    if count == 0 || paths.is_empty() {
        return Vec::new();
    }
    let step = std::cmp::max(1, paths.len() / count);
    paths.iter().step_by(step).take(count).cloned().collect()
}
