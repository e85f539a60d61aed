use ignore::{DirEntry, WalkBuilder};
use log::debug;
use rayon::Scope;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::archive::{ArchiveKind, Inspector, Tally};
use crate::config::{ScanContext, clean_path};
use crate::report::Report;

/// Totals for one completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub archives: usize,
    pub findings: usize,
    pub diagnostics: usize,
}

/// Walk every root and inspect each archive found, returning once the last
/// nested archive has been inspected.
pub fn scan<P: AsRef<Path> + Sync>(
    roots: &[P],
    ctx: &ScanContext,
    report: &dyn Report,
) -> ScanSummary {
    let tally = Tally::default();
    let inspector = Inspector::new(ctx, report, &tally);

    rayon::scope(|s| {
        for root in roots {
            walk_root(s, inspector, root.as_ref());
        }
    });

    ScanSummary {
        archives: tally.archives.load(Ordering::Relaxed),
        findings: tally.findings.load(Ordering::Relaxed),
        diagnostics: tally.diagnostics.load(Ordering::Relaxed),
    }
}

fn walk_root<'a: 's, 's>(scope: &Scope<'s>, inspector: Inspector<'a>, root: &Path) {
    let ctx = inspector.context();
    let root = clean_path(root);
    if ctx.is_excluded(&root) {
        debug!("skipping excluded root {}", root.display());
        return;
    }

    let filter_ctx = ctx.clone();
    let walker = WalkBuilder::new(&root)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry(move |entry| keep_entry(&filter_ctx, entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = error_path(&e).unwrap_or(root.as_path());
                inspector.diagnostic(&path.display().to_string(), &format_args!("{e}"));
                continue;
            }
        };
        if ArchiveKind::of_top_level(entry.path()).is_none() {
            continue;
        }
        if !is_archive_file(inspector, &entry) {
            continue;
        }
        let path: PathBuf = entry.into_path();
        scope.spawn(move |s| inspector.inspect_file(s, &path));
    }
}

/// Regular files qualify, and so do symlinks that resolve to one. Directory
/// symlinks are never followed.
fn is_archive_file(inspector: Inspector<'_>, entry: &DirEntry) -> bool {
    if !entry.path_is_symlink() {
        return entry.file_type().is_some_and(|t| t.is_file());
    }
    match fs::metadata(entry.path()) {
        Ok(meta) => meta.is_file(),
        Err(e) => {
            inspector.diagnostic(
                &entry.path().display().to_string(),
                &format_args!("can't open: {e}"),
            );
            false
        }
    }
}

/// Explicit excludes apply to any entry; filesystem checks only to directories.
fn keep_entry(ctx: &ScanContext, entry: &DirEntry) -> bool {
    let path = entry.path();
    if ctx.is_explicitly_excluded(path) {
        debug!("skipping excluded path {}", path.display());
        return false;
    }
    if entry.file_type().is_some_and(|t| t.is_dir()) && ctx.is_excluded(path) {
        debug!("skipping {} (excluded filesystem)", path.display());
        return false;
    }
    true
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}
