use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::cli::Cli;
use crate::hashes::{BuiltinHashes, KnownHashes};
use crate::mounts::{FilesystemProbe, MountTable};
use crate::report::ConsoleReport;
use crate::vuln::Vulnerabilities;

/// Settings for one scan. Built once, then shared read-only by every task.
#[derive(Clone)]
pub struct ScanContext {
    pub vulns: Vulnerabilities,
    pub excludes: HashSet<PathBuf>,
    pub scan_network: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub hashes: Arc<dyn KnownHashes>,
    pub filesystems: Arc<dyn FilesystemProbe>,
}

impl ScanContext {
    /// A context using the built-in digest table and no filesystem exclusions.
    pub fn new(vulns: Vulnerabilities) -> Self {
        Self {
            vulns,
            excludes: HashSet::new(),
            scan_network: false,
            verbose: false,
            quiet: false,
            hashes: Arc::new(BuiltinHashes),
            filesystems: Arc::new(MountTable::default()),
        }
    }

    pub fn with_hashes(mut self, hashes: Arc<dyn KnownHashes>) -> Self {
        self.hashes = hashes;
        self
    }

    pub fn with_filesystems(mut self, filesystems: Arc<dyn FilesystemProbe>) -> Self {
        self.filesystems = filesystems;
        self
    }

    pub fn with_excludes<I: IntoIterator<Item = PathBuf>>(mut self, excludes: I) -> Self {
        self.excludes.extend(excludes.into_iter().map(|p| clean_path(&p)));
        self
    }

    /// Whether `path` names one of the explicit excludes, after lexical cleaning.
    pub fn is_explicitly_excluded(&self, path: &Path) -> bool {
        !self.excludes.is_empty() && self.excludes.contains(&clean_path(path))
    }

    /// Whether the walk should skip `path` and, for a directory, everything below it.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.is_explicitly_excluded(path)
            || self.filesystems.is_pseudo(path)
            || (!self.scan_network && self.filesystems.is_network(path))
    }
}

/// Lexically normalize `path`: drop `.` components, resolve `..` against
/// preceding names and strip trailing separators. An empty result is `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

pub fn resolve_context(cli: &Cli) -> ScanContext {
    let mut vulns = cli.vulns;
    if cli.ignore_v1 {
        vulns = vulns.difference(Vulnerabilities::V1);
    }

    let mut ctx = ScanContext::new(vulns)
        .with_excludes(cli.exclude.iter().cloned())
        .with_filesystems(Arc::new(MountTable::load()));
    ctx.scan_network = cli.scan_network;
    ctx.verbose = cli.verbose;
    ctx.quiet = cli.quiet;
    ctx
}

pub fn resolve_report(cli: &Cli) -> Result<ConsoleReport> {
    match cli.log.as_deref() {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not create log file: {}", path.display()))?;
            Ok(ConsoleReport::with_log_file(cli.format, file))
        }
        None => Ok(ConsoleReport::new(cli.format)),
    }
}
