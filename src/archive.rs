//! Opening archives and classifying their members.
//!
//! Every archive, top-level or nested, is inspected as its own task in a
//! shared `rayon::Scope`. A nested archive is read into memory and handed
//! to a new task in the same scope, so the scope only completes once the
//! deepest level of nesting has been inspected.

use flate2::read::GzDecoder;
use log::{debug, info};
use rayon::Scope;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use zip::ZipArchive;

use crate::appended;
use crate::classify::Finding;
use crate::config::ScanContext;
use crate::error::LocateError;
use crate::mapped::MappedFile;
use crate::report::{Hit, Report};
use crate::sniff::sniff;

/// Upper bound for preallocating a nested member from its declared size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// jar, war, ear, zip
    Zip,
    /// gz, tgz, read as a gzip-compressed tar stream
    TarGz,
}

impl ArchiveKind {
    /// Kind of a file found by the directory walk.
    pub fn of_top_level(path: &Path) -> Option<Self> {
        match lowercase_extension(path)?.as_str() {
            "jar" | "war" | "ear" | "zip" => Some(Self::Zip),
            "gz" | "tgz" => Some(Self::TarGz),
            _ => None,
        }
    }
}

/// Whether an archive member is itself a zip-family archive worth descending into.
pub fn is_nested_archive(name: &str) -> bool {
    matches!(
        lowercase_extension(Path::new(name)).as_deref(),
        Some("jar" | "war" | "ear" | "zip")
    )
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Counters shared by every task of one scan.
#[derive(Debug, Default)]
pub struct Tally {
    pub archives: AtomicUsize,
    pub findings: AtomicUsize,
    pub diagnostics: AtomicUsize,
}

/// Inspects archives on behalf of one scan. Cheap to copy into spawned tasks.
#[derive(Clone, Copy)]
pub struct Inspector<'a> {
    ctx: &'a ScanContext,
    report: &'a dyn Report,
    tally: &'a Tally,
}

impl<'a> Inspector<'a> {
    pub fn new(ctx: &'a ScanContext, report: &'a dyn Report, tally: &'a Tally) -> Self {
        Self { ctx, report, tally }
    }

    pub fn context(&self) -> &'a ScanContext {
        self.ctx
    }

    /// Inspect a file found by the walk. Only this entry point falls back to
    /// searching for an appended zip when the standard parser gives up.
    pub fn inspect_file<'s>(&self, scope: &Scope<'s>, path: &Path)
    where
        'a: 's,
    {
        let label = path.display().to_string();
        match ArchiveKind::of_top_level(path) {
            Some(ArchiveKind::Zip) => match MappedFile::open(path) {
                Ok(mapped) => self.inspect_mapped_zip(scope, &label, mapped),
                Err(e) => self.diagnostic(&label, &format_args!("{e:#}")),
            },
            Some(ArchiveKind::TarGz) => match File::open(path) {
                Ok(file) => self.inspect_tar_gz(scope, &label, BufReader::new(file)),
                Err(e) => self.diagnostic(&label, &format_args!("can't open: {e}")),
            },
            None => {}
        }
    }

    fn inspect_mapped_zip<'s>(&self, scope: &Scope<'s>, label: &str, mapped: MappedFile)
    where
        'a: 's,
    {
        let size = mapped.len();
        match ZipArchive::new(Cursor::new(mapped.clone())) {
            Ok(mut archive) => self.walk_zip(scope, label, &mut archive),
            Err(open_err) => match appended::locate(Cursor::new(mapped), size) {
                Ok(mut located) => {
                    debug!("{label}: zip container starts at offset {}", located.offset);
                    self.walk_zip(scope, label, &mut located.archive);
                }
                Err(LocateError::NotFound) => self.diagnostic(
                    label,
                    &format_args!("can't open archive (size {size}): {open_err}"),
                ),
                Err(e) => self.diagnostic(label, &format_args!("can't open archive (size {size}): {e}")),
            },
        }
    }

    /// Inspect a zip-family archive. A malformed container is reported, never searched.
    pub fn inspect_zip<'s, R: Read + Seek>(&self, scope: &Scope<'s>, label: &str, reader: R)
    where
        'a: 's,
    {
        match ZipArchive::new(reader) {
            Ok(mut archive) => self.walk_zip(scope, label, &mut archive),
            Err(e) => self.diagnostic(label, &format_args!("can't open archive: {e}")),
        }
    }

    fn walk_zip<'s, R: Read + Seek>(&self, scope: &Scope<'s>, label: &str, archive: &mut ZipArchive<R>)
    where
        'a: 's,
    {
        self.announce(label);
        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    self.diagnostic(label, &format_args!("can't open member #{i} for reading: {e}"));
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if is_nested_archive(&name) {
                let mut buf = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
                if let Err(e) = entry.read_to_end(&mut buf) {
                    self.diagnostic(label, &format_args!("can't read member {name}: {e}"));
                    continue;
                }
                self.spawn_nested(scope, format!("{label}::{name}"), buf);
            } else {
                self.sniff_member(label, &name, &mut entry);
            }
        }
    }

    /// Inspect a gzip-compressed tar stream.
    pub fn inspect_tar_gz<'s, R: Read>(&self, scope: &Scope<'s>, label: &str, reader: R)
    where
        'a: 's,
    {
        self.announce(label);
        let mut tar = tar::Archive::new(GzDecoder::new(reader));
        let entries = match tar.entries() {
            Ok(entries) => entries,
            Err(e) => {
                self.diagnostic(label, &format_args!("can't open archive: {e}"));
                return;
            }
        };

        for entry in entries {
            // A broken header leaves no way to find the next member.
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.diagnostic(label, &format_args!("can't read archive: {e}"));
                    return;
                }
            };
            if entry.header().entry_type().is_dir() {
                continue;
            }
            let name = match entry.path() {
                Ok(path) => path.to_string_lossy().into_owned(),
                Err(e) => {
                    self.diagnostic(label, &format_args!("can't decode member name: {e}"));
                    continue;
                }
            };
            // A member that fails to read leaves the compressed stream unusable.
            if is_nested_archive(&name) {
                let mut buf = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
                if let Err(e) = entry.read_to_end(&mut buf) {
                    self.diagnostic(label, &format_args!("can't read member {name}: {e}"));
                    return;
                }
                self.spawn_nested(scope, format!("{label}::{name}"), buf);
            } else if !self.sniff_member(label, &name, &mut entry) {
                return;
            }
        }
    }

    fn spawn_nested<'s>(&self, scope: &Scope<'s>, label: String, buf: Vec<u8>)
    where
        'a: 's,
    {
        let inspector = *self;
        scope.spawn(move |scope| inspector.inspect_zip(scope, &label, Cursor::new(buf)));
    }

    /// Returns false when the member could not be read.
    fn sniff_member<R: Read>(&self, label: &str, name: &str, reader: R) -> bool {
        match sniff(reader, name, self.ctx.vulns, self.ctx.hashes.as_ref()) {
            Ok(Some(finding)) => self.found(label, name, finding),
            Ok(None) => {}
            Err(e) => {
                if !self.ctx.quiet {
                    self.diagnostic(label, &format_args!("can't read member {name}: {e}"));
                }
                return false;
            }
        }
        true
    }

    fn announce(&self, label: &str) {
        self.tally.archives.fetch_add(1, Ordering::Relaxed);
        if self.ctx.verbose {
            info!("Inspecting {label}...");
        }
    }

    fn found(&self, label: &str, name: &str, finding: Finding) {
        self.tally.findings.fetch_add(1, Ordering::Relaxed);
        self.report.finding(&Hit {
            archive: label.to_string(),
            member: name.to_string(),
            finding,
        });
    }

    pub fn diagnostic(&self, path: &str, message: &dyn fmt::Display) {
        self.tally.diagnostics.fetch_add(1, Ordering::Relaxed);
        self.report.diagnostic(path, message);
    }
}
