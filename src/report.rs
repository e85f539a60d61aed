//! Output sinks for findings and recoverable diagnostics.
//!
//! Scan tasks never print directly. Every finding and every diagnostic goes
//! through a [`Report`], which decides where lines end up and keeps
//! concurrent writers from interleaving mid-line.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classify::Finding;
use crate::cli::OutputFormat;

/// A finding located inside a (possibly nested) archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    /// Archive chain, joined with `::` for every level of nesting.
    pub archive: String,
    pub member: String,
    #[serde(flatten)]
    pub finding: Finding,
}

impl Hit {
    pub fn location(&self) -> String {
        format!("{}::{}", self.archive, self.member)
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "indicator for vulnerable component found in {} ({}): {} {} {}",
            self.archive,
            self.member,
            self.finding.filename,
            self.finding.version,
            self.finding.vulns
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

pub trait Report: Send + Sync {
    fn finding(&self, hit: &Hit);
    fn diagnostic(&self, path: &str, message: &dyn fmt::Display);
}

/// Writes findings to stdout and diagnostics to stderr, or both to one log file.
pub struct ConsoleReport {
    format: OutputFormat,
    log_file: Option<Mutex<File>>,
    write_failed: AtomicBool,
}

impl ConsoleReport {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            log_file: None,
            write_failed: AtomicBool::new(false),
        }
    }

    pub fn with_log_file(format: OutputFormat, file: File) -> Self {
        Self {
            format,
            log_file: Some(Mutex::new(file)),
            write_failed: AtomicBool::new(false),
        }
    }

    /// Whether any line could not be written.
    pub fn write_failed(&self) -> bool {
        self.write_failed.load(Ordering::Relaxed)
    }

    fn render<T: Serialize + fmt::Display>(&self, value: &T) -> String {
        match self.format {
            OutputFormat::Text => format!("{value}\n"),
            OutputFormat::Json => match serde_json::to_string(value) {
                Ok(json) => format!("{json}\n"),
                Err(_) => format!("{value}\n"),
            },
        }
    }

    fn write_line(&self, line: &str, to_stderr: bool) {
        // One write per line, under a lock, so lines from different tasks never mix.
        let written = match &self.log_file {
            Some(file) => match file.lock() {
                Ok(mut f) => f.write_all(line.as_bytes()),
                Err(poisoned) => poisoned.into_inner().write_all(line.as_bytes()),
            },
            None if to_stderr => io::stderr().lock().write_all(line.as_bytes()),
            None => io::stdout().lock().write_all(line.as_bytes()),
        };
        if let Err(e) = written {
            if !self.write_failed.swap(true, Ordering::Relaxed) {
                log::error!("can't write scan output, further lines may be lost: {e}");
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl Report for ConsoleReport {
    fn finding(&self, hit: &Hit) {
        let line = self.render(hit);
        self.write_line(&line, false);
    }

    fn diagnostic(&self, path: &str, message: &dyn fmt::Display) {
        let line = self.render(&Diagnostic {
            path: path.to_string(),
            message: message.to_string(),
        });
        self.write_line(&line, true);
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryReport {
    hits: Mutex<Vec<Hit>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl Report for MemoryReport {
    fn finding(&self, hit: &Hit) {
        if let Ok(mut hits) = self.hits.lock() {
            hits.push(hit.clone());
        }
    }

    fn diagnostic(&self, path: &str, message: &dyn fmt::Display) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(Diagnostic {
                path: path.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vuln::Vulnerabilities;

    fn sample_hit() -> Hit {
        Hit {
            archive: "app.war::WEB-INF/lib/log4j-core-2.14.1.jar".to_string(),
            member: "org/apache/logging/log4j/core/net/JndiManager.class".to_string(),
            finding: Finding {
                version: "log4j 2.14.0-2.14.1".to_string(),
                filename: "JndiManager.class".to_string(),
                vulns: Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046,
            },
        }
    }

    #[test]
    fn hit_renders_as_single_text_line() {
        assert_eq!(
            sample_hit().to_string(),
            "indicator for vulnerable component found in app.war::WEB-INF/lib/log4j-core-2.14.1.jar \
             (org/apache/logging/log4j/core/net/JndiManager.class): JndiManager.class \
             log4j 2.14.0-2.14.1 CVE-2021-44228, CVE-2021-45046"
        );
    }

    #[test]
    fn hit_location_joins_archive_and_member() {
        assert_eq!(
            sample_hit().location(),
            "app.war::WEB-INF/lib/log4j-core-2.14.1.jar::org/apache/logging/log4j/core/net/JndiManager.class"
        );
    }

    #[test]
    fn json_rendering_flattens_finding() {
        let report = ConsoleReport::new(OutputFormat::Json);
        let line = report.render(&sample_hit());
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["filename"], "JndiManager.class");
        assert_eq!(value["vulns"][0], "CVE-2021-44228");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn log_file_receives_findings_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.log");
        let report = ConsoleReport::with_log_file(
            OutputFormat::Text,
            File::create(&path).unwrap(),
        );
        report.finding(&sample_hit());
        report.diagnostic("broken.jar", &"invalid Zip archive: Could not find central directory end");
        drop(report);

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("indicator for vulnerable component found in app.war"));
        assert_eq!(
            lines[1],
            "broken.jar: invalid Zip archive: Could not find central directory end"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_log_writes_are_flagged() {
        let full = File::options().write(true).open("/dev/full").unwrap();
        let report = ConsoleReport::with_log_file(OutputFormat::Text, full);
        assert!(!report.write_failed());

        report.finding(&sample_hit());
        report.finding(&sample_hit());
        assert!(report.write_failed());
    }

    #[test]
    fn memory_report_collects_from_many_threads() {
        let report = MemoryReport::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        report.finding(&sample_hit());
                    }
                });
            }
        });
        assert_eq!(report.hits().len(), 800);
    }
}
