use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::vuln::Vulnerabilities;

#[derive(Debug, Clone, Parser)]
#[command(name = "jar-sentry")]
#[command(about = "A simple local log4j vulnerability scanner")]
pub struct Cli {
    /// Paths to scan
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Paths to exclude (can be used multiple times)
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Log every archive file considered
    #[arg(short, long)]
    pub verbose: bool,

    /// No output unless vulnerable
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Ignore log4j 1.x versions
    #[arg(long)]
    pub ignore_v1: bool,

    /// Comma-separated CVE identifiers to check for, or `default` / `all`
    #[arg(long, value_name = "LIST", default_value = "default")]
    pub vulns: Vulnerabilities,

    /// Descend into network filesystems (NFS, SMB, ...)
    #[arg(long)]
    pub scan_network: bool,

    /// Log file to write output to
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_excludes_and_vuln_list() {
        let cli = Cli::parse_from([
            "jar-sentry",
            "--exclude",
            "/proc",
            "--exclude",
            "/srv/cache",
            "--vulns",
            "CVE-2021-44228,CVE-2021-45046",
            "/opt",
            "/srv",
        ]);
        assert_eq!(cli.paths, vec![PathBuf::from("/opt"), PathBuf::from("/srv")]);
        assert_eq!(cli.exclude.len(), 2);
        assert_eq!(
            cli.vulns,
            Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046
        );
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn defaults_to_default_vulnerability_set() {
        let cli = Cli::parse_from(["jar-sentry", "."]);
        assert_eq!(cli.vulns, Vulnerabilities::DEFAULT);
        assert!(!cli.ignore_v1);
    }

    #[test]
    fn rejects_missing_paths_and_unknown_cves() {
        assert!(Cli::try_parse_from(["jar-sentry"]).is_err());
        assert!(Cli::try_parse_from(["jar-sentry", "--vulns", "CVE-0000-1", "."]).is_err());
        assert!(Cli::try_parse_from(["jar-sentry", "--quiet", "--verbose", "."]).is_err());
    }
}
