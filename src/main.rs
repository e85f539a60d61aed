use anyhow::Result;
use clap::Parser;
use jar_sentry::cli::Cli;
use jar_sentry::config::{resolve_context, resolve_report};
use jar_sentry::scan::{ScanSummary, scan};
use log::LevelFilter;
use std::process::ExitCode;

/// Exit status when at least one vulnerable component was reported.
const EXIT_FINDINGS: u8 = 3;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let report = resolve_report(&cli)?;
    let ctx = resolve_context(&cli);
    log::debug!("checking for {}", ctx.vulns);

    if !cli.quiet {
        eprintln!("jar-sentry - a simple local log4j vulnerability scanner\n");
    }

    let summary = scan(&cli.paths, &ctx, &report);

    if !cli.quiet {
        eprintln!("\n{}", summary_line(&summary));
    }

    Ok(exit_status(&summary))
}

fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(log_level(cli))
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

fn summary_line(summary: &ScanSummary) -> String {
    format!(
        "Scan finished: {} archives inspected, {} findings, {} diagnostics",
        summary.archives, summary.findings, summary.diagnostics
    )
}

fn exit_status(summary: &ScanSummary) -> ExitCode {
    if summary.findings > 0 {
        ExitCode::from(EXIT_FINDINGS)
    } else {
        ExitCode::SUCCESS
    }
}
