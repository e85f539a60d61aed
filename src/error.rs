//! Typed errors surfaced by the library.
//!
//! Per-archive and per-member failures are never returned through these
//! types; they are reported as diagnostics and the scan carries on.

use std::io;
use thiserror::Error;

/// Failure of the appended-zip search.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No offset in the source starts a parseable zip container.
    #[error("no zip file found")]
    NotFound,

    /// Reading a search window failed before the source was exhausted.
    #[error("I/O error while searching for zip signature: {0}")]
    Io(#[from] io::Error),
}

/// Failure to parse a vulnerability list such as `CVE-2021-44228,CVE-2021-45046`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseVulnError {
    #[error("invalid vulnerability '{0}'")]
    InvalidVulnerability(String),
}
