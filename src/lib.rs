//! # jar-sentry
//!
//! A local scanner for vulnerable log4j components inside Java archives.
//!
//! ## Architecture
//!
//! - **vuln**: CVE flags and their textual form
//! - **hashes**: SHA-256 digests of known vulnerable class files
//! - **classify**: Digest lookup and heuristic rules for one class file
//! - **sniff**: Cheap class-file detection before reading a member in full
//! - **appended**: Locating a zip container behind a non-zip prefix
//! - **archive**: Recursive inspection of zip-family and tar.gz archives
//! - **scan**: Filesystem walk and concurrent dispatch of archive inspections
//! - **mounts**: Pseudo and network filesystem detection for pruning the walk
//! - **report**: Findings and diagnostics output
//! - **config**: Scan settings resolved from the command line

pub mod appended;
pub mod archive;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod hashes;
pub mod mapped;
pub mod mounts;
pub mod report;
pub mod scan;
pub mod sniff;
pub mod vuln;
