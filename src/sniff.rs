use std::io::{self, ErrorKind, Read};

use crate::classify::{CLASS_MAGIC, Finding, classify};
use crate::hashes::KnownHashes;
use crate::vuln::Vulnerabilities;

/// Read a member far enough to tell whether it is a class file, and classify it if so.
///
/// Only the first four bytes are read from anything that is not a class
/// file. A member shorter than the magic number is not an error.
pub fn sniff<R: Read>(
    mut reader: R,
    filename: &str,
    interested: Vulnerabilities,
    hashes: &dyn KnownHashes,
) -> io::Result<Option<Finding>> {
    let mut magic = [0u8; 4];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    if magic != CLASS_MAGIC {
        return Ok(None);
    }

    let mut buf = magic.to_vec();
    reader.read_to_end(&mut buf)?;
    Ok(classify(&buf, filename, interested, hashes))
}
