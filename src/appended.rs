//! Locating a zip container that starts somewhere inside a larger file.
//!
//! Self-extracting stubs, signature blobs and other junk in front of a zip
//! archive confuse parsers that only trust the end-of-central-directory
//! record. The locator scans forward for local-file-header signatures and
//! returns the first offset at which a zip container actually parses.

use log::{debug, trace};
use memchr::memmem;
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;

use crate::error::LocateError;
use crate::mapped::MappedFile;

const WINDOW: usize = 4096;
const SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// A zip archive found at `offset` bytes into its source.
pub struct LocatedZip<R> {
    pub offset: u64,
    pub archive: ZipArchive<Window<R>>,
}

/// A `[start, start + len)` slice of a seekable source, presented as a stream of its own.
#[derive(Debug, Clone)]
pub struct Window<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R> Window<R> {
    pub fn new(inner: R, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            pos: 0,
        }
    }
}

impl<R: Read + Seek> Read for Window<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len {
            return Ok(0);
        }
        let max = (self.len - self.pos).min(buf.len() as u64) as usize;
        self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
        let n = self.inner.read(&mut buf[..max])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for Window<R> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let next = match target {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let next = next.ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "seek before start of window")
        })?;
        self.pos = next;
        Ok(next)
    }
}

/// Find the first parseable zip container in `source`, searching forward from offset 0.
///
/// Candidate offsets that fail to parse are skipped. Exhausting the source
/// yields `LocateError::NotFound`; a failed window read aborts the search.
pub fn locate<R: Read + Seek + Clone>(source: R, size: u64) -> Result<LocatedZip<R>, LocateError> {
    let mut scanner = source.clone();
    let mut buf = vec![0u8; WINDOW + SIGNATURE.len()];
    let mut base = 0u64;

    while base < size {
        scanner.seek(SeekFrom::Start(base))?;
        let wanted = (size - base).min(buf.len() as u64) as usize;
        let filled = fill(&mut scanner, &mut buf[..wanted])?;
        if filled == 0 {
            break;
        }

        // A signature starting in the overlap is picked up by the next window.
        for rel in memmem::find_iter(&buf[..filled], SIGNATURE).take_while(|&rel| rel < WINDOW) {
            let offset = base + rel as u64;
            let window = Window::new(source.clone(), offset, size - offset);
            match ZipArchive::new(window) {
                Ok(archive) => {
                    debug!("zip container found at offset {offset}");
                    return Ok(LocatedZip { offset, archive });
                }
                Err(e) => trace!("no zip container at offset {offset}: {e}"),
            }
        }

        base += WINDOW as u64;
    }

    Err(LocateError::NotFound)
}

/// Map `path` and locate the zip container inside it.
pub fn open_file(path: &Path) -> Result<LocatedZip<Cursor<MappedFile>>, LocateError> {
    let mapped = MappedFile::open(path).map_err(|e| io::Error::other(format!("{e:#}")))?;
    let size = mapped.len();
    locate(Cursor::new(mapped), size)
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn names<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    fn junk(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8 ^ 0x5a).collect()
    }

    fn locate_bytes(data: &[u8]) -> Result<LocatedZip<Cursor<&[u8]>>, LocateError> {
        locate(Cursor::new(data), data.len() as u64)
    }

    #[test]
    fn regular_zip_is_found_at_offset_zero() {
        let zip = build_zip(&[("a.txt", b"alpha"), ("dir/b.class", b"beta")]);
        let located = locate_bytes(&zip).unwrap();
        assert_eq!(located.offset, 0);
        assert_eq!(names(&located.archive), vec!["a.txt", "dir/b.class"]);
    }

    #[test]
    fn prepended_junk_of_various_lengths_is_skipped() {
        let zip = build_zip(&[("x/Y.class", b"payload"), ("z.txt", b"zed")]);
        let expected = names(&ZipArchive::new(Cursor::new(&zip[..])).unwrap());

        for prefix in [1usize, 512, 4093, 4094, 4095, 4096, 8190, 8192, 10_000] {
            let mut data = junk(prefix);
            data.extend_from_slice(&zip);
            let mut located = locate_bytes(&data).unwrap();
            assert_eq!(names(&located.archive), expected, "prefix {prefix}");

            let mut content = String::new();
            located
                .archive
                .by_name("z.txt")
                .unwrap()
                .read_to_string(&mut content)
                .unwrap();
            assert_eq!(content, "zed");
        }
    }

    #[test]
    fn spurious_signature_before_real_zip_is_tolerated() {
        let zip = build_zip(&[("real.class", b"real")]);
        let mut data = junk(100);
        data.extend_from_slice(b"PK\x03\x04 this is not a local file header");
        data.extend_from_slice(&junk(5000));
        data.extend_from_slice(&zip);

        let located = locate_bytes(&data).unwrap();
        assert_eq!(names(&located.archive), vec!["real.class"]);
    }

    #[test]
    fn input_without_signature_is_not_found() {
        assert!(matches!(locate_bytes(&junk(20_000)), Err(LocateError::NotFound)));
        assert!(matches!(locate_bytes(&[]), Err(LocateError::NotFound)));
        assert!(matches!(locate_bytes(b"PK\x03"), Err(LocateError::NotFound)));
    }

    #[test]
    fn signature_without_zip_structure_is_not_found() {
        let mut data = junk(3000);
        data.extend_from_slice(b"PK\x03\x04");
        data.extend_from_slice(&junk(3000));
        assert!(matches!(locate_bytes(&data), Err(LocateError::NotFound)));
    }

    /// A source whose bytes past `bad_from` can't be read.
    #[derive(Clone)]
    struct BadSector {
        inner: Cursor<Vec<u8>>,
        bad_from: u64,
    }

    impl Read for BadSector {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.bad_from {
                return Err(io::Error::other("bad sector"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for BadSector {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn read_failure_aborts_the_search() {
        let source = BadSector {
            inner: Cursor::new(vec![0u8; 10_000]),
            bad_from: WINDOW as u64,
        };
        let result = locate(source, 10_000);
        match result {
            Err(LocateError::Io(e)) => assert_eq!(e.to_string(), "bad sector"),
            Err(LocateError::NotFound) => panic!("read failure collapsed into NotFound"),
            Ok(located) => panic!("unexpected zip at offset {}", located.offset),
        }
    }

    #[test]
    fn window_bounds_reads_and_seeks() {
        let data = b"0123456789";
        let mut window = Window::new(Cursor::new(&data[..]), 3, 4);
        let mut out = String::new();
        window.read_to_string(&mut out).unwrap();
        assert_eq!(out, "3456");

        assert_eq!(window.seek(SeekFrom::End(-1)).unwrap(), 3);
        let mut one = [0u8; 8];
        assert_eq!(window.read(&mut one).unwrap(), 1);
        assert_eq!(one[0], b'6');
        assert!(window.seek(SeekFrom::Current(-10)).is_err());
    }

    #[test]
    fn open_file_finds_appended_zip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.bin");
        let mut data = junk(777);
        data.extend_from_slice(&build_zip(&[("lib/app.jar", b"jar")]));
        std::fs::write(&path, &data).unwrap();

        let located = open_file(&path).unwrap();
        assert_eq!(names(&located.archive), vec!["lib/app.jar"]);
    }
}
