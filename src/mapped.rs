use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// A read-only memory map of a whole file that can be shared cheaply between readers.
#[derive(Debug, Clone)]
pub struct MappedFile {
    map: Arc<Mmap>,
}

impl MappedFile {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("can't open {}", path.display()))?;
        let size = file
            .seek(SeekFrom::End(0))
            .with_context(|| format!("can't seek in {}", path.display()))?;
        // SAFETY: The file is opened read-only and stays mapped for as long as any
        // clone of this handle exists. Concurrent truncation by another process is
        // outside what a scanner can guard against.
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("can't map {}", path.display()))?;
        debug_assert_eq!(map.len() as u64, size);
        Ok(Self { map: Arc::new(map) })
    }

    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl AsRef<[u8]> for MappedFile {
    fn as_ref(&self) -> &[u8] {
        &self.map
    }
}
