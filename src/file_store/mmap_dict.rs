use crate::error::Result;
use crate::file_store::entry_parser::ParseMode;
use crate::file_store::key_hasher::Xxh3BuildHasher;
use crate::file_store::mmap_file::MmapedFile;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// In-memory `key → value-slot-offset` index over one [`MmapedFile`].
///
/// Built by a single lenient scan at open time. Offsets recorded here
/// stay valid for the life of the file: entries never move, even across
/// growth, so a rewrite of a known key is a single in-place 8-byte store.
///
/// Single-writer-per-file is assumed (enforced by the path allocator's
/// advisory lock). Scrapers never consult this index; they read the file
/// through their own snapshot.
pub struct MmapedDict {
    file: MmapedFile,
    index: HashMap<Vec<u8>, usize, Xxh3BuildHasher>,
}

impl MmapedDict {
    pub fn open(path: &Path, initial_size: usize) -> Result<Self> {
        let file = MmapedFile::open(path, initial_size)?;

        let mut index = HashMap::with_hasher(Xxh3BuildHasher);
        for entry in file.entries(ParseMode::Lenient).flatten() {
            index.insert(entry.key.to_vec(), entry.value_offset);
        }

        debug!(
            "opened dict {} with {} entries ({} of {} bytes used)",
            path.display(),
            index.len(),
            file.used(),
            file.size()
        );

        Ok(Self { file, index })
    }

    /// Returns the current value for `key`, or `0.0` when the key has
    /// never been written. Absent keys are not an error.
    pub fn read_value(&self, key: &[u8]) -> Result<f64> {
        self.file.check_backing_file()?;
        Ok(match self.index.get(key) {
            Some(&offset) => self.file.load_value(offset),
            None => 0.0,
        })
    }

    /// Writes `value` for `key`: in place when the key is known, otherwise
    /// by appending a fresh entry. Two writes of the same key always share
    /// one entry.
    pub fn write_value(&mut self, key: &[u8], value: f64) -> Result<()> {
        if let Some(&offset) = self.index.get(key) {
            self.file.overwrite_value(offset, value)?;
        } else {
            let offset = self.file.append_entry(key, value)?;
            self.index.insert(key.to_vec(), offset);
        }
        Ok(())
    }

    /// Number of distinct keys in the file.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn sync(&self) {
        self.file.sync();
    }
}
