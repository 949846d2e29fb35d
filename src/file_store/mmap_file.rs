use crate::error::{Result, StoreError};
use crate::file_store::constants::*;
use crate::file_store::entry_parser::{EntryParser, ParseMode, read_used};
use crate::file_store::page_size::round_up_to_page;
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

/// One writer-owned, memory-mapped dict file.
///
/// Presents a `(key → f64)` dictionary on top of the raw mapping. The
/// process that holds the advisory lock on the path is the only writer;
/// any number of scrapers may read the same file concurrently through
/// their own read-only views.
///
/// The cross-process contract is write-then-publish: entry bytes are laid
/// down first and the header's `used` counter is stored last, so a reader
/// observing `used = U` may scan up to `U` without ever seeing a torn
/// entry. Value slots are 8-byte aligned and updated with single aligned
/// stores, so an overwritten `f64` is observed atomically as well.
///
/// Growth only ever extends the file (doubling, page-aligned) and entry
/// offsets never move, which keeps stale read-only mappings valid for
/// every entry they could previously see.
pub struct MmapedFile {
    file: File,
    mmap: MmapMut,
    path: PathBuf,
    /// Mapped length. Always a page multiple and at least `MINIMUM_SIZE`.
    size: usize,
    /// Header plus all published entries, cached because this process is
    /// the file's only writer. Mirrors the little-endian u32 at offset 0.
    used: usize,
}

impl MmapedFile {
    /// Opens (creating if necessary) the dict file at `path` and maps it
    /// read/write, shared.
    ///
    /// A missing or sub-minimum file is extended to `initial_size` rounded
    /// up to a whole page; an existing file keeps its contents and is
    /// rounded up to the next page multiple. The header of a brand-new
    /// file stays zeroed until the first append publishes a real `used`.
    pub fn open(path: &Path, initial_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let disk_len = file.metadata()?.len() as usize;
        let size = if disk_len < MINIMUM_SIZE {
            round_up_to_page(initial_size.max(MINIMUM_SIZE))
        } else {
            round_up_to_page(disk_len)
        };
        if size != disk_len {
            file.set_len(size as u64)?;
        }

        // Safety: the mapping is backed by a file this process holds an
        // exclusive advisory lock on; other processes only ever extend it.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let mut used = read_used(&mmap).max(MINIMUM_SIZE);
        if used > size {
            warn!(
                "dict file {} claims used={} beyond size={}; clamping",
                path.display(),
                used,
                size
            );
            used = size;
        }
        if used % ENTRY_ALIGNMENT != 0 {
            warn!(
                "dict file {} has unaligned used={}; rounding up",
                path.display(),
                used
            );
            used = used.next_multiple_of(ENTRY_ALIGNMENT).min(size);
        }

        Ok(Self {
            file,
            mmap,
            path: path.to_path_buf(),
            size,
            used,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current mapped length in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes occupied by the header plus all published entries.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Appends a new entry and returns the absolute offset of its value
    /// slot. The caller (the dict index) is responsible for key
    /// uniqueness; rewrites of an existing key go through
    /// [`Self::overwrite_value`] instead.
    pub fn append_entry(&mut self, key: &[u8], value: f64) -> Result<usize> {
        self.check_backing_file()?;

        let entry_len = KEY_LEN_SIZE + key.len();
        // pad is 1..=8 so the value lands entirely in the next aligned
        // 8-byte slot.
        let pad = ENTRY_ALIGNMENT - entry_len % ENTRY_ALIGNMENT;
        let total = entry_len + pad + VALUE_SIZE;

        if self.used + total > self.size {
            self.grow(self.used + total)?;
        }

        let base = self.used;
        let buf = &mut self.mmap[..];
        buf[base..base + KEY_LEN_SIZE].copy_from_slice(&(key.len() as u32).to_le_bytes());
        buf[base + KEY_LEN_SIZE..base + entry_len].copy_from_slice(key);
        buf[base + entry_len..base + entry_len + pad].fill(0);

        let value_offset = base + entry_len + pad;
        self.store_value(value_offset, value);

        // Publish last: a reader that sees the new `used` is guaranteed to
        // see complete entry bytes below it.
        self.used += total;
        self.publish_used();

        Ok(value_offset)
    }

    /// Overwrites the value slot of a previously appended entry in place.
    /// `used` does not change and no bytes other than the 8-byte slot are
    /// touched.
    pub fn overwrite_value(&mut self, value_offset: usize, value: f64) -> Result<()> {
        self.check_backing_file()?;
        self.store_value(value_offset, value);
        Ok(())
    }

    /// Loads the value at a previously recorded slot offset.
    pub fn load_value(&self, value_offset: usize) -> f64 {
        debug_assert!(value_offset + VALUE_SIZE <= self.size);
        debug_assert_eq!(value_offset % ENTRY_ALIGNMENT, 0);
        // Safety: offset is 8-aligned and in bounds; aligned atomic loads
        // on mapped memory are sound.
        let slot = unsafe { &*(self.mmap.as_ptr().add(value_offset) as *const AtomicU64) };
        f64::from_bits(u64::from_le(slot.load(Ordering::Acquire)))
    }

    /// Lazily decodes all published entries. One-shot; borrows the mapping.
    pub fn entries(&self, mode: ParseMode) -> EntryParser<'_> {
        EntryParser::new(&self.mmap, mode)
    }

    /// Flushes the mapping to disk. Best-effort: failures are logged, not
    /// fatal, since the data stays reachable through the mapping itself.
    pub fn sync(&self) {
        if let Err(err) = self.mmap.flush() {
            warn!("failed to flush dict file {}: {}", self.path.display(), err);
        }
    }

    /// Detects a backing file that was unlinked, replaced, or truncated by
    /// another process (e.g. an external reset). Writes and reads must
    /// surface this as a recoverable error rather than fault on the stale
    /// mapping.
    pub fn check_backing_file(&self) -> Result<()> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if (meta.len() as usize) >= self.size => Ok(()),
            Ok(_) | Err(_) => Err(StoreError::FileVanished {
                path: self.path.clone(),
            }),
        }
    }

    /// Doubles the file until `required` bytes fit, then remaps. Entry
    /// offsets are unaffected; the file is only ever extended.
    fn grow(&mut self, required: usize) -> Result<()> {
        let mut new_size = self.size.max(MINIMUM_SIZE);
        while new_size < required {
            new_size *= 2;
        }
        let new_size = round_up_to_page(new_size);

        debug!(
            "growing dict file {} from {} to {} bytes",
            self.path.display(),
            self.size,
            new_size
        );

        self.file.set_len(new_size as u64)?;
        // Safety: same justification as in `open`; the old mapping is
        // dropped only after the new one is in place.
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        self.size = new_size;
        Ok(())
    }

    /// Stores an f64 into its slot with a single aligned 8-byte store, so
    /// concurrent scrapers never observe torn bytes.
    fn store_value(&mut self, value_offset: usize, value: f64) {
        debug_assert_eq!(value_offset % ENTRY_ALIGNMENT, 0);
        debug_assert!(value_offset + VALUE_SIZE <= self.size);
        // Safety: offset is 8-aligned and in bounds.
        let slot = unsafe { &*(self.mmap.as_mut_ptr().add(value_offset) as *const AtomicU64) };
        slot.store(value.to_bits().to_le(), Ordering::Release);
    }

    fn publish_used(&mut self) {
        // Safety: the mapping starts page-aligned, so offset 0 is u32-aligned.
        let header = unsafe { &*(self.mmap.as_mut_ptr() as *const AtomicU32) };
        header.store((self.used as u32).to_le(), Ordering::Release);
    }
}

impl Drop for MmapedFile {
    fn drop(&mut self) {
        // The mapping unmaps itself; make a final best-effort flush so an
        // exporter reading the file after this process exits sees the
        // latest values even on platforms with lazy writeback.
        self.sync();
    }
}
