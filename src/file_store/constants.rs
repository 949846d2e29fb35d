// File header: a little-endian u32 `used` counter plus 4 reserved bytes,
// so the first entry starts 8-byte aligned.
pub const HEADER_SIZE: usize = 8;

// Smallest `used` a readable file can publish (the header alone).
pub const MINIMUM_SIZE: usize = 8;

// Entries are laid out on 8-byte boundaries. Each entry is
// `len(u32le) | key | pad | value(f64le)` where the pad is 1..=8 zero
// bytes, chosen so the value slot occupies the final aligned 8 bytes.
pub const ENTRY_ALIGNMENT: usize = 8;
pub const KEY_LEN_SIZE: usize = 4;
pub const VALUE_SIZE: usize = 8;

// Used when `sysconf(_SC_PAGESIZE)` is unavailable or fails.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

pub const DB_EXTENSION: &str = "db";
