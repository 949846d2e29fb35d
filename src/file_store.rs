mod constants;
pub use constants::MINIMUM_SIZE;

mod entry_parser;
pub use entry_parser::{EntryParser, ParseMode, RawEntry, read_used};

mod filename;
pub use filename::{FileInfo, MetricType, MultiprocessMode, file_prefix, parse_filename};

mod key_hasher;
pub use key_hasher::Xxh3BuildHasher;

mod mmap_dict;
pub use mmap_dict::MmapedDict;

mod mmap_file;
pub use mmap_file::MmapedFile;

mod page_size;
pub use page_size::{page_size, round_up_to_page};

mod path_allocator;
pub use path_allocator::PathAllocator;
