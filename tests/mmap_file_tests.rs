#[cfg(test)]
mod tests {

    use multiproc_metrics::file_store::{
        MmapedDict, MmapedFile, ParseMode, round_up_to_page,
    };
    use multiproc_metrics::StoreError;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const INITIAL_SIZE: usize = 4096;

    fn dict_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("counter_1234-0.db")
    }

    #[test]
    fn fresh_file_is_zeroed_and_page_sized() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let file = MmapedFile::open(&path, INITIAL_SIZE).expect("Failed to open dict file");
        assert_eq!(file.size(), round_up_to_page(INITIAL_SIZE));
        drop(file);

        let bytes = std::fs::read(&path).expect("Failed to read file back");
        assert_eq!(bytes.len(), round_up_to_page(INITIAL_SIZE));
        // Header unpublished, body reserved: everything must be zero.
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn single_write_produces_exact_bytes() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        dict.write_value(b"foo", 100.0).expect("Failed to write");
        drop(dict);

        let bytes = std::fs::read(&path).expect("Failed to read file back");

        // used = header + one 16-byte entry
        assert_eq!(&bytes[0..4], &24u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        // key length, key, single pad byte
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..15], b"foo");
        assert_eq!(bytes[15], 0);
        // IEEE-754 little-endian 100.0
        assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0, 0, 0x59, 0x40]);
    }

    #[test]
    fn overwrite_updates_in_place_and_appends_nothing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        dict.write_value(b"foo", 100.0).expect("Failed to write");
        dict.write_value(b"bar", 500.0).expect("Failed to write");
        dict.write_value(b"foo", 200.0).expect("Failed to write");
        assert_eq!(dict.len(), 2);
        drop(dict);

        let bytes = std::fs::read(&path).expect("Failed to read file back");
        assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
        // foo's slot holds 200.0 now; bar follows at offset 24.
        assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0, 0, 0x69, 0x40]);
        assert_eq!(&bytes[28..31], b"bar");

        let file = MmapedFile::open(&path, INITIAL_SIZE).expect("Failed to reopen");
        let entries: Vec<_> = file
            .entries(ParseMode::Lenient)
            .map(|e| e.expect("parse error"))
            .map(|e| (e.key.to_vec(), e.value, e.value_offset))
            .collect();
        assert_eq!(
            entries,
            vec![
                (b"foo".to_vec(), 200.0, 16),
                (b"bar".to_vec(), 500.0, 32),
            ]
        );
    }

    #[test]
    fn write_until_growth_keeps_every_entry() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");

        // 128 entries of 32 bytes each: header + entries = 4104 bytes,
        // one past the initial 4096 when the page size is 4 KiB.
        for i in 0..128u64 {
            let key = format!("{}", 1_000_000_000_000u64 + i);
            assert_eq!(key.len(), 13);
            dict.write_value(key.as_bytes(), i as f64)
                .expect("Failed to write");
        }
        assert_eq!(dict.len(), 128);
        drop(dict);

        let reopened = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to reopen");
        assert_eq!(reopened.len(), 128);
        for i in 0..128u64 {
            let key = format!("{}", 1_000_000_000_000u64 + i);
            assert_eq!(
                reopened.read_value(key.as_bytes()).expect("read failed"),
                i as f64
            );
        }

        let bytes = std::fs::read(&path).expect("Failed to read file back");
        assert_eq!(&bytes[0..4], &4104u32.to_le_bytes());
        assert!(bytes.len() >= 4104);
        assert_eq!(bytes.len() % round_up_to_page(1), 0);
        if round_up_to_page(1) == 4096 {
            // Doubled exactly once.
            assert_eq!(bytes.len(), 8192);
        }
    }

    #[test]
    fn value_offsets_survive_growth() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        dict.write_value(b"pinned", 1.0).expect("Failed to write");

        let offset_before = {
            let file = MmapedFile::open(&path, INITIAL_SIZE).expect("Failed to open");
            file.entries(ParseMode::Lenient)
                .map(|e| e.expect("parse error"))
                .find(|e| e.key == b"pinned")
                .expect("entry missing")
                .value_offset
        };

        // Force several rounds of doubling.
        let filler = vec![b'x'; 512];
        for i in 0..64 {
            let mut key = filler.clone();
            key.extend_from_slice(format!("-{i}").as_bytes());
            dict.write_value(&key, i as f64).expect("Failed to write");
        }

        dict.write_value(b"pinned", 2.0).expect("Failed to write");
        assert_eq!(dict.read_value(b"pinned").expect("read failed"), 2.0);
        drop(dict);

        let file = MmapedFile::open(&path, INITIAL_SIZE).expect("Failed to reopen");
        let pinned: Vec<_> = file
            .entries(ParseMode::Lenient)
            .map(|e| e.expect("parse error"))
            .filter(|e| e.key == b"pinned")
            .collect();
        // Still exactly one entry, at its original slot.
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].value_offset, offset_before);
        assert_eq!(pinned[0].value, 2.0);
    }

    #[test]
    fn every_value_offset_is_aligned_and_inside_used() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        for len in 1..40 {
            let key = vec![b'k'; len];
            dict.write_value(&key, len as f64).expect("Failed to write");
        }
        drop(dict);

        let bytes = std::fs::read(&path).expect("Failed to read file back");
        let used = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert!(used >= 8);
        assert!(used <= bytes.len());

        let file = MmapedFile::open(&path, INITIAL_SIZE).expect("Failed to reopen");
        let mut count = 0;
        for entry in file.entries(ParseMode::Lenient) {
            let entry = entry.expect("parse error");
            assert_eq!(entry.value_offset % 8, 0);
            assert!(entry.value_offset + 8 <= used);
            count += 1;
        }
        assert_eq!(count, 39);
    }

    #[test]
    fn absent_keys_read_as_zero() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        assert_eq!(dict.read_value(b"never written").expect("read failed"), 0.0);
    }

    #[test]
    fn unlinked_file_surfaces_recoverable_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        dict.write_value(b"foo", 1.0).expect("Failed to write");

        std::fs::remove_file(&path).expect("Failed to unlink");

        let err = dict.write_value(b"foo", 2.0).unwrap_err();
        assert!(matches!(err, StoreError::FileVanished { .. }));
        let err = dict.read_value(b"foo").unwrap_err();
        assert!(matches!(err, StoreError::FileVanished { .. }));
    }

    #[test]
    fn externally_truncated_file_surfaces_recoverable_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        dict.write_value(b"foo", 1.0).expect("Failed to write");

        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("Failed to reopen for truncation");
        file.set_len(8).expect("Failed to truncate");

        let err = dict.write_value(b"bar", 2.0).unwrap_err();
        assert!(matches!(err, StoreError::FileVanished { .. }));
    }

    #[test]
    fn truncated_tail_parses_to_largest_valid_prefix() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dict_path(&dir);

        let mut dict = MmapedDict::open(&path, INITIAL_SIZE).expect("Failed to open dict");
        for i in 0..10 {
            dict.write_value(format!("key-{i}").as_bytes(), i as f64)
                .expect("Failed to write");
        }
        drop(dict);

        let full = std::fs::read(&path).expect("Failed to read file back");
        let used = u32::from_le_bytes([full[0], full[1], full[2], full[3]]) as usize;

        // Every truncation point inside the entry region yields a clean
        // prefix, never an error or garbage entry.
        for cut in (8..=used).rev() {
            let truncated = &full[..cut];
            let parsed = multiproc_metrics::EntryParser::lenient(truncated)
                .filter(|e| e.is_ok())
                .count();
            assert!(parsed <= 10);
        }
    }
}
