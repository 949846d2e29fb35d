use crate::file_store::constants::FALLBACK_PAGE_SIZE;
use std::sync::OnceLock;

/// Resolves the OS page size, caching the result for the process lifetime.
///
/// Dict files are always sized in whole pages so that growth keeps the
/// mapping page-aligned. Falls back to 4096 when the platform cannot
/// report a page size.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

    *PAGE_SIZE.get_or_init(|| {
        #[cfg(unix)]
        {
            let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            if raw > 0 {
                return raw as usize;
            }
        }
        FALLBACK_PAGE_SIZE
    })
}

/// Rounds `len` up to the next multiple of the OS page size.
pub fn round_up_to_page(len: usize) -> usize {
    let page = page_size();
    len.div_ceil(page) * page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_sane_power_of_two() {
        let page = page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }

    #[test]
    fn rounding_is_monotone_and_aligned() {
        let page = page_size();
        assert_eq!(round_up_to_page(1), page);
        assert_eq!(round_up_to_page(page), page);
        assert_eq!(round_up_to_page(page + 1), 2 * page);
    }
}
