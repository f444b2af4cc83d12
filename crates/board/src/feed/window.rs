use std::num::NonZeroU64;
use std::ops::Range;

/// Default number of most recent messages shown.
pub const DEFAULT_PAGE_SIZE: NonZeroU64 = NonZeroU64::new(50).unwrap();
/// Default page-size growth per "load more".
pub const DEFAULT_PAGE_INCREMENT: NonZeroU64 = NonZeroU64::new(50).unwrap();

/// Visible suffix of the message sequence.
///
/// Always satisfies `start + length == total_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedWindow {
    pub start: u64,
    pub length: u64,
}

impl FeedWindow {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn indices(&self) -> Range<u64> {
        self.start..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Derives the window showing the latest `min(page_size, count)` messages.
pub fn derive_window(count: u64, page_size: NonZeroU64) -> FeedWindow {
    let start = count.saturating_sub(page_size.get());
    FeedWindow {
        start,
        length: count - start,
    }
}

/// Page size after one "load more", or `None` when everything is visible.
///
/// Growth is clamped to `count`, so the result is always larger than
/// `page_size` and never beyond what exists.
pub fn grow_page_size(
    page_size: NonZeroU64,
    increment: NonZeroU64,
    count: u64,
) -> Option<NonZeroU64> {
    if page_size.get() >= count {
        return None;
    }
    let grown = page_size.saturating_add(increment.get()).get().min(count);
    NonZeroU64::new(grown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(raw: u64) -> NonZeroU64 {
        NonZeroU64::new(raw).unwrap()
    }

    #[test]
    fn window_covers_latest_messages_for_every_shape() {
        for count in 0..=130 {
            for page_size in [1, 2, 49, 50, 51, 100, 500] {
                let window = derive_window(count, page(page_size));
                assert_eq!(window.start, count.saturating_sub(page_size));
                assert_eq!(window.length, count - window.start);
                assert_eq!(window.start + window.length, count);
                assert!(window.length <= page_size);
            }
        }
    }

    #[test]
    fn empty_board_has_empty_window() {
        let window = derive_window(0, DEFAULT_PAGE_SIZE);
        assert!(window.is_empty());
        assert_eq!(window.indices(), 0..0);
    }

    #[test]
    fn load_more_extends_backwards_from_latest() {
        let window = derive_window(120, page(50));
        assert_eq!(window.indices(), 70..120);

        let grown = grow_page_size(page(50), DEFAULT_PAGE_INCREMENT, 120).unwrap();
        assert_eq!(grown.get(), 100);
        let window = derive_window(120, grown);
        assert_eq!(window.indices(), 20..120);
        assert_eq!(window.length, 100);

        let grown = grow_page_size(grown, DEFAULT_PAGE_INCREMENT, 120).unwrap();
        assert_eq!(grown.get(), 120);
        assert_eq!(grow_page_size(grown, DEFAULT_PAGE_INCREMENT, 120), None);
    }

    #[test]
    fn growing_page_size_never_moves_window_end() {
        let count = 333;
        let mut page_size = page(1);
        let mut previous = derive_window(count, page_size);
        while let Some(next) = grow_page_size(page_size, page(7), count) {
            assert!(next > page_size);
            let window = derive_window(count, next);
            assert_eq!(window.end(), previous.end());
            assert!(window.start <= previous.start);
            previous = window;
            page_size = next;
        }
        assert_eq!(previous.indices(), 0..count);
    }
}
