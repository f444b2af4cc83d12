/// Raw tuple decoding into display records.
pub mod entry;
/// Stateful loader tracking the count and the last window read.
pub mod loader;
/// Pure window arithmetic over the append-only message sequence.
pub mod window;

pub use entry::{FeedEntry, map_messages, sender_label};
pub use loader::{FeedLoader, FeedOptions, FeedView};
pub use window::{
    DEFAULT_PAGE_INCREMENT, DEFAULT_PAGE_SIZE, FeedWindow, derive_window, grow_page_size,
};
