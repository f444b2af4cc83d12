use std::num::NonZeroU64;
use std::sync::Arc;

use chainboard_gateway::{Address, ContractGateway, GatewayResult, RawMessage};

use super::entry::{FeedEntry, map_messages};
use super::window::{
    DEFAULT_PAGE_INCREMENT, DEFAULT_PAGE_SIZE, FeedWindow, derive_window, grow_page_size,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub page_size: NonZeroU64,
    pub page_increment: NonZeroU64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_increment: DEFAULT_PAGE_INCREMENT,
        }
    }
}

/// What the feed area should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView {
    Loading,
    Empty,
    Entries {
        entries: Vec<FeedEntry>,
        total_count: u64,
        can_load_more: bool,
    },
}

struct LoadedWindow {
    window: FeedWindow,
    reads: Vec<GatewayResult<RawMessage>>,
}

/// Reads the latest page of messages through a [`ContractGateway`].
///
/// The loader keeps only the last count and the raw reads of the last
/// window; display records are re-projected on every call to [`Self::view`].
pub struct FeedLoader {
    gateway: Arc<dyn ContractGateway>,
    page_size: NonZeroU64,
    page_increment: NonZeroU64,
    count: Option<u64>,
    loaded: Option<LoadedWindow>,
}

impl FeedLoader {
    pub fn new(gateway: Arc<dyn ContractGateway>, options: FeedOptions) -> Self {
        Self {
            gateway,
            page_size: options.page_size,
            page_increment: options.page_increment,
            count: None,
            loaded: None,
        }
    }

    pub fn page_size(&self) -> NonZeroU64 {
        self.page_size
    }

    /// Total message count, `None` while unresolved.
    pub fn total_count(&self) -> Option<u64> {
        self.count
    }

    /// Window for the current count and page size, `None` while the count is unresolved.
    pub fn window(&self) -> Option<FeedWindow> {
        self.count.map(|count| derive_window(count, self.page_size))
    }

    pub fn is_loading(&self) -> bool {
        match self.window() {
            None => true,
            Some(window) if window.is_empty() => false,
            Some(window) => self.loaded_window() != Some(window),
        }
    }

    pub fn can_load_more(&self) -> bool {
        self.count.is_some_and(|count| self.page_size.get() < count)
    }

    /// Grows the page size by one increment. Returns false when nothing is hidden.
    pub fn load_more(&mut self) -> bool {
        let Some(count) = self.count else {
            return false;
        };
        let Some(next) = grow_page_size(self.page_size, self.page_increment, count) else {
            return false;
        };

        tracing::debug!(
            previous_page_size = self.page_size.get(),
            page_size = next.get(),
            count,
            "feed page size grown"
        );
        self.page_size = next;
        true
    }

    /// Marks the count stale so the next [`Self::sync`] re-reads it.
    pub fn invalidate_count(&mut self) {
        self.count = None;
    }

    pub async fn refresh_count(&mut self) -> GatewayResult<u64> {
        match self.gateway.get_message_count().await {
            Ok(count) => {
                self.count = Some(count);
                Ok(count)
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to read message count");
                self.count = None;
                Err(error)
            }
        }
    }

    /// Resolves the count if needed, then reads the current window.
    ///
    /// A window that is already loaded is not read again; an empty window
    /// issues no reads at all.
    pub async fn sync(&mut self) -> GatewayResult<FeedWindow> {
        if self.count.is_none() {
            self.refresh_count().await?;
        }
        let Some(window) = self.window() else {
            return Ok(FeedWindow {
                start: 0,
                length: 0,
            });
        };

        if self.loaded_window() == Some(window) {
            return Ok(window);
        }

        let reads = if window.is_empty() {
            Vec::new()
        } else {
            self.gateway.get_messages(window.indices()).await
        };
        let failed_reads = reads.iter().filter(|read| read.is_err()).count();
        if failed_reads > 0 {
            tracing::debug!(
                start = window.start,
                length = window.length,
                failed_reads,
                "feed window loaded with degraded rows"
            );
        }

        self.loaded = Some(LoadedWindow { window, reads });
        Ok(window)
    }

    /// Display records for the loaded window, oldest first.
    pub fn entries(&self, viewer: Option<&Address>) -> Vec<FeedEntry> {
        match (&self.loaded, self.window()) {
            (Some(loaded), Some(window)) if loaded.window == window => {
                map_messages(window.start, &loaded.reads, viewer)
            }
            _ => Vec::new(),
        }
    }

    pub fn view(&self, viewer: Option<&Address>) -> FeedView {
        if self.is_loading() {
            return FeedView::Loading;
        }
        let entries = self.entries(viewer);
        if entries.is_empty() {
            return FeedView::Empty;
        }
        FeedView::Entries {
            entries,
            total_count: self.count.unwrap_or_default(),
            can_load_more: self.can_load_more(),
        }
    }

    fn loaded_window(&self) -> Option<FeedWindow> {
        self.loaded.as_ref().map(|loaded| loaded.window)
    }
}

#[cfg(test)]
mod tests {
    use chainboard_gateway::{MemoryChain, MemoryWallet};

    use super::*;

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn seeded_chain(messages: usize) -> Arc<MemoryChain> {
        let chain = MemoryChain::new(Arc::new(MemoryWallet::connected(alice())));
        chain.seed_messages(alice(), (0..messages).map(|index| format!("message {index}")));
        Arc::new(chain)
    }

    #[tokio::test]
    async fn empty_board_issues_no_message_reads() {
        let chain = seeded_chain(0);
        let mut loader = FeedLoader::new(chain.clone(), FeedOptions::default());
        assert!(loader.is_loading());
        assert_eq!(loader.view(None), FeedView::Loading);

        let window = loader.sync().await.unwrap();
        assert!(window.is_empty());
        assert!(!loader.is_loading());
        assert_eq!(loader.view(None), FeedView::Empty);
        assert_eq!(chain.call_counts().count_reads, 1);
        assert_eq!(chain.call_counts().message_reads, 0);
    }

    #[tokio::test]
    async fn loads_latest_page_then_grows() {
        let chain = seeded_chain(120);
        let mut loader = FeedLoader::new(chain.clone(), FeedOptions::default());

        let window = loader.sync().await.unwrap();
        assert_eq!(window.indices(), 70..120);
        let entries = loader.entries(None);
        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0].index, 70);
        assert_eq!(entries[0].content, "message 70");
        assert_eq!(entries[49].content, "message 119");
        assert!(loader.can_load_more());

        assert!(loader.load_more());
        assert_eq!(loader.page_size().get(), 100);
        assert!(loader.is_loading());
        assert!(loader.entries(None).is_empty());

        let window = loader.sync().await.unwrap();
        assert_eq!(window.indices(), 20..120);
        assert_eq!(loader.entries(None).len(), 100);

        assert!(loader.load_more());
        assert_eq!(loader.page_size().get(), 120);
        assert!(!loader.load_more());
        assert_eq!(chain.call_counts().count_reads, 1);
    }

    #[tokio::test]
    async fn repeated_sync_reads_identical_window_once() {
        let chain = seeded_chain(5);
        let mut loader = FeedLoader::new(chain.clone(), FeedOptions::default());

        loader.sync().await.unwrap();
        let first = loader.entries(None);
        loader.sync().await.unwrap();
        let second = loader.entries(None);

        assert_eq!(first, second);
        assert_eq!(chain.call_counts().message_reads, 5);
    }

    #[tokio::test]
    async fn reading_the_same_window_twice_gives_the_same_entries() {
        let chain = seeded_chain(120);
        let viewer = alice();

        let mut first = FeedLoader::new(chain.clone(), FeedOptions::default());
        let mut second = FeedLoader::new(chain.clone(), FeedOptions::default());
        let first_window = first.sync().await.unwrap();
        let second_window = second.sync().await.unwrap();

        assert_eq!(first_window, second_window);
        assert_eq!(chain.call_counts().message_reads, 100);
        let entries = first.entries(Some(&viewer));
        assert_eq!(entries, second.entries(Some(&viewer)));
        assert_eq!(
            entries.iter().map(|entry| entry.index).collect::<Vec<_>>(),
            (70..120).collect::<Vec<_>>()
        );

        let again = chain.get_messages(first_window.indices()).await;
        assert_eq!(
            map_messages(first_window.start, &again, Some(&viewer)),
            entries
        );
        assert_eq!(chain.call_counts().message_reads, 150);
    }

    #[tokio::test]
    async fn invalidated_count_picks_up_new_messages() {
        let chain = seeded_chain(3);
        let mut loader = FeedLoader::new(chain.clone(), FeedOptions::default());
        loader.sync().await.unwrap();

        chain.seed_messages(alice(), ["fresh"]);
        loader.sync().await.unwrap();
        assert_eq!(loader.entries(None).len(), 3);

        loader.invalidate_count();
        assert!(loader.is_loading());
        loader.sync().await.unwrap();

        let entries = loader.entries(Some(&alice()));
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].content, "fresh");
        assert!(entries[3].is_own);
        assert_eq!(chain.call_counts().count_reads, 2);
    }

    #[tokio::test]
    async fn failed_reads_degrade_rows_without_failing_sync() {
        let chain = seeded_chain(3);
        chain.fail_reads_at(1);
        chain.set_raw_message(2, serde_json::json!("garbage"));
        let mut loader = FeedLoader::new(chain.clone(), FeedOptions::default());

        loader.sync().await.unwrap();
        let entries = loader.entries(None);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].content, "message 0");
        assert_eq!(entries[1].content, "");
        assert_eq!(entries[1].full_address, "");
        assert_eq!(entries[2].content, "");
    }
}
