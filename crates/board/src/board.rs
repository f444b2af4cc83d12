use std::sync::Arc;

use chainboard_gateway::{Address, ContractGateway, GatewayResult, WalletSession};

use crate::avatar::{AvatarCache, DEFAULT_AVATAR_CACHE_CAPACITY, Identicon};
use crate::feed::{FeedEntry, FeedLoader, FeedOptions, FeedView, FeedWindow};
use crate::notify::Notifier;
use crate::settings::BoardSettings;
use crate::submission::{
    SubmissionController, SubmissionOptions, SubmissionStatus, SubmissionUpdate, SubmitOutcome,
    failure_message,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardOptions {
    pub feed: FeedOptions,
    pub submission: SubmissionOptions,
    pub avatar_capacity: usize,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            feed: FeedOptions::default(),
            submission: SubmissionOptions::default(),
            avatar_capacity: DEFAULT_AVATAR_CACHE_CAPACITY,
        }
    }
}

impl From<&BoardSettings> for BoardOptions {
    fn from(settings: &BoardSettings) -> Self {
        Self {
            feed: settings.feed.to_options(),
            submission: settings.submission.to_options(),
            avatar_capacity: settings.avatars.cache_capacity,
        }
    }
}

/// Ties the feed, the submission lifecycle and the avatar cache to one
/// wallet session.
pub struct MessageBoard {
    wallet: Arc<dyn WalletSession>,
    notifier: Arc<dyn Notifier>,
    feed: FeedLoader,
    submission: SubmissionController,
    avatars: AvatarCache<Identicon>,
}

impl MessageBoard {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        wallet: Arc<dyn WalletSession>,
        notifier: Arc<dyn Notifier>,
        options: BoardOptions,
    ) -> Self {
        Self {
            feed: FeedLoader::new(gateway.clone(), options.feed),
            submission: SubmissionController::new(
                gateway,
                wallet.clone(),
                notifier.clone(),
                options.submission,
            ),
            avatars: AvatarCache::new(options.avatar_capacity),
            wallet,
            notifier,
        }
    }

    /// Builds a board whose feed, submission and avatar limits come from
    /// loaded settings.
    pub fn from_settings(
        gateway: Arc<dyn ContractGateway>,
        wallet: Arc<dyn WalletSession>,
        notifier: Arc<dyn Notifier>,
        settings: &BoardSettings,
    ) -> Self {
        tracing::debug!(
            chain_id = settings.network.chain_id,
            page_size = settings.feed.page_size,
            wait_for_confirmation = settings.submission.wait_for_confirmation,
            "building board from settings"
        );
        Self::new(gateway, wallet, notifier, BoardOptions::from(settings))
    }

    pub fn feed(&self) -> &FeedLoader {
        &self.feed
    }

    pub fn submission(&self) -> &SubmissionController {
        &self.submission
    }

    pub fn viewer(&self) -> Option<Address> {
        self.wallet.current_address()
    }

    pub async fn connect_wallet(&self) -> GatewayResult<Address> {
        match self.wallet.connect().await {
            Ok(address) => {
                tracing::info!(address = %address, "wallet connected");
                Ok(address)
            }
            Err(error) => {
                tracing::warn!(stage = error.stage(), error = %error, "wallet connection failed");
                self.notifier.error(&failure_message(&error));
                Err(error)
            }
        }
    }

    pub async fn disconnect_wallet(&self) {
        let previous = self.wallet.current_address();
        self.wallet.disconnect().await;
        if let Some(address) = previous {
            tracing::info!(address = %address, "wallet disconnected");
        }
    }

    /// Re-reads the count and the window it implies.
    pub async fn refresh(&mut self) -> GatewayResult<FeedWindow> {
        self.feed.invalidate_count();
        self.feed.sync().await
    }

    /// Grows the page and reads the wider window.
    pub async fn load_more(&mut self) -> GatewayResult<bool> {
        if !self.feed.load_more() {
            return Ok(false);
        }
        self.feed.sync().await?;
        Ok(true)
    }

    pub fn view(&self) -> FeedView {
        self.feed.view(self.viewer().as_ref())
    }

    pub fn entries(&self) -> Vec<FeedEntry> {
        self.feed.entries(self.viewer().as_ref())
    }

    pub fn avatar_for(&mut self, entry: &FeedEntry) -> Option<&Identicon> {
        self.avatars
            .get_or_insert_with(&entry.full_address, Identicon::generate)
    }

    pub fn avatar_count(&self) -> usize {
        self.avatars.len()
    }

    pub fn draft(&self) -> &str {
        self.submission.draft()
    }

    pub fn set_draft(&mut self, text: &str) -> bool {
        self.submission.set_draft(text)
    }

    pub fn submission_status(&self) -> &SubmissionStatus {
        self.submission.status()
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.submission.submit()
    }

    /// Applies the next submission report, resyncing the feed when it asks for it.
    pub async fn pump(&mut self) -> Option<SubmissionUpdate> {
        let update = self.submission.pump().await?;
        if update.refresh_feed
            && let Err(error) = self.refresh().await
        {
            tracing::warn!(error = %error, "feed refresh after submission failed");
        }
        Some(update)
    }

    /// Pumps until the current submission settles.
    pub async fn settle(&mut self) -> Vec<SubmissionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.pump().await {
            updates.push(update);
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use chainboard_gateway::{MemoryChain, MemoryWallet, ReceiptMode};

    use super::*;
    use crate::notify::{NotificationLog, Severity};

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn bob() -> Address {
        Address::new([0xb0; 20])
    }

    fn board(
        wallet: MemoryWallet,
        mode: ReceiptMode,
    ) -> (Arc<MemoryChain>, Arc<NotificationLog>, MessageBoard) {
        let wallet = Arc::new(wallet);
        let chain = Arc::new(MemoryChain::new(wallet.clone()).with_receipt_mode(mode));
        let log = Arc::new(NotificationLog::default());
        let board = MessageBoard::new(
            chain.clone(),
            wallet,
            log.clone(),
            BoardOptions::default(),
        );
        (chain, log, board)
    }

    #[tokio::test]
    async fn confirmed_post_refetches_count_once() {
        let (chain, log, mut board) = board(MemoryWallet::connected(alice()), ReceiptMode::Held);
        chain.seed_messages(bob(), ["gm"]);
        board.refresh().await.unwrap();
        assert_eq!(chain.call_counts().count_reads, 1);

        board.set_draft("hello");
        assert_eq!(board.submit(), SubmitOutcome::Started);
        assert_eq!(board.submission_status(), &SubmissionStatus::AwaitingSignature);

        let broadcast = board.pump().await.unwrap();
        assert!(matches!(
            broadcast.status,
            SubmissionStatus::AwaitingConfirmation(_)
        ));
        assert_eq!(chain.call_counts().count_reads, 1);

        chain.confirm_pending();
        let updates = board.settle().await;
        assert_eq!(updates.len(), 1);
        assert!(board.submission_status().is_idle());
        assert_eq!(board.draft(), "");
        assert_eq!(chain.call_counts().count_reads, 2);
        assert_eq!(log.count(Severity::Success), 1);

        let entries = board.entries();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_own);
        assert_eq!(entries[1].content, "hello");
        assert!(entries[1].is_own);
    }

    #[tokio::test]
    async fn ownership_follows_the_connected_wallet() {
        let (chain, _log, mut board) =
            board(MemoryWallet::connected(alice()), ReceiptMode::Immediate);
        chain.seed_messages(alice(), ["mine"]);
        board.refresh().await.unwrap();
        assert!(board.entries()[0].is_own);

        board.disconnect_wallet().await;
        assert!(!board.entries()[0].is_own);

        board.connect_wallet().await.unwrap();
        assert!(board.entries()[0].is_own);
    }

    #[tokio::test]
    async fn refused_connection_raises_an_error() {
        let (_chain, log, board) = board(MemoryWallet::refusing(), ReceiptMode::Immediate);
        assert!(board.connect_wallet().await.is_err());
        assert_eq!(log.count(Severity::Error), 1);
        assert_eq!(board.viewer(), None);
    }

    #[tokio::test]
    async fn avatars_are_cached_per_sender() {
        let (chain, _log, mut board) =
            board(MemoryWallet::connected(alice()), ReceiptMode::Immediate);
        chain.seed_messages(alice(), ["one", "two"]);
        chain.seed_messages(bob(), ["three"]);
        board.refresh().await.unwrap();

        let entries = board.entries();
        let first = board.avatar_for(&entries[0]).cloned();
        let second = board.avatar_for(&entries[1]).cloned();
        assert_eq!(first, second);
        assert!(board.avatar_for(&entries[2]).is_some());
        assert_eq!(board.avatar_count(), 2);
    }

    #[tokio::test]
    async fn load_more_widens_the_window() {
        let (chain, _log, mut board) =
            board(MemoryWallet::connected(alice()), ReceiptMode::Immediate);
        chain.seed_messages(bob(), (0..120).map(|index| format!("m{index}")));
        board.refresh().await.unwrap();
        assert_eq!(board.entries().len(), 50);

        assert!(board.load_more().await.unwrap());
        assert_eq!(board.entries().len(), 100);
        assert_eq!(board.entries()[0].index, 20);
        assert!(board.load_more().await.unwrap());
        assert!(!board.load_more().await.unwrap());
        assert_eq!(board.entries().len(), 120);
    }
}
