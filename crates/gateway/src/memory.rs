use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde_json::json;
use snafu::OptionExt;
use tokio::sync::Notify;

use super::error::{
    GatewayResult, IndexOutOfRangeSnafu, RejectedSnafu, RejectionDetails, TransportSnafu,
    UnknownTransactionSnafu, WalletUnavailableSnafu,
};
use super::gateway::{BoxFuture, ContractGateway, WalletSession};
use super::types::{Address, RawMessage, ReceiptStatus, TxHash};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const BLOCK_TIME_SECONDS: u64 = 12;

/// When a posted transaction gets included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiptMode {
    /// Included as soon as it is posted.
    #[default]
    Immediate,
    /// Stays pending until `confirm_pending` or `revert_pending`.
    Held,
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub count_reads: usize,
    pub message_reads: usize,
    pub posts: usize,
    pub receipt_waits: usize,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    sender: Address,
    content: String,
    timestamp: u64,
}

#[derive(Debug, Clone)]
struct PendingTx {
    sender: Address,
    content: String,
}

#[derive(Debug, Default)]
struct ChainState {
    messages: Vec<StoredMessage>,
    raw_overrides: HashMap<u64, RawMessage>,
    failing_reads: HashSet<u64>,
    pending: VecDeque<(TxHash, PendingTx)>,
    receipts: HashMap<TxHash, ReceiptStatus>,
    scripted_rejections: VecDeque<RejectionDetails>,
    receipt_mode: ReceiptMode,
    next_nonce: u64,
    clock: u64,
    calls: CallCounts,
}

impl ChainState {
    fn mine(&mut self, tx_hash: TxHash, tx: PendingTx) {
        self.clock += BLOCK_TIME_SECONDS;
        self.messages.push(StoredMessage {
            sender: tx.sender,
            content: tx.content,
            timestamp: self.clock,
        });
        self.receipts.insert(tx_hash, ReceiptStatus::Success);
    }
}

/// In-process stand-in for the message board contract.
///
/// Appends are visible to readers only once their transaction is included,
/// like the real contract.
pub struct MemoryChain {
    state: Mutex<ChainState>,
    receipt_signal: Notify,
    wallet: Arc<dyn WalletSession>,
}

impl MemoryChain {
    pub fn new(wallet: Arc<dyn WalletSession>) -> Self {
        Self {
            state: Mutex::new(ChainState {
                clock: GENESIS_TIMESTAMP,
                ..ChainState::default()
            }),
            receipt_signal: Notify::new(),
            wallet,
        }
    }

    pub fn with_receipt_mode(self, receipt_mode: ReceiptMode) -> Self {
        self.state.lock().receipt_mode = receipt_mode;
        self
    }

    /// Appends already-included messages, bypassing the wallet.
    pub fn seed_messages<I, S>(&self, sender: Address, contents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        for content in contents {
            state.clock += BLOCK_TIME_SECONDS;
            let timestamp = state.clock;
            state.messages.push(StoredMessage {
                sender,
                content: content.into(),
                timestamp,
            });
        }
    }

    /// Replaces the tuple served for `index` with an arbitrary value.
    pub fn set_raw_message(&self, index: u64, raw: RawMessage) {
        self.state.lock().raw_overrides.insert(index, raw);
    }

    /// Makes every read of `index` fail with a transport error.
    pub fn fail_reads_at(&self, index: u64) {
        self.state.lock().failing_reads.insert(index);
    }

    /// Makes the next `post_message` fail as if the user declined to sign.
    pub fn reject_next_post(&self, details: RejectionDetails) {
        self.state.lock().scripted_rejections.push_back(details);
    }

    /// Includes every pending transaction, in submission order.
    pub fn confirm_pending(&self) -> usize {
        let confirmed = {
            let mut state = self.state.lock();
            let pending = std::mem::take(&mut state.pending);
            let confirmed = pending.len();
            for (tx_hash, tx) in pending {
                state.mine(tx_hash, tx);
            }
            confirmed
        };
        tracing::debug!(confirmed, "memory chain included pending transactions");
        self.receipt_signal.notify_waiters();
        confirmed
    }

    /// Drops every pending transaction with a reverted receipt.
    pub fn revert_pending(&self) -> usize {
        let reverted = {
            let mut state = self.state.lock();
            let pending = std::mem::take(&mut state.pending);
            let reverted = pending.len();
            for (tx_hash, _) in pending {
                state.receipts.insert(tx_hash, ReceiptStatus::Reverted);
            }
            reverted
        };
        tracing::debug!(reverted, "memory chain reverted pending transactions");
        self.receipt_signal.notify_waiters();
        reverted
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn message_count(&self) -> u64 {
        self.state.lock().messages.len() as u64
    }

    pub fn call_counts(&self) -> CallCounts {
        self.state.lock().calls
    }

    fn read_message(&self, index: u64) -> GatewayResult<RawMessage> {
        let mut state = self.state.lock();
        state.calls.message_reads += 1;

        if state.failing_reads.contains(&index) {
            return TransportSnafu {
                stage: "memory-get-message",
                message: format!("read of message {index} failed"),
            }
            .fail();
        }
        if let Some(raw) = state.raw_overrides.get(&index) {
            return Ok(raw.clone());
        }

        let count = state.messages.len() as u64;
        let message = state
            .messages
            .get(index as usize)
            .context(IndexOutOfRangeSnafu {
                stage: "memory-get-message",
                index,
                count,
            })?;
        Ok(json!([
            message.sender.to_string(),
            message.content,
            message.timestamp
        ]))
    }

    fn submit(&self, content: &str) -> GatewayResult<TxHash> {
        let sender = self.wallet.current_address().context(WalletUnavailableSnafu {
            stage: "memory-post-message",
        })?;

        let mut state = self.state.lock();
        state.calls.posts += 1;

        if let Some(details) = state.scripted_rejections.pop_front() {
            return RejectedSnafu {
                stage: "memory-post-message",
                details,
            }
            .fail();
        }

        state.next_nonce += 1;
        let mut raw = [0u8; 32];
        raw[..8].copy_from_slice(&state.next_nonce.to_be_bytes());
        raw[8..28].copy_from_slice(sender.as_bytes());
        let tx_hash = TxHash::new(raw);

        let tx = PendingTx {
            sender,
            content: content.to_string(),
        };
        match state.receipt_mode {
            ReceiptMode::Immediate => state.mine(tx_hash, tx),
            ReceiptMode::Held => state.pending.push_back((tx_hash, tx)),
        }

        tracing::debug!(tx_hash = %tx_hash, sender = %sender, "memory chain accepted transaction");
        Ok(tx_hash)
    }

    fn receipt(&self, tx_hash: TxHash) -> GatewayResult<Option<ReceiptStatus>> {
        let state = self.state.lock();
        if let Some(status) = state.receipts.get(&tx_hash) {
            return Ok(Some(*status));
        }
        if state.pending.iter().any(|(pending, _)| *pending == tx_hash) {
            return Ok(None);
        }
        UnknownTransactionSnafu {
            stage: "memory-wait-for-receipt",
            tx_hash,
        }
        .fail()
    }
}

impl ContractGateway for MemoryChain {
    fn get_message_count<'a>(&'a self) -> BoxFuture<'a, GatewayResult<u64>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.calls.count_reads += 1;
            Ok(state.messages.len() as u64)
        })
    }

    fn get_message<'a>(&'a self, index: u64) -> BoxFuture<'a, GatewayResult<RawMessage>> {
        Box::pin(async move { self.read_message(index) })
    }

    fn post_message<'a>(&'a self, content: &'a str) -> BoxFuture<'a, GatewayResult<TxHash>> {
        Box::pin(async move { self.submit(content) })
    }

    fn wait_for_receipt<'a>(
        &'a self,
        tx_hash: TxHash,
    ) -> BoxFuture<'a, GatewayResult<ReceiptStatus>> {
        Box::pin(async move {
            self.state.lock().calls.receipt_waits += 1;
            loop {
                // Register before checking so a confirmation in between is not missed.
                let notified = self.receipt_signal.notified();
                if let Some(status) = self.receipt(tx_hash)? {
                    return Ok(status);
                }
                notified.await;
            }
        })
    }
}

/// Wallet that is either connected to one fixed account or refuses to connect.
pub struct MemoryWallet {
    account: Option<Address>,
    connected: ArcSwapOption<Address>,
}

impl MemoryWallet {
    pub fn new(account: Address) -> Self {
        Self {
            account: Some(account),
            connected: ArcSwapOption::empty(),
        }
    }

    pub fn connected(account: Address) -> Self {
        let wallet = Self::new(account);
        wallet.connected.store(Some(Arc::new(account)));
        wallet
    }

    /// A wallet whose connect prompt is always dismissed.
    pub fn refusing() -> Self {
        Self {
            account: None,
            connected: ArcSwapOption::empty(),
        }
    }
}

impl WalletSession for MemoryWallet {
    fn connect<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Address>> {
        Box::pin(async move {
            let Some(account) = self.account else {
                return RejectedSnafu {
                    stage: "memory-wallet-connect",
                    details: RejectionDetails::default()
                        .with_short_message("User closed the connect prompt"),
                }
                .fail();
            };
            self.connected.store(Some(Arc::new(account)));
            Ok(account)
        })
    }

    fn disconnect<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.connected.store(None);
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load().is_some()
    }

    fn current_address(&self) -> Option<Address> {
        self.connected.load().as_deref().copied()
    }
}
