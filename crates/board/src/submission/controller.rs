use std::sync::Arc;
use std::time::Duration;

use chainboard_gateway::{ContractGateway, ReceiptStatus, TxHash, WalletSession};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{
    AWAITING_CONFIRMATION_MESSAGE, CONFIRMATION_TIMED_OUT_MESSAGE, FALLBACK_FAILURE_MESSAGE,
    NOT_CONNECTED_MESSAGE, PUBLISHED_MESSAGE, REVERTED_MESSAGE, SUBMITTED_MESSAGE,
    SubmissionEvent, SubmissionUpdate, SubmitOutcome, failure_message,
};
use super::state::{SubmissionStatus, SubmissionTransition};
use crate::notify::Notifier;

pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOptions {
    /// Park in `AwaitingConfirmation` until the receipt arrives.
    pub wait_for_confirmation: bool,
    /// Give up on a receipt after this long. `None` waits forever.
    pub confirmation_timeout: Option<Duration>,
    /// Draft length limit in characters.
    pub max_message_length: usize,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            wait_for_confirmation: true,
            confirmation_timeout: None,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

/// State holder for the draft and its single in-flight submission.
///
/// Gateway calls run on a worker task that reports back over a channel;
/// [`Self::pump`] applies those reports as state transitions.
pub struct SubmissionController {
    gateway: Arc<dyn ContractGateway>,
    wallet: Arc<dyn WalletSession>,
    notifier: Arc<dyn Notifier>,
    options: SubmissionOptions,
    draft: String,
    status: SubmissionStatus,
    events: Option<mpsc::UnboundedReceiver<SubmissionEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl SubmissionController {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        wallet: Arc<dyn WalletSession>,
        notifier: Arc<dyn Notifier>,
        options: SubmissionOptions,
    ) -> Self {
        Self {
            gateway,
            wallet,
            notifier,
            options,
            draft: String::new(),
            status: SubmissionStatus::Idle,
            events: None,
            worker: None,
        }
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn options(&self) -> SubmissionOptions {
        self.options
    }

    /// Handle of the transaction being confirmed, if any.
    pub fn pending_transaction(&self) -> Option<TxHash> {
        self.status.transaction()
    }

    /// Whether the compose input accepts edits and submits.
    pub fn accepts_input(&self) -> bool {
        self.status.is_idle()
    }

    /// Replaces the draft, cut to the length limit. Ignored while in flight.
    pub fn set_draft(&mut self, text: &str) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.draft = text.chars().take(self.options.max_message_length).collect();
        true
    }

    /// Starts posting the trimmed draft.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the post runs on a
    /// spawned worker task.
    pub fn submit(&mut self) -> SubmitOutcome {
        let content = self.draft.trim().to_string();
        if content.is_empty() {
            return SubmitOutcome::EmptyDraft;
        }
        if !self.accepts_input() {
            tracing::debug!(status = ?self.status, "submit ignored while a post is in flight");
            return SubmitOutcome::InFlight;
        }
        if !self.wallet.is_connected() {
            self.notifier.error(NOT_CONNECTED_MESSAGE);
            return SubmitOutcome::WalletDisconnected;
        }

        if !self.apply(SubmissionTransition::Sign) {
            return SubmitOutcome::InFlight;
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.events = Some(event_rx);
        self.worker = Some(tokio::spawn(Self::run_worker(
            self.gateway.clone(),
            content,
            self.options,
            event_tx,
        )));

        SubmitOutcome::Started
    }

    /// Waits for the next worker report and applies it.
    ///
    /// Returns `None` right away when nothing is in flight.
    pub async fn pump(&mut self) -> Option<SubmissionUpdate> {
        if !self.status.is_in_flight() {
            return None;
        }

        let next_event = match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        };
        // A worker that stops without a terminal report must not strand the input.
        let event = next_event.unwrap_or_else(|| {
            tracing::warn!(status = ?self.status, "submission worker stopped without reporting");
            SubmissionEvent::Failed(FALLBACK_FAILURE_MESSAGE.to_string())
        });

        Some(self.handle_event(event))
    }

    /// Pumps until the submission settles back to idle.
    pub async fn run_until_idle(&mut self) -> Vec<SubmissionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.pump().await {
            updates.push(update);
        }
        updates
    }

    /// Applies one worker report, emitting the matching notification.
    pub fn handle_event(&mut self, event: SubmissionEvent) -> SubmissionUpdate {
        let applied = self.apply(event.into_transition());
        let refresh_feed = applied && self.settle();
        SubmissionUpdate {
            status: self.status.clone(),
            refresh_feed,
        }
    }

    fn apply(&mut self, transition: SubmissionTransition) -> bool {
        match self
            .status
            .apply(transition.clone(), self.options.wait_for_confirmation)
        {
            Ok(next) => {
                tracing::debug!(from = ?self.status, to = ?next, "submission transition");
                self.status = next;
                true
            }
            Err(rejection) => {
                tracing::warn!(
                    transition = ?transition,
                    rejection = ?rejection,
                    "submission transition rejected"
                );
                false
            }
        }
    }

    // Emits the notification for the state just entered; terminal states
    // reset to idle here. Returns whether the feed must be refreshed.
    fn settle(&mut self) -> bool {
        match &self.status {
            SubmissionStatus::AwaitingConfirmation(_) => {
                self.notifier.info(AWAITING_CONFIRMATION_MESSAGE);
                false
            }
            SubmissionStatus::Confirmed(tx_hash) => {
                tracing::info!(tx_hash = %tx_hash, "message submission settled");
                let message = if self.options.wait_for_confirmation {
                    PUBLISHED_MESSAGE
                } else {
                    SUBMITTED_MESSAGE
                };
                self.notifier.success(message);
                self.draft.clear();
                self.finish();
                true
            }
            SubmissionStatus::Failed(message) => {
                tracing::warn!(error = %message, "message submission failed");
                self.notifier.error(message);
                self.finish();
                false
            }
            SubmissionStatus::Idle | SubmissionStatus::AwaitingSignature => false,
        }
    }

    fn finish(&mut self) {
        self.apply(SubmissionTransition::ResetToIdle);
        self.events = None;
        self.worker = None;
    }

    async fn run_worker(
        gateway: Arc<dyn ContractGateway>,
        content: String,
        options: SubmissionOptions,
        event_tx: mpsc::UnboundedSender<SubmissionEvent>,
    ) {
        let tx_hash = match gateway.post_message(&content).await {
            Ok(tx_hash) => tx_hash,
            Err(error) => {
                tracing::warn!(stage = error.stage(), error = %error, "post message failed");
                let _ = event_tx.send(SubmissionEvent::Failed(failure_message(&error)));
                return;
            }
        };

        if event_tx.send(SubmissionEvent::Broadcast(tx_hash)).is_err()
            || !options.wait_for_confirmation
        {
            return;
        }

        let receipt = gateway.wait_for_receipt(tx_hash);
        let outcome = match options.confirmation_timeout {
            Some(limit) => match tokio::time::timeout(limit, receipt).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(tx_hash = %tx_hash, ?limit, "confirmation wait timed out");
                    let _ = event_tx.send(SubmissionEvent::Failed(
                        CONFIRMATION_TIMED_OUT_MESSAGE.to_string(),
                    ));
                    return;
                }
            },
            None => receipt.await,
        };

        let event = match outcome {
            Ok(ReceiptStatus::Success) => SubmissionEvent::Confirmed(tx_hash),
            Ok(ReceiptStatus::Reverted) => SubmissionEvent::Failed(REVERTED_MESSAGE.to_string()),
            Err(error) => {
                tracing::warn!(tx_hash = %tx_hash, error = %error, "receipt query failed");
                SubmissionEvent::Failed(failure_message(&error))
            }
        };
        let _ = event_tx.send(event);
    }
}

impl Drop for SubmissionController {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
