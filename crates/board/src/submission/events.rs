use chainboard_gateway::{GatewayError, TxHash};

use super::state::{SubmissionStatus, SubmissionTransition};

pub const NOT_CONNECTED_MESSAGE: &str = "Connect a wallet first";
pub const AWAITING_CONFIRMATION_MESSAGE: &str = "Transaction sent, waiting for confirmation…";
pub const SUBMITTED_MESSAGE: &str = "Transaction submitted";
pub const PUBLISHED_MESSAGE: &str = "Message published on-chain";
pub const FALLBACK_FAILURE_MESSAGE: &str = "Transaction cancelled or failed";
pub const REVERTED_MESSAGE: &str = "Transaction reverted";
pub const CONFIRMATION_TIMED_OUT_MESSAGE: &str = "Timed out waiting for confirmation";

/// Report sent by the submission worker back to the state holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Broadcast(TxHash),
    Confirmed(TxHash),
    Failed(String),
}

impl SubmissionEvent {
    pub fn into_transition(self) -> SubmissionTransition {
        match self {
            Self::Broadcast(tx_hash) => SubmissionTransition::Broadcast(tx_hash),
            Self::Confirmed(tx_hash) => SubmissionTransition::Confirm(tx_hash),
            Self::Failed(message) => SubmissionTransition::Reject(message),
        }
    }
}

/// Result of a submit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    /// The wallet is being asked to sign.
    Started,
    /// Blank drafts are dropped silently.
    EmptyDraft,
    /// Another submission is still in flight.
    InFlight,
    /// No wallet is connected; an error was shown.
    WalletDisconnected,
}

/// State after one worker report has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionUpdate {
    pub status: SubmissionStatus,
    /// The message count must be re-read.
    pub refresh_feed: bool,
}

/// Best-effort user-facing text for a failed gateway call.
pub fn failure_message(error: &GatewayError) -> String {
    [error.short_message(), error.message()]
        .into_iter()
        .flatten()
        .find(|message| !message.trim().is_empty())
        .unwrap_or(FALLBACK_FAILURE_MESSAGE)
        .to_string()
}
