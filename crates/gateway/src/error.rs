use snafu::Snafu;

use super::types::TxHash;

/// Structured rejection payload reported by a wallet or node.
///
/// Wallets tend to report a terse `short_message` next to a verbose `message`;
/// either may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RejectionDetails {
    pub short_message: Option<String>,
    pub message: Option<String>,
}

impl RejectionDetails {
    pub fn with_short_message(mut self, short_message: impl Into<String>) -> Self {
        self.short_message = Some(short_message.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn summary(&self) -> &str {
        self.short_message
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or("no details")
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GatewayError {
    #[snafu(display("request rejected on `{stage}`: {}", details.summary()))]
    Rejected {
        stage: &'static str,
        details: RejectionDetails,
    },
    #[snafu(display("gateway transport failed on `{stage}`: {message}"))]
    Transport {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("malformed gateway response on `{stage}`: {details}"))]
    MalformedResponse {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("message index {index} is out of range for count {count}"))]
    IndexOutOfRange {
        stage: &'static str,
        index: u64,
        count: u64,
    },
    #[snafu(display("no wallet account is available on `{stage}`"))]
    WalletUnavailable { stage: &'static str },
    #[snafu(display("'{raw}' is not a valid account address"))]
    InvalidAddress {
        stage: &'static str,
        raw: String,
        source: hex::FromHexError,
    },
    #[snafu(display("'{raw}' is not a valid transaction hash"))]
    InvalidTxHash {
        stage: &'static str,
        raw: String,
        source: hex::FromHexError,
    },
    #[snafu(display("transaction {tx_hash} is unknown to the gateway"))]
    UnknownTransaction { stage: &'static str, tx_hash: TxHash },
}

impl GatewayError {
    /// Terse human-readable reason, when the failure carries one.
    pub fn short_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { details, .. } => details.short_message.as_deref(),
            _ => None,
        }
    }

    /// Generic message field, when the failure carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected { details, .. } => details.message.as_deref(),
            Self::Transport { message, .. } => Some(message),
            Self::MalformedResponse { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Rejected { stage, .. }
            | Self::Transport { stage, .. }
            | Self::MalformedResponse { stage, .. }
            | Self::IndexOutOfRange { stage, .. }
            | Self::WalletUnavailable { stage }
            | Self::InvalidAddress { stage, .. }
            | Self::InvalidTxHash { stage, .. }
            | Self::UnknownTransaction { stage, .. } => *stage,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
