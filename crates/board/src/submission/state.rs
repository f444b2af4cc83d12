use chainboard_gateway::TxHash;

/// Lifecycle of the single in-flight message post.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    AwaitingSignature,
    AwaitingConfirmation(TxHash),
    Confirmed(TxHash),
    Failed(String),
}

/// State transition input for the submission lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionTransition {
    /// The user asked to post; the wallet is prompted to sign.
    Sign,
    /// The gateway accepted the transaction.
    Broadcast(TxHash),
    /// The transaction was included on-chain.
    Confirm(TxHash),
    /// Signing, broadcasting or inclusion failed.
    Reject(String),
    ResetToIdle,
}

/// Rejection reason for illegal submission transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionRejection {
    AlreadyInFlight { active: SubmissionStatus },
    NotAwaitingSignature { active: SubmissionStatus },
    NotAwaitingConfirmation { active: SubmissionStatus },
    TransactionMismatch { active: TxHash, attempted: TxHash },
    NothingInFlight,
}

pub type SubmissionTransitionResult = Result<SubmissionStatus, SubmissionRejection>;

impl SubmissionStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// True while the input must stay disabled.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::AwaitingSignature | Self::AwaitingConfirmation(_))
    }

    /// True for the transient outcome states that reset to idle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Failed(_))
    }

    pub fn transaction(&self) -> Option<TxHash> {
        match self {
            Self::AwaitingConfirmation(tx_hash) | Self::Confirmed(tx_hash) => Some(*tx_hash),
            Self::Idle | Self::AwaitingSignature | Self::Failed(_) => None,
        }
    }

    /// Applies one transition deterministically.
    ///
    /// `wait_for_confirmation` decides whether a broadcast parks in
    /// `AwaitingConfirmation` or counts as confirmed right away.
    pub fn apply(
        &self,
        transition: SubmissionTransition,
        wait_for_confirmation: bool,
    ) -> SubmissionTransitionResult {
        match transition {
            SubmissionTransition::Sign => self.apply_sign(),
            SubmissionTransition::Broadcast(tx_hash) => {
                self.apply_broadcast(tx_hash, wait_for_confirmation)
            }
            SubmissionTransition::Confirm(tx_hash) => self.apply_confirm(tx_hash),
            SubmissionTransition::Reject(message) => self.apply_reject(message),
            SubmissionTransition::ResetToIdle => Ok(Self::Idle),
        }
    }

    fn apply_sign(&self) -> SubmissionTransitionResult {
        match self {
            Self::Idle => Ok(Self::AwaitingSignature),
            active => Err(SubmissionRejection::AlreadyInFlight {
                active: active.clone(),
            }),
        }
    }

    fn apply_broadcast(
        &self,
        tx_hash: TxHash,
        wait_for_confirmation: bool,
    ) -> SubmissionTransitionResult {
        match self {
            Self::AwaitingSignature if wait_for_confirmation => {
                Ok(Self::AwaitingConfirmation(tx_hash))
            }
            Self::AwaitingSignature => Ok(Self::Confirmed(tx_hash)),
            active => Err(SubmissionRejection::NotAwaitingSignature {
                active: active.clone(),
            }),
        }
    }

    fn apply_confirm(&self, tx_hash: TxHash) -> SubmissionTransitionResult {
        match self {
            Self::AwaitingConfirmation(active) if *active == tx_hash => {
                Ok(Self::Confirmed(tx_hash))
            }
            Self::AwaitingConfirmation(active) => Err(SubmissionRejection::TransactionMismatch {
                active: *active,
                attempted: tx_hash,
            }),
            active => Err(SubmissionRejection::NotAwaitingConfirmation {
                active: active.clone(),
            }),
        }
    }

    fn apply_reject(&self, message: String) -> SubmissionTransitionResult {
        match self {
            Self::AwaitingSignature | Self::AwaitingConfirmation(_) => Ok(Self::Failed(message)),
            Self::Idle | Self::Confirmed(_) | Self::Failed(_) => {
                Err(SubmissionRejection::NothingInFlight)
            }
        }
    }
}
