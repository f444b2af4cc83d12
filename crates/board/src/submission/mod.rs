//! Posting a message: draft handling, the submission state machine and
//! the worker that talks to the gateway.

pub mod controller;
pub mod events;
pub mod state;

pub use controller::{DEFAULT_MAX_MESSAGE_LENGTH, SubmissionController, SubmissionOptions};
pub use events::{SubmissionEvent, SubmissionUpdate, SubmitOutcome, failure_message};
pub use state::{
    SubmissionRejection, SubmissionStatus, SubmissionTransition, SubmissionTransitionResult,
};
