#![deny(unsafe_code)]

//! On-chain message board client.
//!
//! [`board::MessageBoard`] combines a paged [`feed::FeedLoader`], the
//! [`submission::SubmissionController`] state machine and an identicon
//! cache on top of the `chainboard-gateway` boundaries. Settings are
//! layered from defaults, a JSON file and `CHAINBOARD_*` variables.

pub mod avatar;
pub mod board;
pub mod feed;
pub mod notify;
pub mod settings;
pub mod submission;

pub use board::{BoardOptions, MessageBoard};
pub use notify::{Notification, NotificationLog, Notifier, Severity, Toast, ToastCenter};
