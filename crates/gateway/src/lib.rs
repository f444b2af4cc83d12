#![deny(unsafe_code)]

//! Contract and wallet boundaries for the message board.
//!
//! The board never talks to a node directly; it goes through [`ContractGateway`]
//! and [`WalletSession`]. [`MemoryChain`] and [`MemoryWallet`] implement both
//! in-process for tests and scripted QA runs.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod types;

pub use error::{GatewayError, GatewayResult, RejectionDetails};
pub use gateway::{BoxFuture, ContractGateway, WalletSession};
pub use memory::{CallCounts, MemoryChain, MemoryWallet, ReceiptMode};
pub use types::{Address, RawMessage, ReceiptStatus, TxHash};
