use std::future::Future;
use std::ops::Range;
use std::pin::Pin;

use futures::future::join_all;

use super::error::GatewayResult;
use super::types::{Address, RawMessage, ReceiptStatus, TxHash};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Contract-call surface of the message board contract.
///
/// Every call is scoped to the single network/contract pair the gateway was
/// built for.
pub trait ContractGateway: Send + Sync {
    fn get_message_count<'a>(&'a self) -> BoxFuture<'a, GatewayResult<u64>>;

    fn get_message<'a>(&'a self, index: u64) -> BoxFuture<'a, GatewayResult<RawMessage>>;

    /// Reads every index in `indices`, one result per index, in order.
    ///
    /// One failed read never fails the batch.
    fn get_messages<'a>(
        &'a self,
        indices: Range<u64>,
    ) -> BoxFuture<'a, Vec<GatewayResult<RawMessage>>> {
        Box::pin(async move { join_all(indices.map(|index| self.get_message(index))).await })
    }

    fn post_message<'a>(&'a self, content: &'a str) -> BoxFuture<'a, GatewayResult<TxHash>>;

    fn wait_for_receipt<'a>(&'a self, tx_hash: TxHash)
    -> BoxFuture<'a, GatewayResult<ReceiptStatus>>;
}

/// Authenticated connection to the user's account.
pub trait WalletSession: Send + Sync {
    fn connect<'a>(&'a self) -> BoxFuture<'a, GatewayResult<Address>>;

    fn disconnect<'a>(&'a self) -> BoxFuture<'a, ()>;

    fn is_connected(&self) -> bool;

    fn current_address(&self) -> Option<Address>;
}
