// This file is part of Barge.
//
// Barge is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Barge is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Barge.
// If not, see https://www.gnu.org/licenses/.

//! Trait for interacting with chain data.

use alloy_eips::BlockId;
use alloy_primitives::{Bytes, TxHash};
use alloy_rpc_types_eth::{Filter, Log, Transaction, TransactionReceipt, TransactionRequest};
#[cfg(feature = "test-utils")]
use mockall::automock;

use crate::error::ProviderResult;

/// Trait for interacting with chain data.
///
/// A missing transaction receipt is represented as `Ok(None)`: for a hash
/// the caller knows was broadcast, that is the "receipt not found yet" retry
/// signal. All other failures surface as errors.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait EvmProvider: Send + Sync {
    /// Get the current block number
    async fn get_block_number(&self) -> ProviderResult<u64>;

    /// Get the logs matching a filter
    async fn get_logs(&self, filter: &Filter) -> ProviderResult<Vec<Log>>;

    /// Get a transaction by hash
    async fn get_transaction_by_hash(&self, tx: TxHash) -> ProviderResult<Option<Transaction>>;

    /// Get a transaction receipt by hash
    async fn get_transaction_receipt(
        &self,
        tx: TxHash,
    ) -> ProviderResult<Option<TransactionReceipt>>;

    /// Execute a call at a block. A revert surfaces as
    /// [`ProviderError::Revert`](crate::ProviderError::Revert) carrying the
    /// revert payload.
    async fn call(&self, tx: &TransactionRequest, block: Option<BlockId>)
        -> ProviderResult<Bytes>;
}
