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

use alloy_primitives::{Address, B256};
#[cfg(feature = "test-utils")]
use mockall::automock;

use crate::{TrackedTransaction, UserOperationInfo};

/// A user operation in the `submitted` state: bound to the broadcast
/// transaction currently carrying it.
#[derive(Debug, Clone)]
pub struct SubmittedOperation {
    /// The submitted operation
    pub op: UserOperationInfo,
    /// The transaction carrying it
    pub tx: TrackedTransaction,
}

/// The mempool of pending, processing, and submitted user operations.
///
/// The store's own concurrency contract guarantees that `remove_submitted`
/// and `replace_submitted` are safe to call while other components hold a
/// snapshot from `dump_submitted_ops`. A user operation hash has at most one
/// tracked transaction bound to it at any moment.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait Mempool: Send + Sync + 'static {
    /// Pull a batch of operations for bundling, capped at `max_gas` total
    /// gas and returning nothing unless at least `min_ops` are available.
    async fn process(&self, max_gas: u128, min_ops: usize) -> Vec<UserOperationInfo>;

    /// Snapshot all operations currently in the `submitted` state
    async fn dump_submitted_ops(&self) -> Vec<SubmittedOperation>;

    /// Move an operation from `processing` to `submitted`, binding it to the
    /// transaction that carries it
    async fn mark_submitted(&self, op_hash: B256, tx: TrackedTransaction);

    /// Drop an operation from the `processing` state
    async fn remove_processing(&self, op_hash: B256);

    /// Drop an operation from the `submitted` state
    async fn remove_submitted(&self, op_hash: B256);

    /// Rebind a submitted operation to a replacement transaction
    async fn replace_submitted(&self, op: UserOperationInfo, tx: TrackedTransaction);

    /// Re-insert an operation into the pending pool at its entry point
    async fn add(&self, op: UserOperationInfo, entry_point: Address);
}
