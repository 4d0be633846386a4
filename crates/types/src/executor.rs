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

use alloy_primitives::Address;
#[cfg(feature = "test-utils")]
use mockall::automock;

use crate::{BundleResult, ReplaceResult, TrackedTransaction, UserOperationInfo};

/// The low-level bundle executor: transaction construction, signing, nonce
/// management and broadcast. One result is returned per operation that made
/// it into a broadcast; operations filtered during construction are absent
/// from the result list.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait BundleExecutor: Send + Sync + 'static {
    /// Bundle and broadcast a set of operations at an entry point
    async fn bundle(
        &self,
        entry_point: Address,
        ops: Vec<UserOperationInfo>,
    ) -> anyhow::Result<Vec<BundleResult>>;

    /// Bundle and broadcast a set of compressed operations at an entry point
    async fn bundle_compressed(
        &self,
        entry_point: Address,
        ops: Vec<UserOperationInfo>,
    ) -> anyhow::Result<Vec<BundleResult>>;

    /// Replace a broadcast transaction at the same sender and nonce with
    /// higher fees. On `Replaced`, the returned transaction has its
    /// `last_replaced` stamp set by the executor.
    async fn replace_transaction(&self, tx: &TrackedTransaction) -> anyhow::Result<ReplaceResult>;

    /// Release an executor wallet for the next bundle
    async fn mark_wallet_processed(&self, executor: Address);
}
