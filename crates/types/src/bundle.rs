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
use serde::{Deserialize, Serialize};

use crate::{TrackedTransaction, UserOperationInfo};

/// Bundling mode of the executor manager
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundlingMode {
    /// Manual bundling mode: bundles are only sent on explicit trigger
    Manual,
    /// Auto bundling mode: bundles are sent on a periodic tick
    Auto,
}

/// Per-operation outcome of a bundle submission
#[derive(Debug, Clone)]
pub enum BundleResult {
    /// The operation was included in a broadcast transaction
    Success {
        /// The submitted operation
        op: UserOperationInfo,
        /// The transaction carrying it
        tx: TrackedTransaction,
    },
    /// The operation was rejected and should be dropped
    Failure {
        /// Hash of the rejected operation
        op_hash: B256,
        /// The rejected operation
        op: UserOperationInfo,
        /// Rejection reason, typically an entry point revert message
        reason: String,
    },
    /// The operation should be returned to the mempool and retried later
    Resubmit {
        /// Hash of the operation
        op_hash: B256,
        /// The operation
        op: UserOperationInfo,
        /// Entry point to re-add the operation at
        entry_point: Address,
        /// Why the operation is being resubmitted
        reason: String,
    },
}

/// Outcome of a transaction replacement attempt
#[derive(Debug, Clone)]
pub enum ReplaceResult {
    /// The replacement could not be sent
    Failed,
    /// The original transaction may already have been included; the
    /// replacement was not sent
    PotentiallyAlreadyIncluded,
    /// The transaction was replaced
    Replaced {
        /// The replacement transaction
        tx: TrackedTransaction,
    },
}
