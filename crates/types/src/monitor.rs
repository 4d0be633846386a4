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

use alloy_primitives::B256;
#[cfg(feature = "test-utils")]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// User-visible lifecycle state of an operation
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Broadcast in a bundle transaction, awaiting inclusion
    Submitted,
    /// Included on chain
    Included,
    /// Terminally rejected
    Rejected,
}

/// A status update as recorded by the monitor
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct UserOperationStatus {
    /// The lifecycle state
    pub status: OperationStatus,
    /// The transaction associated with the state, if any
    pub transaction_hash: Option<B256>,
}

impl UserOperationStatus {
    /// Status for an operation broadcast in the given transaction
    pub fn submitted(tx_hash: B256) -> Self {
        Self {
            status: OperationStatus::Submitted,
            transaction_hash: Some(tx_hash),
        }
    }

    /// Status for an operation included via the given transaction
    pub fn included(tx_hash: B256) -> Self {
        Self {
            status: OperationStatus::Included,
            transaction_hash: Some(tx_hash),
        }
    }

    /// Status for a rejected operation
    pub fn rejected(tx_hash: Option<B256>) -> Self {
        Self {
            status: OperationStatus::Rejected,
            transaction_hash: tx_hash,
        }
    }
}

/// Records user-visible operation status for the ingress API to serve
#[cfg_attr(feature = "test-utils", automock)]
pub trait Monitor: Send + Sync + 'static {
    /// Record the status of a user operation
    fn set_user_operation_status(&self, op_hash: B256, status: UserOperationStatus);
}
