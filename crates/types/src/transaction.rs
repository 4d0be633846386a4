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

use std::{sync::Arc, time::Instant};

use alloy_primitives::{Address, B256};
use parking_lot::Mutex;

use crate::{GasFees, UserOperationInfo};

/// The EVM request underlying a broadcast bundle transaction.
///
/// Mutable by the replacement machinery: the AA95 path bumps `gas` and
/// `nonce` in place before dispatching a replacement.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BundleTransactionRequest {
    /// The sending executor wallet
    pub from: Address,
    /// The entry point the bundle call targets
    pub to: Address,
    /// Gas limit
    pub gas: u128,
    /// Account nonce
    pub nonce: u64,
    /// EIP-1559 fees
    pub gas_fees: GasFees,
}

/// An actively tracked broadcast bundle transaction.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    /// Current hash of the broadcast
    pub tx_hash: B256,
    /// Ordered history of prior hashes across replacements.
    /// Never contains `tx_hash`.
    pub previous_tx_hashes: Vec<B256>,
    /// The underlying EVM request
    pub tx_request: BundleTransactionRequest,
    /// The user operations bundled in this transaction
    pub ops: Vec<UserOperationInfo>,
    /// The EOA wallet used to send
    pub executor: Address,
    /// Selects the entry-point ABI revision
    pub is_version_06: bool,
    /// When this transaction was last replaced (initially the submission time)
    pub last_replaced: Instant,
    /// How many times a replacement reported the transaction as potentially
    /// already included. Bounded at 3 before the op set is abandoned.
    pub times_potentially_included: u32,
}

impl TransactionInfo {
    /// Wrap this transaction in a shared tracked handle
    pub fn track(self) -> TrackedTransaction {
        Arc::new(Mutex::new(self))
    }
}

/// Shared handle to a tracked transaction.
///
/// The mempool stores one handle per submitted op; all ops of a bundle share
/// the same handle. Locks are short-lived and never held across an await.
pub type TrackedTransaction = Arc<Mutex<TransactionInfo>>;
