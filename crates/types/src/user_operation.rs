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

use std::time::Instant;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A user operation payload.
///
/// The executor treats the payload as opaque: it is carried through to the
/// low-level bundle executor and into emitted events, but never simulated or
/// validated here.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender smart account address
    pub sender: Address,
    /// Anti-replay nonce
    pub nonce: U256,
    /// Execution calldata
    pub call_data: Bytes,
    /// Gas limit for the execution phase
    pub call_gas_limit: u128,
    /// Gas limit for the verification phase
    pub verification_gas_limit: u128,
    /// Gas to compensate the bundler for pre-verification work
    pub pre_verification_gas: u128,
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: u128,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: u128,
    /// Account signature over the operation
    pub signature: Bytes,
}

/// A user operation tracked by the executor, with submission metadata.
#[derive(Debug, Clone)]
pub struct UserOperationInfo {
    /// The operation payload
    pub op: UserOperation,
    /// Hash of the operation at its entry point
    pub hash: B256,
    /// The entry point this operation targets
    pub entry_point: Address,
    /// When this operation was first handed to the executor
    pub first_submitted: Instant,
    /// Whether this operation was received in its compressed form
    pub compressed: bool,
}

impl UserOperationInfo {
    /// Create a new operation info, stamped with the current time
    pub fn new(op: UserOperation, hash: B256, entry_point: Address, compressed: bool) -> Self {
        Self {
            op,
            hash,
            entry_point,
            first_submitted: Instant::now(),
            compressed,
        }
    }
}
