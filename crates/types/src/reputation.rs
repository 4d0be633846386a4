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

use crate::UserOperationInfo;

/// The reputation ledger for user operation entities
#[cfg_attr(feature = "test-utils", automock)]
pub trait ReputationManager: Send + Sync + 'static {
    /// Credit the entities of an operation that made it on chain
    fn update_user_operation_included_status(
        &self,
        op: &UserOperationInfo,
        entry_point: Address,
        account_deployed: bool,
    );
}
