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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Barge common types

mod aa;
pub use aa::AaCode;

mod bundle;
pub use bundle::{BundleResult, BundlingMode, ReplaceResult};

mod executor;
#[cfg(feature = "test-utils")]
pub use executor::MockBundleExecutor;
pub use executor::BundleExecutor;

mod gas;
#[cfg(feature = "test-utils")]
pub use gas::MockGasOracle;
pub use gas::{GasFees, GasOracle};

mod monitor;
#[cfg(feature = "test-utils")]
pub use monitor::MockMonitor;
pub use monitor::{Monitor, OperationStatus, UserOperationStatus};

mod pool;
#[cfg(feature = "test-utils")]
pub use pool::MockMempool;
pub use pool::{Mempool, SubmittedOperation};

mod reputation;
#[cfg(feature = "test-utils")]
pub use reputation::MockReputationManager;
pub use reputation::ReputationManager;

mod transaction;
pub use transaction::{BundleTransactionRequest, TrackedTransaction, TransactionInfo};

mod user_operation;
pub use user_operation::{UserOperation, UserOperationInfo};
