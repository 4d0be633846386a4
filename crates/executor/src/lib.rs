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

//! Executor manager for the Barge bundler.
//!
//! Drains the mempool into per-entry-point bundles, dispatches them to the
//! low-level bundle executor, tracks every broadcast transaction across
//! blocks, and drives replacement until each user operation reaches a
//! terminal state.

mod emit;
pub use emit::{
    log_executor_events, EntryPointEvent, ExecutorEvent, EVENT_CHANNEL_CAPACITY,
};

mod frontrun;

mod manager;
pub use manager::{ExecutorError, ExecutorManager, Settings};

mod receipt;
pub use receipt::{
    BundleTransactionReceipt, ReceiptLog, UserOperationReceipt, UserOperationReceiptFetcher,
};

mod status;

#[cfg(test)]
mod test_utils;
