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

use std::{fmt::Display, sync::Arc};

use alloy_primitives::{Address, Bytes, B256};
use barge_types::AaCode;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Capacity of the executor event channel. An event can carry a bundle's op
/// hashes or a revert payload, in the tens of kilobytes at most, so the
/// channel stays well under a few megabytes.
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// An executor event, tagged with the entry point that produced it.
#[derive(Clone, Debug)]
pub struct EntryPointEvent {
    /// Entry point associated with the event
    pub entry_point: Address,
    /// The event itself
    pub event: ExecutorEvent,
}

impl Display for EntryPointEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}    Entry point: {:?}", self.event, self.entry_point)
    }
}

/// Subscribe to executor events and log each at INFO level. The task ends
/// when every sender has been dropped.
pub fn log_executor_events(mut rx: broadcast::Receiver<EntryPointEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!("{event}"),
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(count)) => {
                    warn!("executor event subscriber lagged, missed {count} event(s)")
                }
            }
        }
    })
}

/// Executor event
#[derive(Clone, Debug)]
pub enum ExecutorEvent {
    /// A bundle was handed to the executor for broadcast
    BundleSubmitted {
        /// Transaction carrying the bundle. `None` when no op in the bundle
        /// made it into a broadcast.
        tx_hash: Option<B256>,
        /// Hashes of the operations offered in the bundle
        op_hashes: Arc<Vec<B256>>,
    },
    /// An operation was rejected during bundling and dropped
    DroppedOp {
        /// Operation hash
        op_hash: B256,
        /// Classified entry point revert code
        code: AaCode,
        /// Raw rejection reason
        reason: Arc<String>,
    },
    /// An operation was included on chain and executed successfully
    IncludedOnChain {
        /// Operation hash
        op_hash: B256,
        /// Transaction the operation was included in
        tx_hash: B256,
    },
    /// An operation was included on chain but its execution reverted
    ExecutionRevertedOnChain {
        /// Operation hash
        op_hash: B256,
        /// Transaction the operation was included in
        tx_hash: B256,
        /// Revert payload emitted by the entry point, if any
        revert_reason: Option<Bytes>,
    },
    /// An operation failed on chain and left the executor terminally
    FailedOnChain {
        /// Operation hash
        op_hash: B256,
        /// The failed bundle transaction
        tx_hash: B256,
    },
    /// An operation was included by another bundler's transaction
    FrontranOnChain {
        /// Operation hash
        op_hash: B256,
        /// The transaction that frontran ours
        tx_hash: B256,
    },
}

impl ExecutorEvent {
    pub(crate) fn bundle_submitted(tx_hash: Option<B256>, op_hashes: Vec<B256>) -> Self {
        Self::BundleSubmitted {
            tx_hash,
            op_hashes: Arc::new(op_hashes),
        }
    }

    pub(crate) fn dropped_op(op_hash: B256, reason: String) -> Self {
        Self::DroppedOp {
            op_hash,
            code: AaCode::from_reason(&reason),
            reason: Arc::new(reason),
        }
    }

    pub(crate) fn included_on_chain(op_hash: B256, tx_hash: B256) -> Self {
        Self::IncludedOnChain { op_hash, tx_hash }
    }

    pub(crate) fn execution_reverted_on_chain(
        op_hash: B256,
        tx_hash: B256,
        revert_reason: Option<Bytes>,
    ) -> Self {
        Self::ExecutionRevertedOnChain {
            op_hash,
            tx_hash,
            revert_reason,
        }
    }

    pub(crate) fn failed_on_chain(op_hash: B256, tx_hash: B256) -> Self {
        Self::FailedOnChain { op_hash, tx_hash }
    }

    pub(crate) fn frontran_on_chain(op_hash: B256, tx_hash: B256) -> Self {
        Self::FrontranOnChain { op_hash, tx_hash }
    }
}

impl Display for ExecutorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorEvent::BundleSubmitted { tx_hash, op_hashes } => {
                let op_hashes = op_hashes
                    .iter()
                    .map(|hash| format!("{hash:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                match tx_hash {
                    Some(tx_hash) => write!(
                        f,
                        "Bundle submitted!    Transaction hash: {tx_hash:?}    Op hashes: {op_hashes}"
                    ),
                    None => write!(
                        f,
                        "Bundle produced no transaction.    Op hashes: {op_hashes}"
                    ),
                }
            }
            ExecutorEvent::DroppedOp {
                op_hash,
                code,
                reason,
            } => {
                write!(
                    f,
                    "Op dropped during bundling.    Op hash: {op_hash:?}    Code: {code}    Reason: {reason}"
                )
            }
            ExecutorEvent::IncludedOnChain { op_hash, tx_hash } => {
                write!(
                    f,
                    "Op included on chain!    Op hash: {op_hash:?}    Transaction hash: {tx_hash:?}"
                )
            }
            ExecutorEvent::ExecutionRevertedOnChain {
                op_hash,
                tx_hash,
                revert_reason,
            } => {
                write!(
                    f,
                    "Op included on chain but execution reverted.    Op hash: {op_hash:?}    Transaction hash: {tx_hash:?}    Revert reason: {revert_reason:?}"
                )
            }
            ExecutorEvent::FailedOnChain { op_hash, tx_hash } => {
                write!(
                    f,
                    "Op failed on chain.    Op hash: {op_hash:?}    Transaction hash: {tx_hash:?}"
                )
            }
            ExecutorEvent::FrontranOnChain { op_hash, tx_hash } => {
                write!(
                    f,
                    "Op frontran by another bundler.    Op hash: {op_hash:?}    Transaction hash: {tx_hash:?}"
                )
            }
        }
    }
}
