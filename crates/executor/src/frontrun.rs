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

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use barge_provider::EvmProvider;
use barge_types::{Mempool, Monitor, UserOperationStatus};
use tokio::{sync::broadcast, task::JoinHandle, time};
use tracing::{error, info, warn};

use crate::{
    emit::{EntryPointEvent, ExecutorEvent},
    receipt::UserOperationReceiptFetcher,
};

/// Watches an operation whose bundle reverted with AA25, deciding between
/// frontrun-inclusion and terminal failure once the chain has advanced past
/// the anchor block.
///
/// Each watcher fires exactly once; its subscription is released when the
/// task ends.
pub(crate) struct FrontrunWatcher<M, P, Mo> {
    pub(crate) op_hash: B256,
    pub(crate) entry_point: Address,
    /// The reverted bundle broadcast that triggered the watch
    pub(crate) tx_hash: B256,
    pub(crate) anchor_block: u64,
    pub(crate) poll_interval: Duration,
    pub(crate) mempool: Arc<M>,
    pub(crate) provider: Arc<P>,
    pub(crate) receipts: Arc<UserOperationReceiptFetcher<P>>,
    pub(crate) monitor: Arc<Mo>,
    pub(crate) event_sender: broadcast::Sender<EntryPointEvent>,
}

impl<M, P, Mo> FrontrunWatcher<M, P, Mo>
where
    M: Mempool,
    P: EvmProvider + 'static,
    Mo: Monitor,
{
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.watch())
    }

    async fn watch(self) {
        let mut timer = time::interval(self.poll_interval);
        loop {
            timer.tick().await;

            let block_number = match self.provider.get_block_number().await {
                Ok(block_number) => block_number,
                Err(e) => {
                    warn!("error polling block number while watching for frontrun: {e:?}");
                    continue;
                }
            };
            if block_number <= self.anchor_block + 1 {
                continue;
            }

            match self.receipts.get_user_operation_receipt(self.op_hash).await {
                Ok(Some(receipt)) => {
                    info!(
                        "user operation {:?} was frontrun and included in {:?}",
                        self.op_hash, receipt.receipt.transaction_hash
                    );
                    self.monitor.set_user_operation_status(
                        self.op_hash,
                        UserOperationStatus::included(receipt.receipt.transaction_hash),
                    );
                    self.emit(ExecutorEvent::frontran_on_chain(
                        self.op_hash,
                        receipt.receipt.transaction_hash,
                    ));
                }
                Ok(None) => {
                    warn!(
                        "user operation {:?} reverted on chain and was not frontrun",
                        self.op_hash
                    );
                    self.monitor.set_user_operation_status(
                        self.op_hash,
                        UserOperationStatus::rejected(Some(self.tx_hash)),
                    );
                    self.emit(ExecutorEvent::failed_on_chain(self.op_hash, self.tx_hash));
                }
                Err(e) => {
                    error!(
                        "failed to reconstruct receipt for {:?} while watching for frontrun, treating as failed: {e:#}",
                        self.op_hash
                    );
                    self.monitor.set_user_operation_status(
                        self.op_hash,
                        UserOperationStatus::rejected(Some(self.tx_hash)),
                    );
                    self.emit(ExecutorEvent::failed_on_chain(self.op_hash, self.tx_hash));
                }
            }

            self.mempool.remove_submitted(self.op_hash).await;
            break;
        }
    }

    fn emit(&self, event: ExecutorEvent) {
        let _ = self.event_sender.send(EntryPointEvent {
            entry_point: self.entry_point,
            event,
        });
    }
}
