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

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::{Address, B256};
use anyhow::Context;
use futures_util::future::join_all;
use metrics::Gauge;
use metrics_derive::Metrics;
use parking_lot::Mutex;
use tokio::{
    sync::{broadcast, Mutex as AsyncMutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use barge_provider::EvmProvider;
use barge_types::{
    BundleExecutor, BundleResult, BundlingMode, GasOracle, Mempool, Monitor, ReplaceResult,
    ReputationManager, SubmittedOperation, TrackedTransaction, UserOperationInfo,
    UserOperationStatus,
};
use barge_utils::math;

use crate::{
    emit::{EntryPointEvent, ExecutorEvent},
    frontrun::FrontrunWatcher,
    receipt::UserOperationReceiptFetcher,
    status::{self, BundleStatus, OP_STATUS_SUCCESSFUL},
};

/// Per-batch gas cap used by the periodic bundling tick. `bundle_now` uses
/// the configured `max_gas_limit_per_bundle` instead.
const BUNDLE_TICK_GAS_CAP: u128 = 5_000_000;

/// How long a transaction may sit without replacement before it is
/// considered stuck.
const STUCK_REPLACE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Replacement reports of "potentially already included" tolerated before
/// the op set is abandoned.
const MAX_POTENTIALLY_INCLUDED: u32 = 3;

/// Executor manager settings
#[derive(Clone, Debug)]
pub struct Settings {
    /// The entry points this executor bundles for
    pub entry_points: Vec<Address>,
    /// Initial bundling mode
    pub bundle_mode: BundlingMode,
    /// Frequency of the auto-mode bundling tick
    pub bundler_frequency: Duration,
    /// Poll interval for block watching and receipt retries
    pub polling_interval: Duration,
    /// Gas cap for bundles produced by `bundle_now`
    pub max_gas_limit_per_bundle: u128,
    /// Percent multiplier applied to the gas limit when resubmitting after
    /// an AA95 revert, e.g. 125 for +25%
    pub aa95_resubmit_multiplier: u32,
    /// Limits receipt reconstruction log queries to the trailing block
    /// range, if set
    pub rpc_max_block_range: Option<u64>,
}

/// Errors surfaced by the executor manager
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The mempool had nothing to offer to `bundle_now`
    #[error("no ops to bundle")]
    NoOpsToBundle,
    /// An entry point bundle did not produce a transaction hash
    #[error("no tx hash")]
    NoTxHash,
    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a transaction is being replaced
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReplaceReason {
    GasPrice,
    Aa95,
    Stuck,
}

impl ReplaceReason {
    fn as_str(&self) -> &'static str {
        match self {
            ReplaceReason::GasPrice => "gas_price",
            ReplaceReason::Aa95 => "AA95",
            ReplaceReason::Stuck => "stuck",
        }
    }
}

impl Display for ReplaceReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The executor manager: drives bundling ticks, tracks every broadcast
/// transaction across blocks, and replaces what the network will not
/// include.
pub struct ExecutorManager<M, E, P, O, R, Mo> {
    inner: Arc<Inner<M, E, P, O, R, Mo>>,
}

impl<M, E, P, O, R, Mo> Clone for ExecutorManager<M, E, P, O, R, Mo> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<M, E, P, O, R, Mo> {
    mempool: Arc<M>,
    executor: E,
    provider: Arc<P>,
    gas_oracle: O,
    reputation: R,
    monitor: Arc<Mo>,
    receipts: Arc<UserOperationReceiptFetcher<P>>,
    event_sender: broadcast::Sender<EntryPointEvent>,
    settings: Settings,
    metrics: ExecutorMetrics,
    gauges: ExecutorGauges,
    mode: AsyncMutex<ModeState>,
    block_watcher: Mutex<Option<BlockWatcherHandle>>,
    handling_block: AtomicBool,
}

struct ModeState {
    mode: BundlingMode,
    timer: Option<TimerHandle>,
}

struct TimerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct BlockWatcherHandle {
    cancel: CancellationToken,
    _handle: JoinHandle<()>,
}

impl<M, E, P, O, R, Mo> ExecutorManager<M, E, P, O, R, Mo>
where
    M: Mempool,
    E: BundleExecutor,
    P: EvmProvider + 'static,
    O: GasOracle,
    R: ReputationManager,
    Mo: Monitor,
{
    /// Create a new executor manager
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mempool: M,
        executor: E,
        provider: Arc<P>,
        gas_oracle: O,
        reputation: R,
        monitor: Mo,
        event_sender: broadcast::Sender<EntryPointEvent>,
        settings: Settings,
    ) -> Self {
        let receipts = Arc::new(UserOperationReceiptFetcher::new(
            Arc::clone(&provider),
            settings.entry_points.clone(),
            settings.rpc_max_block_range,
            settings.polling_interval,
        ));
        Self {
            inner: Arc::new(Inner {
                mempool: Arc::new(mempool),
                executor,
                provider,
                gas_oracle,
                reputation,
                monitor: Arc::new(monitor),
                receipts,
                event_sender,
                settings,
                metrics: ExecutorMetrics,
                gauges: ExecutorGauges::default(),
                mode: AsyncMutex::new(ModeState {
                    mode: BundlingMode::Manual,
                    timer: None,
                }),
                block_watcher: Mutex::new(None),
                handling_block: AtomicBool::new(false),
            }),
        }
    }

    /// Apply the configured bundling mode and begin operating
    pub async fn start(&self) {
        self.set_bundling_mode(self.inner.settings.bundle_mode)
            .await;
    }

    /// The receipt fetcher backing this manager
    pub fn receipt_fetcher(&self) -> Arc<UserOperationReceiptFetcher<P>> {
        Arc::clone(&self.inner.receipts)
    }

    // ---- mode controller ----

    /// Switch between periodic auto-bundling and manual triggering.
    /// Idempotent if the mode already matches. The auto timer task is
    /// cancelled and joined on the switch to manual.
    pub async fn set_bundling_mode(&self, mode: BundlingMode) {
        let mut state = self.inner.mode.lock().await;
        if state.mode == mode {
            return;
        }
        state.mode = mode;
        match mode {
            BundlingMode::Manual => {
                if let Some(timer) = state.timer.take() {
                    timer.cancel.cancel();
                    if let Err(e) = timer.handle.await {
                        error!("auto bundling task failed to shut down cleanly: {e:?}");
                    }
                }
                info!("bundling mode set to manual");
            }
            BundlingMode::Auto => {
                let this = self.clone();
                let cancel = CancellationToken::new();
                let token = cancel.clone();
                let frequency = self.inner.settings.bundler_frequency;
                let handle = tokio::spawn(async move {
                    let mut timer = time::interval(frequency);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            // a tick runs to completion before the next fires
                            _ = timer.tick() => this.bundle().await,
                        }
                    }
                });
                state.timer = Some(TimerHandle { cancel, handle });
                info!("bundling mode set to auto");
            }
        }
    }

    #[cfg(test)]
    async fn timer_active(&self) -> bool {
        self.inner.mode.lock().await.timer.is_some()
    }

    // ---- bundling loop ----

    /// One bundling tick: drain the mempool into batches and dispatch every
    /// batch to the executor, all in parallel.
    #[instrument(skip_all)]
    pub async fn bundle(&self) {
        let mut batches = Vec::new();
        loop {
            let batch = self.inner.mempool.process(BUNDLE_TICK_GAS_CAP, 1).await;
            if batch.is_empty() {
                break;
            }
            batches.push(batch);
        }

        join_all(batches.into_iter().map(|batch| self.send_batch(batch))).await;
    }

    /// External one-shot trigger: bundle whatever the mempool offers right
    /// now and return the resulting transaction hashes.
    #[instrument(skip_all)]
    pub async fn bundle_now(&self) -> Result<Vec<B256>, ExecutorError> {
        let ops = self
            .inner
            .mempool
            .process(self.inner.settings.max_gas_limit_per_bundle, 1)
            .await;
        if ops.is_empty() {
            return Err(ExecutorError::NoOpsToBundle);
        }

        let mut by_entry_point: HashMap<Address, Vec<UserOperationInfo>> = HashMap::new();
        for op in ops {
            by_entry_point.entry(op.entry_point).or_default().push(op);
        }

        let results = join_all(
            by_entry_point
                .into_iter()
                .map(|(entry_point, ops)| async move {
                    self.send_to_executor(entry_point, ops).await
                }),
        )
        .await;

        let mut tx_hashes = Vec::new();
        for result in results {
            match result? {
                Some(tx_hash) => tx_hashes.push(tx_hash),
                None => return Err(ExecutorError::NoTxHash),
            }
        }
        Ok(tx_hashes)
    }

    async fn send_batch(&self, batch: Vec<UserOperationInfo>) {
        let mut by_entry_point: HashMap<Address, Vec<UserOperationInfo>> = HashMap::new();
        for op in batch {
            by_entry_point.entry(op.entry_point).or_default().push(op);
        }

        let sends: Vec<_> = self
            .inner
            .settings
            .entry_points
            .iter()
            .map(|&entry_point| (entry_point, by_entry_point.remove(&entry_point)))
            .collect();
        for entry_point in by_entry_point.keys() {
            warn!("dropping ops targeting unconfigured entry point {entry_point:?}");
        }

        join_all(sends.into_iter().map(|(entry_point, ops)| async move {
            let Some(ops) = ops else {
                warn!("no user operations to bundle for entry point {entry_point:?}");
                return;
            };
            if let Err(e) = self.send_to_executor(entry_point, ops).await {
                error!("failed to dispatch bundle for entry point {entry_point:?}: {e:#}");
            }
        }))
        .await;
    }

    /// Dispatch a set of ops for one entry point to the executor and apply
    /// the per-op results. Returns the transaction hash of the broadcast, if
    /// any op made it in.
    async fn send_to_executor(
        &self,
        entry_point: Address,
        ops: Vec<UserOperationInfo>,
    ) -> anyhow::Result<Option<B256>> {
        let op_count = ops.len();
        let (compressed, uncompressed): (Vec<_>, Vec<_>) =
            ops.into_iter().partition(|op| op.compressed);

        let mut results = Vec::new();
        if !uncompressed.is_empty() {
            let bundle = self
                .inner
                .executor
                .bundle(entry_point, uncompressed)
                .await
                .context("executor should bundle user operations")?;
            self.record_bundle_submitted(entry_point, &bundle);
            results.extend(bundle);
        }
        if !compressed.is_empty() {
            let bundle = self
                .inner
                .executor
                .bundle_compressed(entry_point, compressed)
                .await
                .context("executor should bundle compressed user operations")?;
            self.record_bundle_submitted(entry_point, &bundle);
            results.extend(bundle);
        }

        if results.len() < op_count {
            let filtered = (op_count - results.len()) as u64;
            warn!("{filtered} op(s) filtered out during bundling for entry point {entry_point:?}");
            self.inner.metrics.increment_ops_submitted("filtered", filtered);
        }

        let mut tx_hash = None;
        for result in results {
            match result {
                BundleResult::Success { op, tx } => {
                    let hash = tx.lock().tx_hash;
                    self.inner.mempool.mark_submitted(op.hash, tx).await;
                    self.inner
                        .monitor
                        .set_user_operation_status(op.hash, UserOperationStatus::submitted(hash));
                    self.start_watching_blocks();
                    self.inner.metrics.increment_ops_submitted("success", 1);
                    tx_hash = Some(hash);
                }
                BundleResult::Failure { op_hash, reason, .. } => {
                    warn!("user operation {op_hash:?} rejected during bundling: {reason}");
                    self.inner.mempool.remove_processing(op_hash).await;
                    self.emit(entry_point, ExecutorEvent::dropped_op(op_hash, reason));
                    self.inner
                        .monitor
                        .set_user_operation_status(op_hash, UserOperationStatus::rejected(None));
                    self.inner.metrics.increment_ops_submitted("failed", 1);
                }
                BundleResult::Resubmit {
                    op_hash,
                    op,
                    entry_point: op_entry_point,
                    reason,
                } => {
                    info!("user operation {op_hash:?} returned to mempool: {reason}");
                    self.inner.mempool.remove_processing(op_hash).await;
                    self.inner.mempool.add(op, op_entry_point).await;
                    self.inner.metrics.increment_ops_resubmitted(1);
                }
            }
        }
        Ok(tx_hash)
    }

    fn record_bundle_submitted(&self, entry_point: Address, results: &[BundleResult]) {
        let all_success = results
            .iter()
            .all(|r| matches!(r, BundleResult::Success { .. }));
        self.inner
            .metrics
            .increment_bundles_submitted(if all_success { "success" } else { "failed" });

        let tx_hash = results.iter().find_map(|r| match r {
            BundleResult::Success { tx, .. } => Some(tx.lock().tx_hash),
            _ => None,
        });
        let op_hashes = results
            .iter()
            .map(|r| match r {
                BundleResult::Success { op, .. } => op.hash,
                BundleResult::Failure { op_hash, .. }
                | BundleResult::Resubmit { op_hash, .. } => *op_hash,
            })
            .collect();
        self.emit(
            entry_point,
            ExecutorEvent::bundle_submitted(tx_hash, op_hashes),
        );
    }

    // ---- block subscription ----

    /// Begin watching for new blocks. No-op if a subscription is already
    /// active.
    fn start_watching_blocks(&self) {
        let mut watcher = self.inner.block_watcher.lock();
        if watcher.is_some() {
            return;
        }

        let this = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poll_interval = self.inner.settings.polling_interval;
        let handle = tokio::spawn(async move {
            let mut last_block = None;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = time::sleep(poll_interval) => {}
                }
                match this.inner.provider.get_block_number().await {
                    Ok(block_number) if last_block != Some(block_number) => {
                        last_block = Some(block_number);
                        this.handle_block(block_number).await;
                    }
                    Ok(_) => {}
                    // leave the subscription up; the next poll retries
                    Err(e) => warn!("error watching blocks: {e:?}"),
                }
            }
        });
        *watcher = Some(BlockWatcherHandle {
            cancel,
            _handle: handle,
        });
        debug!("started watching blocks");
    }

    /// Tear down the block subscription. It is reopened on the next
    /// successful submission.
    fn stop_watching_blocks(&self) {
        if let Some(watcher) = self.inner.block_watcher.lock().take() {
            watcher.cancel.cancel();
            debug!("stopped watching blocks");
        }
    }

    #[cfg(test)]
    fn is_watching_blocks(&self) -> bool {
        self.inner.block_watcher.lock().is_some()
    }

    // ---- block handler ----

    /// Handle a new block: refresh the status of every tracked transaction,
    /// then replace anything underpriced or stuck. Overlapping notifications
    /// are coalesced; every tick re-reads authoritative state.
    async fn handle_block(&self, block_number: u64) {
        let Some(_guard) = BlockGuard::try_acquire(&self.inner.handling_block) else {
            return;
        };
        if let Err(e) = self.handle_block_inner(block_number).await {
            error!("error handling block {block_number}: {e:#}");
        }
    }

    async fn handle_block_inner(&self, block_number: u64) -> anyhow::Result<()> {
        let submitted = self.inner.mempool.dump_submitted_ops().await;
        if submitted.is_empty() {
            self.stop_watching_blocks();
            return Ok(());
        }

        let transactions = distinct_transactions(&submitted);
        self.inner
            .gauges
            .tracked_transactions
            .set(transactions.len() as f64);
        debug!(
            "handling block {block_number} with {} tracked transaction(s)",
            transactions.len()
        );

        let refreshes = transactions
            .iter()
            .map(|tx| self.refresh_transaction_status(block_number, tx));
        for result in join_all(refreshes).await {
            if let Err(e) = result {
                error!("error refreshing transaction status: {e:#}");
            }
        }

        match self.inner.gas_oracle.get_gas_price().await {
            Ok(gas_price) => {
                for tx in distinct_transactions(&self.inner.mempool.dump_submitted_ops().await) {
                    let fees = tx.lock().tx_request.gas_fees;
                    if fees.max_fee_per_gas < gas_price.max_fee_per_gas
                        || fees.max_priority_fee_per_gas < gas_price.max_priority_fee_per_gas
                    {
                        self.replace_transaction(&tx, ReplaceReason::GasPrice).await;
                    }
                }
            }
            Err(e) => warn!("failed to fetch gas price, skipping gas price replacements: {e:#}"),
        }

        for tx in distinct_transactions(&self.inner.mempool.dump_submitted_ops().await) {
            let last_replaced = tx.lock().last_replaced;
            if last_replaced.elapsed() >= STUCK_REPLACE_INTERVAL {
                self.replace_transaction(&tx, ReplaceReason::Stuck).await;
            }
        }

        Ok(())
    }

    // ---- transaction status resolution ----

    /// Resolve the on-chain state of one tracked transaction across its
    /// candidate hashes and apply the consequences.
    async fn refresh_transaction_status(
        &self,
        block_number: u64,
        tx: &TrackedTransaction,
    ) -> anyhow::Result<()> {
        let (candidates, ops, executor_wallet, entry_point, is_version_06) = {
            let tx_info = tx.lock();
            let mut candidates = vec![tx_info.tx_hash];
            candidates.extend(tx_info.previous_tx_hashes.iter().copied());
            (
                candidates,
                tx_info.ops.clone(),
                tx_info.executor,
                tx_info.tx_request.to,
                tx_info.is_version_06,
            )
        };

        let mut statuses = join_all(candidates.into_iter().map(|hash| async move {
            match status::fetch_bundle_status(
                &*self.inner.provider,
                entry_point,
                hash,
                is_version_06,
            )
            .await
            {
                Ok(bundle_status) => (hash, bundle_status),
                Err(e) => {
                    warn!("failed to fetch bundle status for {hash:?}: {e:?}");
                    (hash, BundleStatus::NotFound)
                }
            }
        }))
        .await;

        // `included` wins over `reverted`, both in candidate order
        let resolved = statuses
            .iter()
            .position(|(_, s)| matches!(s, BundleStatus::Included { .. }))
            .or_else(|| {
                statuses
                    .iter()
                    .position(|(_, s)| matches!(s, BundleStatus::Reverted { .. }))
            });
        let Some(index) = resolved else {
            for op in &ops {
                debug!("user operation {:?} still pending", op.hash);
            }
            return Ok(());
        };
        let (tx_hash, bundle_status) = statuses.swap_remove(index);

        match bundle_status {
            BundleStatus::NotFound => unreachable!("resolved status is never not_found"),
            BundleStatus::Included { outcomes } => {
                self.inner
                    .metrics
                    .increment_ops_on_chain("included", ops.len() as u64);
                for op in &ops {
                    self.inner
                        .metrics
                        .observe_inclusion_duration(op.first_submitted.elapsed().as_secs_f64());
                    self.inner.mempool.remove_submitted(op.hash).await;

                    let Some(outcome) = outcomes.get(&op.hash) else {
                        warn!(
                            "user operation {:?} missing from outcomes of included bundle {tx_hash:?}",
                            op.hash
                        );
                        continue;
                    };
                    self.inner.reputation.update_user_operation_included_status(
                        op,
                        entry_point,
                        outcome.account_deployed,
                    );
                    if outcome.status == OP_STATUS_SUCCESSFUL {
                        info!("user operation {:?} included in {tx_hash:?}", op.hash);
                        self.emit(entry_point, ExecutorEvent::included_on_chain(op.hash, tx_hash));
                    } else {
                        info!(
                            "user operation {:?} included in {tx_hash:?} but execution reverted",
                            op.hash
                        );
                        self.emit(
                            entry_point,
                            ExecutorEvent::execution_reverted_on_chain(
                                op.hash,
                                tx_hash,
                                outcome.revert_reason.clone(),
                            ),
                        );
                    }
                    self.inner
                        .monitor
                        .set_user_operation_status(op.hash, UserOperationStatus::included(tx_hash));
                }
                self.inner.executor.mark_wallet_processed(executor_wallet).await;
            }
            BundleStatus::Reverted { aa95: true, .. } => {
                self.inner
                    .metrics
                    .increment_ops_on_chain("reverted", ops.len() as u64);
                info!("transaction {tx_hash:?} reverted with AA95, bumping gas and replacing");
                {
                    let mut tx_info = tx.lock();
                    tx_info.tx_request.gas = math::percent(
                        tx_info.tx_request.gas,
                        self.inner.settings.aa95_resubmit_multiplier,
                    );
                    tx_info.tx_request.nonce += 1;
                }
                // the ops leave `submitted` before the replacement dispatch so
                // no status refresh can observe the mutation mid-flight
                for op in &ops {
                    self.inner.mempool.remove_submitted(op.hash).await;
                }
                self.replace_transaction(tx, ReplaceReason::Aa95).await;
            }
            BundleStatus::Reverted { reason: Some(reason), .. } if reason.contains("AA25") => {
                self.inner
                    .metrics
                    .increment_ops_on_chain("reverted", ops.len() as u64);
                // likely frontrun; the watcher owns the terminal transition
                for op in &ops {
                    info!(
                        "user operation {:?} reverted with AA25, watching for frontrun",
                        op.hash
                    );
                    FrontrunWatcher {
                        op_hash: op.hash,
                        entry_point,
                        tx_hash,
                        anchor_block: block_number,
                        poll_interval: self.inner.settings.polling_interval,
                        mempool: Arc::clone(&self.inner.mempool),
                        provider: Arc::clone(&self.inner.provider),
                        receipts: Arc::clone(&self.inner.receipts),
                        monitor: Arc::clone(&self.inner.monitor),
                        event_sender: self.inner.event_sender.clone(),
                    }
                    .spawn();
                }
            }
            BundleStatus::Reverted { reason, .. } => {
                self.inner
                    .metrics
                    .increment_ops_on_chain("reverted", ops.len() as u64);
                for op in &ops {
                    warn!(
                        "user operation {:?} failed on chain in {tx_hash:?}: {}",
                        op.hash,
                        reason.as_deref().unwrap_or("unknown revert")
                    );
                    self.inner.mempool.remove_submitted(op.hash).await;
                    self.inner.monitor.set_user_operation_status(
                        op.hash,
                        UserOperationStatus::rejected(Some(tx_hash)),
                    );
                    self.emit(entry_point, ExecutorEvent::failed_on_chain(op.hash, tx_hash));
                }
                self.inner.executor.mark_wallet_processed(executor_wallet).await;
            }
        }

        Ok(())
    }

    // ---- replacement policy ----

    /// Replace a broadcast transaction, applying the executor's verdict to
    /// the op set.
    async fn replace_transaction(&self, tx: &TrackedTransaction, reason: ReplaceReason) {
        let result = self.inner.executor.replace_transaction(tx).await;
        let status = match &result {
            Ok(ReplaceResult::Failed) | Err(_) => "failed",
            Ok(ReplaceResult::PotentiallyAlreadyIncluded) => "potentially_already_included",
            Ok(ReplaceResult::Replaced { .. }) => "replaced",
        };
        self.inner
            .metrics
            .increment_replaced_transactions(reason.as_str(), status);

        let ops = tx.lock().ops.clone();
        match result {
            Err(e) => {
                // left under observation; the next tick retries
                error!("failed to dispatch {reason} replacement: {e:#}");
            }
            Ok(ReplaceResult::Failed) => {
                warn!(
                    "replacement ({reason}) failed for transaction {:?}, abandoning op set",
                    tx.lock().tx_hash
                );
                for op in &ops {
                    self.inner.mempool.remove_submitted(op.hash).await;
                }
            }
            Ok(ReplaceResult::PotentiallyAlreadyIncluded) => {
                let (times, executor_wallet) = {
                    let mut tx_info = tx.lock();
                    tx_info.times_potentially_included += 1;
                    (tx_info.times_potentially_included, tx_info.executor)
                };
                if times >= MAX_POTENTIALLY_INCLUDED {
                    info!(
                        "transaction {:?} potentially included {times} time(s), abandoning op set",
                        tx.lock().tx_hash
                    );
                    for op in &ops {
                        self.inner.mempool.remove_submitted(op.hash).await;
                    }
                    self.inner.executor.mark_wallet_processed(executor_wallet).await;
                }
            }
            Ok(ReplaceResult::Replaced { tx: new_tx }) => {
                let new_hashes: HashSet<B256> =
                    new_tx.lock().ops.iter().map(|op| op.hash).collect();
                for op in ops {
                    if new_hashes.contains(&op.hash) {
                        self.inner
                            .mempool
                            .replace_submitted(op, Arc::clone(&new_tx))
                            .await;
                    } else {
                        warn!(
                            "user operation {:?} dropped from {reason} replacement",
                            op.hash
                        );
                        self.inner.mempool.remove_submitted(op.hash).await;
                    }
                }
                info!(
                    "replaced transaction ({reason}) with {:?}",
                    new_tx.lock().tx_hash
                );
            }
        }
    }

    fn emit(&self, entry_point: Address, event: ExecutorEvent) {
        let _ = self.inner.event_sender.send(EntryPointEvent { entry_point, event });
    }
}

/// The distinct tracked transactions across a `submitted` snapshot.
fn distinct_transactions(submitted: &[SubmittedOperation]) -> Vec<TrackedTransaction> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for submitted_op in submitted {
        if seen.insert(Arc::as_ptr(&submitted_op.tx)) {
            out.push(Arc::clone(&submitted_op.tx));
        }
    }
    out
}

/// Single-flight guard for block handling. The flag is released on every
/// exit path via `Drop`.
struct BlockGuard<'a>(&'a AtomicBool);

impl<'a> BlockGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then_some(Self(flag))
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug)]
struct ExecutorMetrics;

impl ExecutorMetrics {
    fn increment_bundles_submitted(&self, status: &'static str) {
        metrics::counter!("executor_bundles_submitted", "status" => status).increment(1);
    }

    fn increment_ops_submitted(&self, status: &'static str, count: u64) {
        metrics::counter!("executor_user_operations_submitted", "status" => status)
            .increment(count);
    }

    fn increment_ops_resubmitted(&self, count: u64) {
        metrics::counter!("executor_user_operations_resubmitted").increment(count);
    }

    fn increment_ops_on_chain(&self, status: &'static str, count: u64) {
        metrics::counter!("executor_user_operations_on_chain", "status" => status)
            .increment(count);
    }

    fn observe_inclusion_duration(&self, seconds: f64) {
        metrics::histogram!("executor_user_operation_inclusion_duration_seconds").record(seconds);
    }

    fn increment_replaced_transactions(&self, reason: &'static str, status: &'static str) {
        metrics::counter!("executor_replaced_transactions", "reason" => reason, "status" => status)
            .increment(1);
    }
}

#[derive(Metrics)]
#[metrics(scope = "executor")]
struct ExecutorGauges {
    #[metric(describe = "the number of bundle transactions currently being tracked.")]
    tracked_transactions: Gauge,
}
