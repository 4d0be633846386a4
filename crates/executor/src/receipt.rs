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

//! Reconstruction of user operation receipts from chain logs.

use std::{sync::Arc, time::Duration};

use alloy_consensus::Transaction as TransactionTrait;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;
use anyhow::{bail, Context};
use barge_contracts::v0_6::IEntryPoint::{UserOperationEvent, UserOperationRevertReason};
use barge_provider::{EvmProvider, Filter, Log, TransactionReceipt};
use serde::{Deserialize, Serialize};
use tokio::time;
use tracing::debug;

/// A user operation receipt reconstructed from chain state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    /// Hash of the user operation
    pub user_op_hash: B256,
    /// Entry point that executed the operation
    pub entry_point: Address,
    /// Sender smart account
    pub sender: Address,
    /// Operation nonce
    pub nonce: U256,
    /// Paymaster that sponsored the operation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Gas used by the operation
    pub actual_gas_used: U256,
    /// Gas cost paid for the operation
    pub actual_gas_cost: U256,
    /// Whether the operation's execution succeeded
    pub success: bool,
    /// Revert payload for reverted executions, if emitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The logs the operation emitted
    pub logs: Vec<ReceiptLog>,
    /// The receipt of the bundle transaction that carried the operation
    pub receipt: BundleTransactionReceipt,
}

/// A fully-anchored log, as served in a user operation receipt.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLog {
    /// Emitting contract
    pub address: Address,
    /// Log topics
    pub topics: Vec<B256>,
    /// Log data
    pub data: Bytes,
    /// Hash of the block containing the log
    pub block_hash: B256,
    /// Number of the block containing the log
    pub block_number: u64,
    /// Hash of the transaction that emitted the log
    pub transaction_hash: B256,
    /// Index of the transaction within its block
    pub transaction_index: u64,
    /// Index of the log within its block
    pub log_index: u64,
}

impl TryFrom<&Log> for ReceiptLog {
    type Error = anyhow::Error;

    fn try_from(log: &Log) -> Result<Self, Self::Error> {
        Ok(Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.inner.data.data.clone(),
            block_hash: log.block_hash.context("log is missing blockHash")?,
            block_number: log.block_number.context("log is missing blockNumber")?,
            transaction_hash: log
                .transaction_hash
                .context("log is missing transactionHash")?,
            transaction_index: log
                .transaction_index
                .context("log is missing transactionIndex")?,
            log_index: log.log_index.context("log is missing logIndex")?,
        })
    }
}

/// The receipt of a bundle transaction, with `status` normalised to `1|0`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleTransactionReceipt {
    /// Transaction hash
    pub transaction_hash: B256,
    /// Index of the transaction within its block
    pub transaction_index: u64,
    /// Hash of the containing block
    pub block_hash: B256,
    /// Number of the containing block
    pub block_number: u64,
    /// Transaction sender
    pub from: Address,
    /// Transaction target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Gas used by the transaction
    pub gas_used: u128,
    /// Effective gas price paid
    pub effective_gas_price: u128,
    /// Contract created by the transaction, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// `1` for success, `0` for revert
    pub status: u8,
    /// All logs of the transaction
    pub logs: Vec<ReceiptLog>,
}

/// Rebuilds user operation receipts from entry point logs.
#[derive(Debug)]
pub struct UserOperationReceiptFetcher<P> {
    provider: Arc<P>,
    entry_points: Vec<Address>,
    /// Limits the `eth_getLogs` query to the trailing block range, if set
    max_block_range: Option<u64>,
    receipt_poll_interval: Duration,
}

impl<P: EvmProvider> UserOperationReceiptFetcher<P> {
    /// Create a new receipt fetcher for a set of entry points
    pub fn new(
        provider: Arc<P>,
        entry_points: Vec<Address>,
        max_block_range: Option<u64>,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            entry_points,
            max_block_range,
            receipt_poll_interval,
        }
    }

    /// Rebuild the receipt of a user operation from its on-chain
    /// `UserOperationEvent`, or return `None` if the operation is not (yet)
    /// included.
    ///
    /// Since there are potentially many user operations in a transaction,
    /// the logs belonging to this operation are the ones sandwiched between
    /// the previous operation's event and ours, exclusive of both.
    pub async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> anyhow::Result<Option<UserOperationReceipt>> {
        let Some(event_log) = self.get_event_by_hash(user_op_hash).await? else {
            return Ok(None);
        };

        // every decoded field must be present
        let event = event_log
            .log_decode::<UserOperationEvent>()
            .context("log should be a user operation event")?
            .inner
            .data;

        // a null transaction hash means the op is still pending
        let Some(tx_hash) = event_log.transaction_hash else {
            return Ok(None);
        };

        let tx_receipt = loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => break receipt,
                Ok(None) => {
                    debug!("receipt for {tx_hash:?} not available yet, retrying");
                    time::sleep(self.receipt_poll_interval).await;
                }
                Err(e) => return Err(e).context("should have fetched tx receipt"),
            }
        };
        if tx_receipt.block_hash.is_none() && tx_receipt.block_number.is_none() {
            return Ok(None);
        }

        let mut effective_gas_price = tx_receipt.effective_gas_price;
        if effective_gas_price == 0 {
            if let Some(tx) = self.provider.get_transaction_by_hash(tx_hash).await? {
                effective_gas_price = tx
                    .inner
                    .gas_price()
                    .unwrap_or_else(|| tx.inner.max_fee_per_gas());
            }
        }

        let logs = tx_receipt.inner.logs();

        // a log with missing topology means the chain view is not settled
        if logs.iter().any(|l| {
            l.block_hash.is_none()
                || l.block_number.is_none()
                || l.transaction_hash.is_none()
                || l.transaction_index.is_none()
                || l.log_index.is_none()
                || l.topics().is_empty()
        }) {
            return Ok(None);
        }

        let mut start_index: Option<usize> = None;
        let mut end_index: Option<usize> = None;
        let mut entry_point = event_log.address();
        let mut revert_reason: Option<Bytes> = None;

        for (i, log) in logs.iter().enumerate() {
            let topics = log.topics();
            if topics[0] == UserOperationEvent::SIGNATURE_HASH {
                if topics.get(1) == Some(&user_op_hash) {
                    end_index = Some(i);
                    entry_point = log.address();
                } else if end_index.is_none() {
                    // most recent prior op boundary before ours
                    start_index = Some(i);
                }
            }
            if topics[0] == UserOperationRevertReason::SIGNATURE_HASH
                && topics.get(1) == Some(&user_op_hash)
            {
                if let Ok(decoded) = log.log_decode::<UserOperationRevertReason>() {
                    revert_reason = Some(decoded.inner.data.revertReason);
                }
            }
        }

        let Some(end_index) = end_index else {
            bail!("no UserOperationEvent in logs");
        };
        let start = start_index.map_or(0, |i| i + 1);
        let op_logs = logs[start..end_index]
            .iter()
            .map(ReceiptLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let receipt = build_bundle_receipt(&tx_receipt, effective_gas_price)?;

        Ok(Some(UserOperationReceipt {
            user_op_hash,
            entry_point,
            sender: event.sender,
            nonce: event.nonce,
            paymaster: (event.paymaster != Address::ZERO).then_some(event.paymaster),
            actual_gas_used: event.actualGasUsed,
            actual_gas_cost: event.actualGasCost,
            success: event.success,
            reason: revert_reason.map(|r| r.to_string()),
            logs: op_logs,
            receipt,
        }))
    }

    async fn get_event_by_hash(&self, user_op_hash: B256) -> anyhow::Result<Option<Log>> {
        let to_block = self.provider.get_block_number().await?;
        let from_block = match self.max_block_range {
            Some(range) => to_block.saturating_sub(range),
            None => 0,
        };

        let filter = Filter::new()
            .address(self.entry_points.clone())
            .event_signature(UserOperationEvent::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block)
            .topic1(user_op_hash);

        Ok(self.provider.get_logs(&filter).await?.into_iter().next())
    }
}

fn build_bundle_receipt(
    tx_receipt: &TransactionReceipt,
    effective_gas_price: u128,
) -> anyhow::Result<BundleTransactionReceipt> {
    Ok(BundleTransactionReceipt {
        transaction_hash: tx_receipt.transaction_hash,
        transaction_index: tx_receipt
            .transaction_index
            .context("receipt is missing transactionIndex")?,
        block_hash: tx_receipt
            .block_hash
            .context("receipt is missing blockHash")?,
        block_number: tx_receipt
            .block_number
            .context("receipt is missing blockNumber")?,
        from: tx_receipt.from,
        to: tx_receipt.to,
        gas_used: tx_receipt.gas_used.into(),
        effective_gas_price,
        contract_address: tx_receipt.contract_address,
        status: if tx_receipt.status() { 1 } else { 0 },
        logs: tx_receipt
            .inner
            .logs()
            .iter()
            .map(ReceiptLog::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::keccak256;
    use alloy_primitives::LogData;
    use barge_provider::BlockNumberOrTag;
    use mockall::Sequence;

    use super::*;
    use crate::test_utils::{entry_point, event_log, receipt_with_logs, uo_event_log, MockEvmProvider};

    const OP_HASH: B256 = B256::repeat_byte(0x42);

    fn given_log(topic_0: &str, topic_1: &str) -> Log {
        event_log(
            Address::repeat_byte(0x77),
            LogData::new_unchecked(
                vec![
                    keccak256(topic_0.as_bytes()),
                    keccak256(topic_1.as_bytes()),
                ],
                Bytes::new(),
            ),
        )
    }

    fn fetcher(
        provider: MockEvmProvider,
        max_block_range: Option<u64>,
    ) -> UserOperationReceiptFetcher<MockEvmProvider> {
        UserOperationReceiptFetcher::new(
            Arc::new(provider),
            vec![entry_point()],
            max_block_range,
            Duration::from_millis(1),
        )
    }

    fn provider_with_event(receipt: TransactionReceipt) -> MockEvmProvider {
        let mut provider = MockEvmProvider::new();
        provider.expect_get_block_number().returning(|| Ok(1000));
        provider
            .expect_get_logs()
            .returning(|_| Ok(vec![uo_event_log(entry_point(), OP_HASH, true)]));
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));
        provider
    }

    #[tokio::test]
    async fn test_returns_none_without_event() {
        let mut provider = MockEvmProvider::new();
        provider.expect_get_block_number().returning(|| Ok(1000));
        provider.expect_get_logs().returning(|_| Ok(vec![]));

        let result = fetcher(provider, None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_returns_none_when_event_pending() {
        let mut pending = uo_event_log(entry_point(), OP_HASH, true);
        pending.transaction_hash = None;

        let mut provider = MockEvmProvider::new();
        provider.expect_get_block_number().returning(|| Ok(1000));
        provider
            .expect_get_logs()
            .returning(move |_| Ok(vec![pending.clone()]));

        let result = fetcher(provider, None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_returns_none_when_log_topology_missing() {
        let mut broken = given_log("some-topic", "some-hash");
        broken.block_hash = None;
        let receipt = receipt_with_logs(
            true,
            vec![broken, uo_event_log(entry_point(), OP_HASH, true)],
        );

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fails_without_event_in_receipt_logs() {
        let receipt = receipt_with_logs(true, vec![given_log("other-topic", "some-hash")]);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("no UserOperationEvent in logs"));
    }

    #[tokio::test]
    async fn test_slice_is_empty_for_first_and_only_op() {
        let receipt = receipt_with_logs(true, vec![uo_event_log(entry_point(), OP_HASH, true)]);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap()
            .unwrap();
        assert!(result.logs.is_empty());
        assert!(result.success);
        assert_eq!(result.entry_point, entry_point());
        assert_eq!(result.receipt.status, 1);
    }

    #[tokio::test]
    async fn test_slice_excludes_boundary_events() {
        // three ops in order; querying the middle one takes the logs strictly
        // between the previous op's event and ours
        let op_a = B256::repeat_byte(0x0a);
        let op_c = B256::repeat_byte(0x0c);
        let logs = vec![
            given_log("other-topic", "some-hash"),
            uo_event_log(entry_point(), op_a, true),
            given_log("account-log", "some-hash"),
            given_log("account-log-2", "some-hash"),
            uo_event_log(entry_point(), OP_HASH, true),
            uo_event_log(entry_point(), op_c, true),
        ];
        let expected: Vec<ReceiptLog> = logs[2..4].iter().map(|l| l.try_into().unwrap()).collect();
        let receipt = receipt_with_logs(true, logs);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.logs, expected);
    }

    #[tokio::test]
    async fn test_decodes_revert_reason_for_reverted_op() {
        use barge_contracts::v0_6::IEntryPoint::UserOperationRevertReason;

        let op_a = B256::repeat_byte(0x0a);
        let revert_log = event_log(
            entry_point(),
            UserOperationRevertReason {
                userOpHash: OP_HASH,
                sender: Address::repeat_byte(0x22),
                nonce: U256::from(1),
                revertReason: Bytes::from_static(b"\xde\xad"),
            }
            .encode_log_data(),
        );
        let logs = vec![
            uo_event_log(entry_point(), op_a, true),
            given_log("account-log", "some-hash"),
            revert_log,
            uo_event_log(entry_point(), OP_HASH, false),
        ];
        let expected: Vec<ReceiptLog> = logs[1..3].iter().map(|l| l.try_into().unwrap()).collect();
        let receipt = receipt_with_logs(true, logs);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap()
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.reason.as_deref(), Some("0xdead"));
        assert_eq!(result.logs, expected);
    }

    #[tokio::test]
    async fn test_retries_until_receipt_found() {
        let receipt = receipt_with_logs(true, vec![uo_event_log(entry_point(), OP_HASH, true)]);

        let mut provider = MockEvmProvider::new();
        provider.expect_get_block_number().returning(|| Ok(1000));
        provider
            .expect_get_logs()
            .returning(|_| Ok(vec![uo_event_log(entry_point(), OP_HASH, true)]));

        let mut seq = Sequence::new();
        provider
            .expect_get_transaction_receipt()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        provider
            .expect_get_transaction_receipt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(receipt.clone())));

        let result = fetcher(provider, None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_block_range_clamps_at_zero() {
        let mut provider = MockEvmProvider::new();
        provider.expect_get_block_number().returning(|| Ok(1000));
        provider
            .expect_get_logs()
            .withf(|filter| {
                filter.block_option.get_from_block() == Some(&BlockNumberOrTag::Number(0))
                    && filter.block_option.get_to_block() == Some(&BlockNumberOrTag::Number(1000))
            })
            .returning(|_| Ok(vec![]));

        let result = fetcher(provider, Some(5000))
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_paymaster_zero_is_normalised_out() {
        let receipt = receipt_with_logs(true, vec![uo_event_log(entry_point(), OP_HASH, true)]);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.paymaster, None);
    }

    #[tokio::test]
    async fn test_reconstruction_is_deterministic() {
        let receipt = receipt_with_logs(
            true,
            vec![
                given_log("other-topic", "some-hash"),
                uo_event_log(entry_point(), OP_HASH, true),
            ],
        );

        let fetcher = fetcher(provider_with_event(receipt), None);
        let first = fetcher.get_user_operation_receipt(OP_HASH).await.unwrap();
        let second = fetcher.get_user_operation_receipt(OP_HASH).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn test_receipt_wire_shape_is_camel_case() {
        let receipt = receipt_with_logs(true, vec![uo_event_log(entry_point(), OP_HASH, true)]);

        let result = fetcher(provider_with_event(receipt), None)
            .get_user_operation_receipt(OP_HASH)
            .await
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("userOpHash").is_some());
        assert!(json.get("actualGasUsed").is_some());
        assert_eq!(json["receipt"]["status"], 1);
        // zero paymaster is dropped from the wire shape
        assert!(json.get("paymaster").is_none());
    }
}
