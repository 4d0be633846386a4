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

//! Classification of broadcast bundle transactions from chain state.

use std::collections::{HashMap, HashSet};

use alloy_consensus::Transaction as TransactionTrait;
use alloy_primitives::{Address, Bytes, TxKind, B256};
use alloy_sol_types::{SolError, SolEvent};
use barge_contracts::{v0_6, v0_7};
use barge_provider::{
    BlockId, BlockNumberOrTag, EvmProvider, Log, ProviderError, ProviderResult,
    TransactionInput, TransactionReceipt, TransactionRequest,
};
use tracing::warn;

// The event topology is identical across entry point revisions, so decoding
// always goes through the v0.6 bindings. Only revert-error decoding is
// version dependent.
use barge_contracts::v0_6::IEntryPoint::{
    AccountDeployed, UserOperationEvent, UserOperationRevertReason,
};

/// Per-op inclusion status string for an op that executed successfully.
/// The misspelling is the upstream consumer contract and must be preserved.
pub(crate) const OP_STATUS_SUCCESSFUL: &str = "succesful";
/// Per-op inclusion status string for an op whose execution reverted.
pub(crate) const OP_STATUS_REVERTED: &str = "reverted";

/// Outcome of a single user operation within an included bundle
#[derive(Clone, Debug)]
pub(crate) struct OperationOutcome {
    /// `"succesful"` or `"reverted"`
    pub(crate) status: String,
    /// Whether the operation deployed its sender account
    pub(crate) account_deployed: bool,
    /// Revert payload for reverted executions, if emitted
    pub(crate) revert_reason: Option<Bytes>,
}

/// Status of a broadcast bundle transaction
#[derive(Clone, Debug)]
pub(crate) enum BundleStatus {
    /// The transaction is not known to the chain (or not yet in a block)
    NotFound,
    /// The transaction was included; per-op outcomes keyed by op hash
    Included {
        outcomes: HashMap<B256, OperationOutcome>,
    },
    /// The transaction reverted
    Reverted {
        aa95: bool,
        reason: Option<String>,
    },
}

/// Classify a broadcast hash as not found, included, or reverted.
///
/// For included transactions the per-op outcomes are decoded from the entry
/// point's logs. For reverted transactions the revert reason is recovered by
/// replaying the transaction at its mined block and decoding the entry
/// point's `FailedOp` payload.
pub(crate) async fn fetch_bundle_status<P: EvmProvider>(
    provider: &P,
    entry_point: Address,
    tx_hash: B256,
    is_version_06: bool,
) -> ProviderResult<BundleStatus> {
    let Some(receipt) = provider.get_transaction_receipt(tx_hash).await? else {
        return Ok(BundleStatus::NotFound);
    };
    if receipt.block_hash.is_none() && receipt.block_number.is_none() {
        return Ok(BundleStatus::NotFound);
    }

    if receipt.status() {
        Ok(BundleStatus::Included {
            outcomes: decode_operation_outcomes(entry_point, receipt.inner.logs()),
        })
    } else {
        let reason = recover_revert_reason(provider, &receipt, is_version_06).await?;
        let aa95 = reason.as_deref().is_some_and(|r| r.contains("AA95"));
        Ok(BundleStatus::Reverted { aa95, reason })
    }
}

fn decode_operation_outcomes(
    entry_point: Address,
    logs: &[Log],
) -> HashMap<B256, OperationOutcome> {
    let mut deployed: HashSet<B256> = HashSet::new();
    let mut revert_reasons: HashMap<B256, Bytes> = HashMap::new();
    let mut outcomes = HashMap::new();

    for log in logs.iter().filter(|l| l.address() == entry_point) {
        let Some(&topic0) = log.topics().first() else {
            continue;
        };
        if topic0 == AccountDeployed::SIGNATURE_HASH {
            if let Ok(event) = log.log_decode::<AccountDeployed>() {
                deployed.insert(event.inner.data.userOpHash);
            }
        } else if topic0 == UserOperationRevertReason::SIGNATURE_HASH {
            if let Ok(event) = log.log_decode::<UserOperationRevertReason>() {
                let event = event.inner.data;
                revert_reasons.insert(event.userOpHash, event.revertReason);
            }
        }
    }

    for log in logs.iter().filter(|l| l.address() == entry_point) {
        if log.topics().first() != Some(&UserOperationEvent::SIGNATURE_HASH) {
            continue;
        }
        let Ok(event) = log.log_decode::<UserOperationEvent>() else {
            warn!("malformed user operation event in receipt of {entry_point:?}");
            continue;
        };
        let event = event.inner.data;
        let status = if event.success {
            OP_STATUS_SUCCESSFUL
        } else {
            OP_STATUS_REVERTED
        };
        outcomes.insert(
            event.userOpHash,
            OperationOutcome {
                status: status.to_string(),
                account_deployed: deployed.contains(&event.userOpHash),
                revert_reason: revert_reasons.get(&event.userOpHash).cloned(),
            },
        );
    }

    outcomes
}

async fn recover_revert_reason<P: EvmProvider>(
    provider: &P,
    receipt: &TransactionReceipt,
    is_version_06: bool,
) -> ProviderResult<Option<String>> {
    let Some(tx) = provider
        .get_transaction_by_hash(receipt.transaction_hash)
        .await?
    else {
        return Ok(None);
    };
    let Some(to) = tx.inner.to() else {
        return Ok(None);
    };

    let request = TransactionRequest {
        from: Some(receipt.from),
        to: Some(TxKind::Call(to)),
        gas: Some(tx.inner.gas_limit()),
        input: TransactionInput::new(tx.inner.input().clone()),
        ..Default::default()
    };
    let block = receipt
        .block_number
        .map(|n| BlockId::Number(BlockNumberOrTag::Number(n)));

    match provider.call(&request, block).await {
        // the replay no longer reverts; nothing to classify
        Ok(_) => Ok(None),
        Err(ProviderError::Revert(data)) => Ok(decode_entry_point_revert(&data, is_version_06)),
        Err(e) => Err(e),
    }
}

fn decode_entry_point_revert(data: &[u8], is_version_06: bool) -> Option<String> {
    if is_version_06 {
        v0_6::IEntryPoint::FailedOp::abi_decode(data, true)
            .ok()
            .map(|e| e.reason)
    } else {
        v0_7::IEntryPoint::FailedOpWithRevert::abi_decode(data, true)
            .map(|e| e.reason)
            .or_else(|_| v0_7::IEntryPoint::FailedOp::abi_decode(data, true).map(|e| e.reason))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::test_utils::{
        entry_point, eip1559_transaction, event_log, receipt_with_logs, uo_event_log,
        MockEvmProvider,
    };

    #[tokio::test]
    async fn test_status_not_found() {
        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, true)
            .await
            .unwrap();
        assert!(matches!(status, BundleStatus::NotFound));
    }

    #[tokio::test]
    async fn test_status_included_outcomes() {
        let op_a = B256::repeat_byte(0xa1);
        let op_b = B256::repeat_byte(0xb2);
        let logs = vec![
            event_log(
                entry_point(),
                AccountDeployed {
                    userOpHash: op_a,
                    sender: Address::repeat_byte(0x22),
                    factory: Address::repeat_byte(0x33),
                    paymaster: Address::ZERO,
                }
                .encode_log_data(),
            ),
            uo_event_log(entry_point(), op_a, true),
            event_log(
                entry_point(),
                UserOperationRevertReason {
                    userOpHash: op_b,
                    sender: Address::repeat_byte(0x22),
                    nonce: U256::from(2),
                    revertReason: Bytes::from_static(b"nope"),
                }
                .encode_log_data(),
            ),
            uo_event_log(entry_point(), op_b, false),
        ];
        let receipt = receipt_with_logs(true, logs);

        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, true)
            .await
            .unwrap();
        let BundleStatus::Included { outcomes } = status else {
            panic!("expected included status");
        };

        let a = &outcomes[&op_a];
        // the misspelling is the upstream consumer contract
        assert_eq!(a.status, "succesful");
        assert!(a.account_deployed);
        assert_eq!(a.revert_reason, None);

        let b = &outcomes[&op_b];
        assert_eq!(b.status, "reverted");
        assert!(!b.account_deployed);
        assert_eq!(b.revert_reason, Some(Bytes::from_static(b"nope")));
    }

    #[tokio::test]
    async fn test_status_ignores_other_entry_point_logs() {
        let op = B256::repeat_byte(0xa1);
        let logs = vec![uo_event_log(Address::repeat_byte(0x99), op, true)];
        let receipt = receipt_with_logs(true, logs);

        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, true)
            .await
            .unwrap();
        let BundleStatus::Included { outcomes } = status else {
            panic!("expected included status");
        };
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_status_reverted_aa95() {
        let receipt = receipt_with_logs(false, vec![]);
        let revert = v0_6::IEntryPoint::FailedOp {
            opIndex: U256::ZERO,
            reason: "AA95 out of gas".to_string(),
        };

        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));
        provider
            .expect_get_transaction_by_hash()
            .returning(|hash| Ok(Some(eip1559_transaction(hash))));
        provider
            .expect_call()
            .returning(move |_, _| Err(ProviderError::Revert(revert.abi_encode().into())));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, true)
            .await
            .unwrap();
        let BundleStatus::Reverted { aa95, reason } = status else {
            panic!("expected reverted status");
        };
        assert!(aa95);
        assert_eq!(reason.unwrap(), "AA95 out of gas");
    }

    #[tokio::test]
    async fn test_status_reverted_v0_7_with_inner_revert() {
        let receipt = receipt_with_logs(false, vec![]);
        let revert = v0_7::IEntryPoint::FailedOpWithRevert {
            opIndex: U256::ZERO,
            reason: "AA23 reverted".to_string(),
            inner: Bytes::from_static(b"\x01\x02"),
        };

        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));
        provider
            .expect_get_transaction_by_hash()
            .returning(|hash| Ok(Some(eip1559_transaction(hash))));
        provider
            .expect_call()
            .returning(move |_, _| Err(ProviderError::Revert(revert.abi_encode().into())));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, false)
            .await
            .unwrap();
        let BundleStatus::Reverted { aa95, reason } = status else {
            panic!("expected reverted status");
        };
        assert!(!aa95);
        assert_eq!(reason.unwrap(), "AA23 reverted");
    }

    #[tokio::test]
    async fn test_status_reverted_clean_replay_has_no_reason() {
        let receipt = receipt_with_logs(false, vec![]);

        let mut provider = MockEvmProvider::new();
        provider
            .expect_get_transaction_receipt()
            .returning(move |_| Ok(Some(receipt.clone())));
        provider
            .expect_get_transaction_by_hash()
            .returning(|hash| Ok(Some(eip1559_transaction(hash))));
        provider
            .expect_call()
            .returning(|_, _| Ok(Bytes::new()));

        let status = fetch_bundle_status(&provider, entry_point(), B256::ZERO, true)
            .await
            .unwrap();
        let BundleStatus::Reverted { aa95, reason } = status else {
            panic!("expected reverted status");
        };
        assert!(!aa95);
        assert_eq!(reason, None);
    }
}
