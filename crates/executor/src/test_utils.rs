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

//! Shared fixtures for executor tests.

use std::time::Instant;

use alloy_consensus::{Signed, TxEip1559, TxEnvelope};
use alloy_primitives::{Address, LogData, PrimitiveSignature, TxKind, B256, U256};
use alloy_sol_types::SolEvent;
use barge_contracts::v0_6::IEntryPoint::UserOperationEvent;
use barge_provider::{
    Eip658Value, Log, Receipt, ReceiptEnvelope, ReceiptWithBloom, Transaction, TransactionReceipt,
};
use barge_types::{
    BundleTransactionRequest, GasFees, TransactionInfo, UserOperation, UserOperationInfo,
};

pub(crate) use barge_provider::MockEvmProvider;

pub(crate) fn entry_point() -> Address {
    Address::repeat_byte(0x60)
}

pub(crate) fn executor_wallet() -> Address {
    Address::repeat_byte(0x01)
}

pub(crate) fn op_info(hash_byte: u8) -> UserOperationInfo {
    UserOperationInfo::new(
        UserOperation::default(),
        B256::repeat_byte(hash_byte),
        entry_point(),
        false,
    )
}

pub(crate) fn transaction_info(ops: Vec<UserOperationInfo>) -> TransactionInfo {
    TransactionInfo {
        tx_hash: B256::repeat_byte(0xaa),
        previous_tx_hashes: vec![],
        tx_request: BundleTransactionRequest {
            from: executor_wallet(),
            to: entry_point(),
            gas: 1000,
            nonce: 7,
            gas_fees: GasFees {
                max_fee_per_gas: 10,
                max_priority_fee_per_gas: 10,
            },
        },
        ops,
        executor: executor_wallet(),
        is_version_06: true,
        last_replaced: Instant::now(),
        times_potentially_included: 0,
    }
}

pub(crate) fn event_log(address: Address, data: LogData) -> Log {
    Log {
        inner: alloy_primitives::Log { address, data },
        block_hash: Some(B256::repeat_byte(0x0b)),
        block_number: Some(1),
        block_timestamp: None,
        transaction_hash: Some(B256::repeat_byte(0xd0)),
        transaction_index: Some(0),
        log_index: Some(0),
        removed: false,
    }
}

pub(crate) fn uo_event_log(entry_point: Address, op_hash: B256, success: bool) -> Log {
    event_log(
        entry_point,
        UserOperationEvent {
            userOpHash: op_hash,
            sender: Address::repeat_byte(0x22),
            paymaster: Address::ZERO,
            nonce: U256::from(1),
            success,
            actualGasCost: U256::from(1000),
            actualGasUsed: U256::from(500),
        }
        .encode_log_data(),
    )
}

pub(crate) fn eip1559_transaction(hash: B256) -> Transaction {
    let tx = TxEip1559 {
        gas_limit: 1_000_000,
        to: TxKind::Call(entry_point()),
        max_fee_per_gas: 3,
        ..Default::default()
    };
    let inner = TxEnvelope::Eip1559(Signed::new_unchecked(
        tx,
        PrimitiveSignature::test_signature(),
        hash,
    ));
    Transaction {
        inner,
        block_hash: Some(B256::repeat_byte(0x0b)),
        block_number: Some(1),
        transaction_index: Some(0),
        effective_gas_price: Some(2),
        from: executor_wallet(),
    }
}

pub(crate) fn receipt_with_logs(status: bool, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        inner: ReceiptEnvelope::Eip1559(ReceiptWithBloom {
            receipt: Receipt {
                status: Eip658Value::Eip658(status),
                cumulative_gas_used: 0,
                logs,
            },
            logs_bloom: Default::default(),
        }),
        transaction_hash: B256::repeat_byte(0xd0),
        transaction_index: Some(0),
        block_hash: Some(B256::repeat_byte(0x0b)),
        block_number: Some(1),
        gas_used: 21_000,
        effective_gas_price: 2,
        blob_gas_used: None,
        blob_gas_price: None,
        from: executor_wallet(),
        to: Some(entry_point()),
        contract_address: None,
        authorization_list: None,
    }
}
