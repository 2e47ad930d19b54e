use alloy_primitives::{hex, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use forkops_primitives::{
    decoded::{shape, CallShape, InnerCall, ShapeError},
    pending::PendingTransaction,
    selector::{substitute_selector, TIMELOCK_EXECUTE_SELECTOR, TIMELOCK_QUEUE_SELECTOR},
};

use crate::contracts::IMultiSend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Call = 0,
    DelegateCall = 1,
}

/// A transaction the engine can push through `execTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: OperationType,
}

/// A locally synthesized timelock execute, derived from a queue transaction.
/// Consumed once: replayed after the main pass, or dropped when a genuine
/// execute is pending.
#[derive(Debug, Clone)]
pub struct ShadowExecute {
    pub transaction: SafeCall,
    pub eta: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ShadowError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("invalid calldata hex: {0}")]
    Data(#[from] hex::FromHexError),
    #[error("invalid wei value '{0}'")]
    Value(String),
}

fn parse_value(value: &str) -> Result<U256, ShadowError> {
    value
        .parse()
        .map_err(|_| ShadowError::Value(value.to_string()))
}

/// Builds the transaction the replay engine executes for a pending record:
/// the recorded call, byte for byte.
pub fn replayable(tx: &PendingTransaction) -> Result<SafeCall, ShadowError> {
    let data = match &tx.data {
        Some(data) => hex::decode(data)?.into(),
        None => Bytes::new(),
    };
    Ok(SafeCall {
        to: tx.to,
        value: parse_value(&tx.value)?,
        data,
        operation: if tx.operation == 1 {
            OperationType::DelegateCall
        } else {
            OperationType::Call
        },
    })
}

/// Derives the shadow execute for a queue transaction by swapping the
/// timelock queue selector for the execute selector at the head of every
/// nested (or sole) call.
///
/// Batched calls are re-encoded into a fresh `multiSend` payload from their
/// decoded form; the opaque outer blob is never pattern-patched.
pub fn derive_shadow(tx: &PendingTransaction, eta: u64) -> Result<ShadowExecute, ShadowError> {
    let transaction = match shape(tx.data_decoded.as_ref())? {
        CallShape::Batch(calls) => {
            let transactions = encode_multisend(calls)?;
            SafeCall {
                to: tx.to,
                value: parse_value(&tx.value)?,
                data: IMultiSend::multiSendCall { transactions }.abi_encode().into(),
                operation: OperationType::DelegateCall,
            }
        }
        CallShape::Leaf(_) | CallShape::Opaque => {
            let mut call = replayable(tx)?;
            if let Some(substituted) = substitute_selector(
                &call.data,
                TIMELOCK_QUEUE_SELECTOR,
                TIMELOCK_EXECUTE_SELECTOR,
            ) {
                call.data = substituted;
            }
            call
        }
    };
    Ok(ShadowExecute { transaction, eta })
}

/// Packs nested calls into the `multiSend` wire format:
/// `operation (1) ++ to (20) ++ value (32) ++ data length (32) ++ data`,
/// substituting the execute selector into each queue call head.
fn encode_multisend(calls: &[InnerCall]) -> Result<Bytes, ShadowError> {
    let mut out = Vec::new();
    for call in calls {
        let data = call.data_bytes()?;
        let data = substitute_selector(&data, TIMELOCK_QUEUE_SELECTOR, TIMELOCK_EXECUTE_SELECTOR)
            .unwrap_or(data);
        out.push(call.operation);
        out.extend_from_slice(call.to.as_slice());
        out.extend_from_slice(&parse_value(&call.value)?.to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(data.len()).to_be_bytes::<32>());
        out.extend_from_slice(&data);
    }
    Ok(out.into())
}
