use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use forkops_primitives::{
    create2::DeploymentCandidate,
    decoded::{
        shape, CallShape, DataDecoded, InnerCall, TIMELOCK_CANCEL_METHOD, TIMELOCK_EXECUTE_METHOD,
        TIMELOCK_PARAMS, TIMELOCK_QUEUE_METHOD,
    },
    pending::PendingTransaction,
    selector::selector,
};
use tracing::{debug, warn};

use crate::batch::Batch;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ICreate2Factory {
        function deploy(bytes32 salt, bytes memory initcode) external payable returns (address deployed);
    }
}

/// Deterministic-deployment candidates buried in a pending transaction:
/// direct factory calls and factory calls wrapped in timelock queue/execute
/// calls, one multisend level deep.
///
/// Extraction filters, it never fails: anything that does not decode as a
/// factory deploy is skipped, with a warning when it looked close.
pub fn candidates_from_transaction(
    tx: &PendingTransaction,
    factory: Address,
) -> Vec<DeploymentCandidate> {
    let shape = match shape(tx.data_decoded.as_ref()) {
        Ok(shape) => shape,
        Err(err) => {
            warn!(hash = %tx.safe_tx_hash, %err, "skipping malformed transaction");
            return Vec::new();
        }
    };
    match shape {
        CallShape::Opaque => {
            let data = match tx.data.as_deref().map(hex::decode).transpose() {
                Ok(data) => Bytes::from(data.unwrap_or_default()),
                Err(err) => {
                    warn!(hash = %tx.safe_tx_hash, %err, "invalid calldata hex");
                    return Vec::new();
                }
            };
            candidate_from_call(factory, tx.to, &data).into_iter().collect()
        }
        CallShape::Leaf(decoded) => {
            let (to, data) = match effective_call(decoded) {
                Some(rebuilt) => rebuilt,
                None => {
                    let Some(data) = decode_data(tx.data.as_deref()) else {
                        return Vec::new();
                    };
                    (tx.to, data)
                }
            };
            candidate_from_call(factory, to, &data).into_iter().collect()
        }
        CallShape::Batch(calls) => calls
            .iter()
            .filter_map(|call| candidate_from_inner(call, factory))
            .collect(),
    }
}

/// Same filter over a flat tx-builder batch document.
pub fn candidates_from_batch(batch: &Batch, factory: Address) -> Vec<DeploymentCandidate> {
    batch
        .transactions
        .iter()
        .filter_map(|tx| {
            let (to, data) = match &tx.contract_inputs_values {
                Some(inputs) => {
                    let data = decode_data(Some(&inputs.data))?;
                    (inputs.target, rebuild_calldata(&inputs.signature, &data))
                }
                None => (tx.to, decode_data(tx.data.as_deref())?),
            };
            candidate_from_call(factory, to, &data)
        })
        .collect()
}

fn candidate_from_inner(call: &InnerCall, factory: Address) -> Option<DeploymentCandidate> {
    let (to, data) = match call.data_decoded.as_ref().and_then(effective_call) {
        Some(rebuilt) => rebuilt,
        None => {
            let data = match call.data_bytes() {
                Ok(data) => data,
                Err(err) => {
                    warn!(to = %call.to, %err, "invalid nested calldata hex");
                    return None;
                }
            };
            (call.to, data)
        }
    };
    candidate_from_call(factory, to, &data)
}

/// The call a timelock queue/execute/cancel forwards once due: target plus
/// `selector(signature) ++ data`. `None` when the decoded call is not a
/// timelock call, leaving the outer call in effect.
fn effective_call(decoded: &DataDecoded) -> Option<(Address, Bytes)> {
    let timelock = matches!(
        decoded.method.as_str(),
        m if m == TIMELOCK_QUEUE_METHOD || m == TIMELOCK_EXECUTE_METHOD || m == TIMELOCK_CANCEL_METHOD
    );
    if !timelock || decoded.parameters.len() != TIMELOCK_PARAMS {
        return None;
    }
    let target: Address = match decoded.parameters[0].as_str().map(str::parse) {
        Some(Ok(target)) => target,
        _ => {
            warn!(method = decoded.method, "timelock target does not parse");
            return None;
        }
    };
    let signature = decoded.parameters[2].as_str()?;
    let data = decode_data(decoded.parameters[3].as_str())?;
    Some((target, rebuild_calldata(signature, &data)))
}

fn rebuild_calldata(signature: &str, data: &[u8]) -> Bytes {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(data);
    out.into()
}

fn decode_data(data: Option<&str>) -> Option<Bytes> {
    match data.map(hex::decode).transpose() {
        Ok(data) => Some(Bytes::from(data.unwrap_or_default())),
        Err(err) => {
            warn!(%err, "invalid calldata hex");
            None
        }
    }
}

fn candidate_from_call(factory: Address, to: Address, data: &[u8]) -> Option<DeploymentCandidate> {
    if to != factory || !data.starts_with(&ICreate2Factory::deployCall::SELECTOR) {
        return None;
    }
    match ICreate2Factory::deployCall::abi_decode(data, true) {
        Ok(call) => Some(DeploymentCandidate {
            salt: call.salt,
            initcode: call.initcode,
        }),
        Err(err) => {
            debug!(%to, %err, "factory call does not decode as deploy");
            None
        }
    }
}
