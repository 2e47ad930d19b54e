use alloy_primitives::B256;
use tracing::warn;

use crate::{
    decoded::{
        shape, CallShape, DataDecoded, ShapeError, TIMELOCK_EXECUTE_METHOD, TIMELOCK_PARAMS,
        TIMELOCK_QUEUE_METHOD,
    },
    pending::PendingTransaction,
};

/// Derived classification of a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxClassification {
    pub multisend: bool,
    pub is_queue: bool,
    pub is_execute: bool,
    pub eta: u64,
}

impl TxClassification {
    /// Human-readable kind for replay logs.
    pub fn kind(&self) -> String {
        let mut parts = Vec::new();
        if self.is_queue {
            parts.push("queue");
        }
        if self.is_execute {
            parts.push("execute");
        }
        if parts.is_empty() {
            parts.push("plain");
        }
        if self.multisend {
            parts.push("multisend");
        }
        parts.join(" ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("safe tx {hash} with nonce {nonce} is already executed")]
    AlreadyExecuted { hash: B256, nonce: u64 },
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("expected {expected} parameters for {method}, got {got}")]
    ParameterCount {
        method: String,
        expected: usize,
        got: usize,
    },
    #[error("eta parameter not found in {0}")]
    EtaMissing(String),
    #[error("invalid eta value '{0}'")]
    EtaInvalid(String),
    #[error("eta is outdated: {eta} <= {timestamp}")]
    StaleEta { eta: u64, timestamp: u64 },
}

fn is_timelock_method(method: &str) -> bool {
    method == TIMELOCK_QUEUE_METHOD || method == TIMELOCK_EXECUTE_METHOD
}

/// Reads the scheduling time out of a timelock queue/execute call.
///
/// Leaf calls are additionally required to name the fifth parameter `eta`;
/// nested batch calls are accepted on position alone.
fn eta_param(decoded: &DataDecoded, require_named: bool) -> Result<u64, ClassifyError> {
    if decoded.parameters.len() != TIMELOCK_PARAMS {
        return Err(ClassifyError::ParameterCount {
            method: decoded.method.clone(),
            expected: TIMELOCK_PARAMS,
            got: decoded.parameters.len(),
        });
    }
    let param = &decoded.parameters[TIMELOCK_PARAMS - 1];
    if require_named && param.name != "eta" {
        return Err(ClassifyError::EtaMissing(decoded.method.clone()));
    }
    let raw = param
        .as_str()
        .ok_or_else(|| ClassifyError::EtaInvalid(param.value.to_string()))?;
    raw.parse()
        .map_err(|_| ClassifyError::EtaInvalid(raw.to_string()))
}

/// Classifies a pending transaction against the current chain timestamp.
///
/// Fatal conditions: an already-executed record, a malformed multisend or
/// timelock shape, and a queue whose eta is not in the future. An
/// unrecognized call is not an error; it classifies as plain with the
/// current timestamp as its eta.
pub fn classify(
    tx: &PendingTransaction,
    timestamp: u64,
) -> Result<TxClassification, ClassifyError> {
    if tx.is_executed {
        return Err(ClassifyError::AlreadyExecuted {
            hash: tx.safe_tx_hash,
            nonce: tx.nonce,
        });
    }
    match shape(tx.data_decoded.as_ref())? {
        CallShape::Opaque => {
            // some transactions in the service have no decoded data;
            // timelock transactions always do
            warn!(hash = %tx.safe_tx_hash, "decoded call data is missing");
            Ok(plain(timestamp))
        }
        CallShape::Leaf(decoded) => classify_leaf(decoded, timestamp),
        CallShape::Batch(calls) => classify_batch(calls, timestamp),
    }
}

fn plain(timestamp: u64) -> TxClassification {
    TxClassification {
        multisend: false,
        is_queue: false,
        is_execute: false,
        eta: timestamp,
    }
}

fn classify_leaf(decoded: &DataDecoded, timestamp: u64) -> Result<TxClassification, ClassifyError> {
    if !is_timelock_method(&decoded.method) {
        return Ok(plain(timestamp));
    }
    let is_queue = decoded.method == TIMELOCK_QUEUE_METHOD;
    let eta = eta_param(decoded, true)?;
    if eta <= timestamp {
        return Err(ClassifyError::StaleEta { eta, timestamp });
    }
    Ok(TxClassification {
        multisend: false,
        is_queue,
        is_execute: !is_queue,
        eta,
    })
}

fn classify_batch(
    calls: &[crate::decoded::InnerCall],
    timestamp: u64,
) -> Result<TxClassification, ClassifyError> {
    let mut eta = 0;
    let mut is_queue = false;
    let mut is_execute = false;
    for call in calls {
        let Some(decoded) = call.data_decoded.as_ref() else {
            // an undecodable nested call is a data-quality problem in the
            // service, never fatal for the batch
            warn!(to = %call.to, "nested call has no decoded data");
            continue;
        };
        if !is_timelock_method(&decoded.method) {
            continue;
        }
        eta = eta_param(decoded, false)?.max(eta);
        is_queue |= decoded.method == TIMELOCK_QUEUE_METHOD;
        is_execute |= decoded.method == TIMELOCK_EXECUTE_METHOD;
    }
    if eta > 0 && is_queue && eta <= timestamp {
        return Err(ClassifyError::StaleEta { eta, timestamp });
    }
    Ok(TxClassification {
        multisend: true,
        is_queue,
        is_execute,
        eta,
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::decoded::{InnerCall, Parameter, MULTISEND_METHOD};

    fn timelock_call(method: &str, eta: u64) -> DataDecoded {
        let params = [
            ("target", "address", json!("0x4e59b44847b379578588920cA78FbF26c0B4956C")),
            ("value", "uint256", json!("0")),
            ("signature", "string", json!("setPriceFeed(address)")),
            ("data", "bytes", json!("0x")),
            ("eta", "uint256", json!(eta.to_string())),
        ];
        DataDecoded {
            method: method.to_string(),
            parameters: params
                .into_iter()
                .map(|(name, ty, value)| Parameter {
                    name: name.to_string(),
                    param_type: ty.to_string(),
                    value,
                    value_decoded: None,
                })
                .collect(),
        }
    }

    fn batch(calls: Vec<DataDecoded>) -> Option<DataDecoded> {
        Some(DataDecoded {
            method: MULTISEND_METHOD.to_string(),
            parameters: vec![Parameter {
                name: "transactions".to_string(),
                param_type: "bytes".to_string(),
                value: json!("0x00"),
                value_decoded: Some(
                    calls
                        .into_iter()
                        .map(|decoded| InnerCall {
                            operation: 0,
                            to: Address::ZERO,
                            value: "0".to_string(),
                            data: Some("0x3a66f901".to_string()),
                            data_decoded: Some(decoded),
                        })
                        .collect(),
                ),
            }],
        })
    }

    fn pending(decoded: Option<DataDecoded>) -> PendingTransaction {
        PendingTransaction {
            safe_tx_hash: B256::ZERO,
            to: Address::ZERO,
            value: "0".to_string(),
            data: None,
            operation: 0,
            nonce: 1,
            submission_date: Utc::now(),
            is_executed: false,
            data_decoded: decoded,
        }
    }

    #[test]
    fn queue_batch_classifies_with_eta() {
        let tx = pending(batch(vec![timelock_call(TIMELOCK_QUEUE_METHOD, 1000)]));
        let info = classify(&tx, 500).unwrap();
        assert_eq!(
            info,
            TxClassification {
                multisend: true,
                is_queue: true,
                is_execute: false,
                eta: 1000
            }
        );
        assert_eq!(info.kind(), "queue multisend");
    }

    #[test]
    fn mixed_batch_takes_max_eta() {
        let tx = pending(batch(vec![
            timelock_call(TIMELOCK_QUEUE_METHOD, 1000),
            timelock_call(TIMELOCK_EXECUTE_METHOD, 900),
        ]));
        let info = classify(&tx, 500).unwrap();
        assert!(info.is_queue && info.is_execute);
        assert_eq!(info.eta, 1000);
    }

    #[test]
    fn stale_queue_eta_is_rejected() {
        let tx = pending(batch(vec![timelock_call(TIMELOCK_QUEUE_METHOD, 1000)]));
        assert!(matches!(
            classify(&tx, 1000),
            Err(ClassifyError::StaleEta {
                eta: 1000,
                timestamp: 1000
            })
        ));
    }

    #[test]
    fn already_executed_is_fatal() {
        let mut tx = pending(None);
        tx.is_executed = true;
        assert!(matches!(
            classify(&tx, 0),
            Err(ClassifyError::AlreadyExecuted { .. })
        ));
    }

    #[test]
    fn single_timelock_call() {
        let tx = pending(Some(timelock_call(TIMELOCK_EXECUTE_METHOD, 2000)));
        let info = classify(&tx, 500).unwrap();
        assert_eq!(
            info,
            TxClassification {
                multisend: false,
                is_queue: false,
                is_execute: true,
                eta: 2000
            }
        );
    }

    #[test]
    fn wrong_parameter_count_is_fatal() {
        let mut decoded = timelock_call(TIMELOCK_QUEUE_METHOD, 1000);
        decoded.parameters.pop();
        let tx = pending(batch(vec![decoded]));
        assert!(matches!(
            classify(&tx, 500),
            Err(ClassifyError::ParameterCount { expected: 5, got: 4, .. })
        ));
    }

    #[test]
    fn unrecognized_call_passes_through() {
        let decoded = DataDecoded {
            method: "transfer".to_string(),
            parameters: vec![],
        };
        let info = classify(&pending(Some(decoded)), 1234).unwrap();
        assert_eq!(info, plain(1234));
        assert_eq!(info.kind(), "plain");
    }

    #[test]
    fn undecodable_nested_call_is_not_fatal() {
        let mut decoded = batch(vec![timelock_call(TIMELOCK_QUEUE_METHOD, 1000)]).unwrap();
        decoded.parameters[0]
            .value_decoded
            .as_mut()
            .unwrap()
            .push(InnerCall {
                operation: 0,
                to: Address::ZERO,
                value: "0".to_string(),
                data: Some("0xdeadbeef".to_string()),
                data_decoded: None,
            });
        let info = classify(&pending(Some(decoded)), 500).unwrap();
        assert!(info.is_queue);
        assert_eq!(info.eta, 1000);
    }
}
