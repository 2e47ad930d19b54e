use alloy_primitives::{hex, Address, Bytes};
use serde::{Deserialize, Serialize};

/// Method name of a Safe multisend wrapper call.
pub const MULTISEND_METHOD: &str = "multiSend";
/// Timelock scheduling method.
pub const TIMELOCK_QUEUE_METHOD: &str = "queueTransaction";
/// Timelock trigger method.
pub const TIMELOCK_EXECUTE_METHOD: &str = "executeTransaction";
/// Timelock cancellation method.
pub const TIMELOCK_CANCEL_METHOD: &str = "cancelTransaction";

/// Number of parameters carried by every timelock queue/execute/cancel call:
/// `(target, value, signature, data, eta)`.
pub const TIMELOCK_PARAMS: usize = 5;

/// Decoded representation of a contract call, as reported by the transaction
/// service. Undecodable calls simply have no `DataDecoded` attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDecoded {
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
    /// Only present on the `transactions` parameter of a multisend call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_decoded: Option<Vec<InnerCall>>,
}

impl Parameter {
    /// String form of the parameter value, if it is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// A call nested inside a multisend batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerCall {
    #[serde(default)]
    pub operation: u8,
    pub to: Address,
    pub value: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_decoded: Option<DataDecoded>,
}

impl InnerCall {
    /// Raw calldata bytes, empty for bare value transfers.
    pub fn data_bytes(&self) -> Result<Bytes, hex::FromHexError> {
        match &self.data {
            Some(data) => hex::decode(data).map(Into::into),
            None => Ok(Bytes::new()),
        }
    }
}

/// Tagged view over a decoded call. All duck-typing on the service JSON
/// happens in [`shape`]; everything downstream matches on this enum.
#[derive(Debug)]
pub enum CallShape<'a> {
    /// No decoded data available.
    Opaque,
    /// A single decoded call.
    Leaf(&'a DataDecoded),
    /// A multisend batch with its nested calls.
    Batch(&'a [InnerCall]),
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("expected multisend with 1 parameter, got {0}")]
    MultisendParameterCount(usize),
    #[error("expected multisend parameter 'transactions', got '{0}'")]
    MultisendParameterName(String),
    #[error("multisend batch carries no nested calls")]
    EmptyBatch,
}

/// Derives the call shape from optional decoded data.
///
/// A multisend call must carry exactly one `transactions` parameter with at
/// least one nested call; anything else is a malformed batch.
pub fn shape(decoded: Option<&DataDecoded>) -> Result<CallShape<'_>, ShapeError> {
    let Some(decoded) = decoded else {
        return Ok(CallShape::Opaque);
    };
    if decoded.method != MULTISEND_METHOD {
        return Ok(CallShape::Leaf(decoded));
    }
    if decoded.parameters.len() != 1 {
        return Err(ShapeError::MultisendParameterCount(decoded.parameters.len()));
    }
    let param = &decoded.parameters[0];
    if param.name != "transactions" {
        return Err(ShapeError::MultisendParameterName(param.name.clone()));
    }
    match param.value_decoded.as_deref() {
        Some(calls) if !calls.is_empty() => Ok(CallShape::Batch(calls)),
        _ => Err(ShapeError::EmptyBatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multisend(calls: Vec<InnerCall>) -> DataDecoded {
        DataDecoded {
            method: MULTISEND_METHOD.to_string(),
            parameters: vec![Parameter {
                name: "transactions".to_string(),
                param_type: "bytes".to_string(),
                value: serde_json::Value::String("0x00".to_string()),
                value_decoded: Some(calls),
            }],
        }
    }

    #[test]
    fn opaque_when_no_decoded_data() {
        assert!(matches!(shape(None), Ok(CallShape::Opaque)));
    }

    #[test]
    fn leaf_for_plain_method() {
        let decoded = DataDecoded {
            method: "transfer".to_string(),
            parameters: vec![],
        };
        assert!(matches!(shape(Some(&decoded)), Ok(CallShape::Leaf(_))));
    }

    #[test]
    fn batch_requires_nested_calls() {
        let decoded = multisend(vec![]);
        assert!(matches!(shape(Some(&decoded)), Err(ShapeError::EmptyBatch)));
    }

    #[test]
    fn batch_with_nested_calls() {
        let decoded = multisend(vec![InnerCall {
            operation: 0,
            to: Address::ZERO,
            value: "0".to_string(),
            data: None,
            data_decoded: None,
        }]);
        let shape = shape(Some(&decoded)).unwrap();
        assert!(matches!(shape, CallShape::Batch(calls) if calls.len() == 1));
    }

    #[test]
    fn parses_service_json() {
        let raw = r#"{
            "method": "multiSend",
            "parameters": [{
                "name": "transactions",
                "type": "bytes",
                "value": "0x00",
                "valueDecoded": [{
                    "operation": 0,
                    "to": "0x4e59b44847b379578588920cA78FbF26c0B4956C",
                    "value": "0",
                    "data": "0xdeadbeef",
                    "dataDecoded": null
                }]
            }]
        }"#;
        let decoded: DataDecoded = serde_json::from_str(raw).unwrap();
        let CallShape::Batch(calls) = shape(Some(&decoded)).unwrap() else {
            panic!("expected batch");
        };
        assert_eq!(calls[0].data_bytes().unwrap().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }
}
