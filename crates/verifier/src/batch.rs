use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A Safe tx-builder batch document, the offline counterpart of a pending
/// multisig transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub version: String,
    pub chain_id: String,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(default)]
    pub meta: Option<BatchMeta>,
    pub transactions: Vec<BatchTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tx_builder_version: Option<String>,
    #[serde(default)]
    pub created_from_safe_address: Option<Address>,
    #[serde(default)]
    pub created_from_owner_address: Option<Address>,
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTransaction {
    pub to: Address,
    pub value: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub contract_method: Option<ContractMethod>,
    #[serde(default)]
    pub contract_inputs_values: Option<TimelockInputs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractMethod {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<MethodInput>,
    #[serde(default)]
    pub payable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInput {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub internal_type: Option<String>,
}

/// Input values of a timelock queue/execute call inside a batch document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelockInputs {
    pub target: Address,
    pub value: String,
    pub signature: String,
    pub data: String,
    pub eta: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tx_builder_document() {
        let doc = serde_json::json!({
            "version": "1.0",
            "chainId": "1",
            "createdAt": 1690000000,
            "meta": {
                "name": "deploy price feeds",
                "txBuilderVersion": "1.16.1",
                "createdFromSafeAddress": "0x4e59b44847b379578588920cA78FbF26c0B4956C"
            },
            "transactions": [{
                "to": "0x0000000000000000000000000000000000000011",
                "value": "0",
                "contractMethod": {
                    "name": "queueTransaction",
                    "inputs": [
                        { "type": "address", "name": "target" },
                        { "type": "uint256", "name": "value" },
                        { "type": "string", "name": "signature" },
                        { "type": "bytes", "name": "data", "internalType": "bytes" },
                        { "type": "uint256", "name": "eta" }
                    ],
                    "payable": false
                },
                "contractInputsValues": {
                    "target": "0x0000000000000000000000000000000000000022",
                    "value": "0",
                    "signature": "deploy(bytes32,bytes)",
                    "data": "0xdeadbeef",
                    "eta": "1700000000"
                }
            }]
        });

        let batch: Batch = serde_json::from_value(doc).unwrap();
        assert_eq!(batch.transactions.len(), 1);
        let tx = &batch.transactions[0];
        let inputs = tx.contract_inputs_values.as_ref().unwrap();
        assert_eq!(inputs.signature, "deploy(bytes32,bytes)");
        assert_eq!(inputs.eta, "1700000000");
        assert_eq!(
            tx.contract_method.as_ref().unwrap().inputs[3].param_type,
            "bytes"
        );
    }
}
