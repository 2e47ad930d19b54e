use alloy_primitives::{ruint::ParseError, Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decoded::DataDecoded;

/// A multisig transaction awaiting execution, as returned by the transaction
/// service, together with the custody metadata the replay engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub safe_tx_hash: B256,
    pub to: Address,
    pub value: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub operation: u8,
    pub nonce: u64,
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub is_executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_decoded: Option<DataDecoded>,
}

impl PendingTransaction {
    /// Transferred value in wei.
    pub fn value_wei(&self) -> Result<U256, ParseError> {
        self.value.parse()
    }
}

/// Orders pending transactions for replay: ascending by nonce, and for
/// resubmitted nonces only the most recently submitted record survives.
pub fn executable_queue(mut txs: Vec<PendingTransaction>) -> Vec<PendingTransaction> {
    txs.sort_by(|a, b| {
        a.nonce
            .cmp(&b.nonce)
            .then(b.submission_date.cmp(&a.submission_date))
    });
    txs.dedup_by_key(|tx| tx.nonce);
    txs
}
