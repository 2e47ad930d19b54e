use alloy_primitives::{Address, B256};
use forkops_primitives::pending::PendingTransaction;
use serde::Deserialize;

pub mod consts;

/// Read-only client for the Safe transaction service.
///
/// Execution never goes through the service; replayed transactions are
/// submitted to the chain directly.
pub struct SafeClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TransactionPage {
    results: Vec<PendingTransaction>,
}

impl SafeClient {
    pub fn new(chain_id: u64) -> eyre::Result<Self> {
        Ok(Self::with_url(consts::get_transaction_service_url(
            chain_id,
        )?))
    }

    /// Client against an explicit service URL, e.g. a self-hosted instance.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// All not-yet-executed multisig transactions for a Safe.
    ///
    /// Results are returned as served; ordering and resubmission dedup is
    /// the replay engine's job.
    pub async fn pending_transactions(
        &self,
        safe: Address,
    ) -> eyre::Result<Vec<PendingTransaction>> {
        let url = format!(
            "{}/v1/safes/{}/multisig-transactions/?executed=false",
            self.base_url, safe
        );
        let page: TransactionPage = self.get_json(&url).await?;
        Ok(page.results)
    }

    /// A single multisig transaction by its safe tx hash.
    pub async fn transaction(&self, safe_tx_hash: B256) -> eyre::Result<PendingTransaction> {
        let url = format!(
            "{}/v1/multisig-transactions/{}/",
            self.base_url, safe_tx_hash
        );
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> eyre::Result<T> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            eyre::bail!("transaction service request failed: {} - {}", status, text);
        }
        Ok(response.json().await?)
    }
}
