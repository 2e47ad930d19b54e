use std::{marker::PhantomData, time::Duration};

use alloy_primitives::{Address, Bytes, TxKind, B256, U256, U64};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_transport::Transport;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Balance given to every impersonated actor, enough for any gas spend.
const FUNDING_BALANCE: &str = "0x10000000000000000000";

const BLOCK_RETRIES: usize = 5;
const BLOCK_RETRY_DELAY: Duration = Duration::from_secs(3);

const RECEIPT_RETRIES: usize = 15;
const RECEIPT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
    pub success: bool,
}

/// Simulation backend behind the RPC endpoint. They agree on the
/// impersonation methods but differ in how simulated time is advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarpBackend {
    #[default]
    Anvil,
    Tenderly,
}

/// Everything the replay engine needs from the forked chain.
///
/// State-mutating operations are never retried here; blind retry of a send
/// risks duplicate execution. Only the latest-block read retries, because it
/// can race the node's own catch-up.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn impersonate(&self, address: Address) -> eyre::Result<()>;

    async fn stop_impersonating(&self, address: Address) -> eyre::Result<()>;

    /// Submits an unsigned transaction from an impersonated account.
    async fn send(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
        gas: u64,
    ) -> eyre::Result<B256>;

    async fn call(&self, to: Address, data: Bytes) -> eyre::Result<Bytes>;

    async fn wait_for_receipt(&self, tx_hash: B256) -> eyre::Result<ReceiptInfo>;

    async fn latest_block(&self) -> eyre::Result<BlockInfo>;

    /// Mines a block at `timestamp`. Callers are responsible for only ever
    /// warping forward.
    async fn warp_to(&self, timestamp: u64) -> eyre::Result<()>;
}

/// [`ChainClient`] over a JSON-RPC provider speaking the anvil/hardhat
/// simulation dialect.
pub struct RpcChainClient<T, P> {
    provider: P,
    backend: WarpBackend,
    _transport: PhantomData<T>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    number: U64,
    timestamp: U64,
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    status: Option<U64>,
}

impl<T, P> RpcChainClient<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    pub fn new(provider: P, backend: WarpBackend) -> Self {
        Self {
            provider,
            backend,
            _transport: PhantomData,
        }
    }

    async fn try_latest_block(&self) -> eyre::Result<BlockInfo> {
        let block: Option<RawBlock> = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), ("latest", false))
            .await?;
        let block = block.ok_or_else(|| eyre::eyre!("node returned a null latest block"))?;
        Ok(BlockInfo {
            number: block.number.to::<u64>(),
            timestamp: block.timestamp.to::<u64>(),
        })
    }
}

#[async_trait]
impl<T, P> ChainClient for RpcChainClient<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    async fn impersonate(&self, address: Address) -> eyre::Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("hardhat_impersonateAccount".into(), (address,))
            .await?;
        let _: serde_json::Value = self
            .provider
            .raw_request("hardhat_setBalance".into(), (address, FUNDING_BALANCE))
            .await?;
        Ok(())
    }

    async fn stop_impersonating(&self, address: Address) -> eyre::Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("hardhat_stopImpersonatingAccount".into(), (address,))
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        from: Address,
        to: Address,
        value: U256,
        data: Bytes,
        gas: u64,
    ) -> eyre::Result<B256> {
        let mut req = TransactionRequest::default();
        req.from = Some(from);
        req.to = Some(TxKind::Call(to));
        req.value = Some(value);
        req.gas = Some(gas);
        req.input = TransactionInput::new(data);
        let hash: B256 = self
            .provider
            .raw_request("eth_sendTransaction".into(), (req,))
            .await?;
        Ok(hash)
    }

    async fn call(&self, to: Address, data: Bytes) -> eyre::Result<Bytes> {
        let mut req = TransactionRequest::default();
        req.to = Some(TxKind::Call(to));
        req.input = TransactionInput::new(data);
        let out: Bytes = self
            .provider
            .raw_request("eth_call".into(), (req, "latest"))
            .await?;
        Ok(out)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> eyre::Result<ReceiptInfo> {
        for _ in 0..RECEIPT_RETRIES {
            let receipt: Option<RawReceipt> = self
                .provider
                .raw_request("eth_getTransactionReceipt".into(), (tx_hash,))
                .await?;
            if let Some(receipt) = receipt {
                let success = receipt.status.map(|s| s == U64::from(1)).unwrap_or(false);
                return Ok(ReceiptInfo { success });
            }
            tokio::time::sleep(RECEIPT_RETRY_DELAY).await;
        }
        eyre::bail!("no receipt for tx {tx_hash} after {RECEIPT_RETRIES} attempts")
    }

    async fn latest_block(&self) -> eyre::Result<BlockInfo> {
        let mut attempt = 0;
        loop {
            match self.try_latest_block().await {
                Ok(block) => return Ok(block),
                Err(err) if attempt + 1 < BLOCK_RETRIES => {
                    attempt += 1;
                    debug!(%err, attempt, "latest block not available yet");
                    tokio::time::sleep(BLOCK_RETRY_DELAY).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn warp_to(&self, timestamp: u64) -> eyre::Result<()> {
        match self.backend {
            WarpBackend::Anvil => {
                let _: serde_json::Value = self
                    .provider
                    .raw_request("evm_mine".into(), (timestamp,))
                    .await?;
            }
            WarpBackend::Tenderly => {
                let current = self.try_latest_block().await?.timestamp;
                let delta = timestamp.saturating_sub(current);
                let _: serde_json::Value = self
                    .provider
                    .raw_request("evm_increaseTime".into(), (delta,))
                    .await?;
                let _: serde_json::Value = self
                    .provider
                    .raw_request("evm_increaseBlocks".into(), (1u64,))
                    .await?;
            }
        }
        Ok(())
    }
}
