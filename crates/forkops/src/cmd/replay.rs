use alloy_primitives::{address, Address};
use alloy_provider::ProviderBuilder;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use forkops_primitives::pending::executable_queue;
use forkops_replay::{
    chain::{RpcChainClient, WarpBackend},
    engine::{ReplayConfig, ReplayEngine, DEFAULT_GAS_LIMIT},
};
use safe_client::SafeClient;

/// Default account installed as the delegated signer, the first well-known
/// anvil/hardhat dev account.
const DEFAULT_SIGNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    Anvil,
    Tenderly,
}

impl From<Backend> for WarpBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Anvil => WarpBackend::Anvil,
            Backend::Tenderly => WarpBackend::Tenderly,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(about = "Replay a Safe's pending transactions against a forked chain.")]
pub struct ReplayCommand {
    #[arg(long, value_name = "SAFE", help = "The address of the Safe multisig.")]
    safe: Address,

    #[arg(long, value_name = "URL", help = "RPC endpoint of the forked node.")]
    rpc_url: String,

    #[arg(
        long,
        value_name = "ID",
        default_value = "1",
        help = "Chain id used to select the transaction service."
    )]
    chain_id: u64,

    #[arg(
        long,
        value_name = "URL",
        help = "Explicit transaction service URL, overrides --chain-id."
    )]
    tx_service_url: Option<String>,

    #[arg(
        long,
        value_enum,
        default_value = "anvil",
        help = "Simulation backend behind the RPC endpoint."
    )]
    backend: Backend,

    #[arg(
        long,
        value_name = "SIGNER",
        default_value_t = DEFAULT_SIGNER,
        help = "Account installed as a threshold-one owner for the replay."
    )]
    signer: Address,

    #[arg(long, value_name = "GAS", default_value_t = DEFAULT_GAS_LIMIT)]
    gas_limit: u64,
}

impl ReplayCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let Self {
            safe,
            rpc_url,
            chain_id,
            tx_service_url,
            backend,
            signer,
            gas_limit,
        } = self;

        let service = match tx_service_url {
            Some(url) => SafeClient::with_url(url),
            None => SafeClient::new(chain_id)?,
        };
        let pending = executable_queue(service.pending_transactions(safe).await?);
        if pending.is_empty() {
            println!("{}", "No pending transactions to replay".bright_green());
            return Ok(());
        }
        println!(
            "{}",
            format!("Got {} pending transactions", pending.len()).bright_cyan()
        );
        for tx in &pending {
            println!("{}: {}", tx.nonce.to_string().bright_green(), tx.safe_tx_hash);
        }

        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        let chain = RpcChainClient::new(provider, backend.into());
        let engine = ReplayEngine::new(
            chain,
            ReplayConfig {
                safe,
                signer,
                gas_limit,
            },
        );

        engine.prepare().await?;
        let replayed = engine.run(&pending).await?;

        println!(
            "{}",
            format!("Replayed {} transactions", replayed.len()).bright_green()
        );
        for hash in replayed {
            println!("{hash}");
        }
        Ok(())
    }
}
