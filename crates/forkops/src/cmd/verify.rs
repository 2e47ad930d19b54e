use std::path::PathBuf;

use alloy_primitives::{Address, B256};
use clap::Parser;
use colored::Colorize;
use forkops_primitives::{create2::DETERMINISTIC_FACTORY, pending::executable_queue};
use forkops_verifier::{
    batch::Batch,
    manifest::DeployManifest,
    toolchain::ForgeToolchain,
    verify::{DeployVerifier, Verdict, VerifiedDeployment, VerifierConfig},
};
use safe_client::SafeClient;

#[derive(Debug, Parser)]
#[clap(about = "Verify deterministic deployments against rebuilt sources.")]
pub struct VerifyCommand {
    #[arg(
        value_name = "SAFE_TX_HASH",
        help = "Safe transaction hashes to verify. With no hashes, all pending transactions are verified."
    )]
    hashes: Vec<B256>,

    #[arg(
        long,
        value_name = "FILE",
        requires = "manifest",
        help = "Offline mode: a tx-builder batch document."
    )]
    batch: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        requires = "batch",
        help = "Offline mode: the deploy manifest for --batch."
    )]
    manifest: Option<PathBuf>,

    #[arg(long, value_name = "SAFE", help = "The address of the Safe multisig.")]
    safe: Option<Address>,

    #[arg(long, value_name = "ORG", help = "GitHub org the source repos live under.")]
    org: String,

    #[arg(
        long = "repo",
        value_name = "REPO",
        help = "Allow-listed source repo, repeatable."
    )]
    repos: Vec<String>,

    #[arg(
        long = "deploy-repo",
        value_name = "REPO",
        help = "Repo holding deploys/<hash>.json manifests, repeatable, searched in order."
    )]
    deploy_repos: Vec<String>,

    #[arg(long, value_name = "DIR", default_value = "sandbox")]
    sandbox: PathBuf,

    #[arg(long, value_name = "FACTORY", default_value_t = DETERMINISTIC_FACTORY)]
    factory: Address,

    #[arg(long, value_name = "ID", default_value = "1")]
    chain_id: u64,

    #[arg(
        long,
        value_name = "URL",
        help = "Explicit transaction service URL, overrides --chain-id."
    )]
    tx_service_url: Option<String>,
}

impl VerifyCommand {
    pub async fn execute(self) -> eyre::Result<()> {
        let config = VerifierConfig {
            org: self.org.clone(),
            allowed_repos: self.repos.clone(),
            deploy_repos: self.deploy_repos.clone(),
            sandbox: self.sandbox.clone(),
            factory: self.factory,
            out_dir: forkops_verifier::verify::DEFAULT_OUT_DIR.to_string(),
        };
        let verifier = DeployVerifier::new(ForgeToolchain, config);

        if let (Some(batch), Some(manifest)) = (&self.batch, &self.manifest) {
            let batch: Batch = serde_json::from_slice(&tokio::fs::read(batch).await?)?;
            let manifest: DeployManifest =
                serde_json::from_slice(&tokio::fs::read(manifest).await?)?;
            let results = verifier.verify_batch(&batch, &manifest).await?;
            print_results(&results);
            return Ok(());
        }

        let service = match &self.tx_service_url {
            Some(url) => SafeClient::with_url(url),
            None => SafeClient::new(self.chain_id)?,
        };

        let transactions = if self.hashes.is_empty() {
            let safe = self
                .safe
                .ok_or_else(|| eyre::eyre!("--safe is required when no hashes are given"))?;
            executable_queue(service.pending_transactions(safe).await?)
        } else {
            let mut txs = Vec::with_capacity(self.hashes.len());
            for hash in &self.hashes {
                txs.push(service.transaction(*hash).await?);
            }
            txs
        };

        for tx in &transactions {
            println!(
                "Verifying tx {}...",
                tx.safe_tx_hash.to_string().bright_green()
            );
            let results = verifier.verify_transaction(tx).await?;
            print_results(&results);
        }
        Ok(())
    }
}

fn print_results(results: &[VerifiedDeployment]) {
    for result in results {
        let line = match &result.verdict {
            Verdict::Match { exact: true } => "match (exact)".bright_green(),
            Verdict::Match { exact: false } => "match (metadata stripped)".bright_yellow(),
            Verdict::Mismatch { reason } => format!("MISMATCH: {reason}").bright_red(),
        };
        println!("{} {} {line}", result.address, result.contract_name);
    }
}
