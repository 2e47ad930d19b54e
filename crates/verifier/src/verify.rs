use std::{collections::BTreeMap, path::PathBuf};

use alloy_dyn_abi::{DynSolType, Specifier};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{hex, Address};
use eyre::WrapErr;
use forkops_primitives::{
    create2::{DeploymentCandidate, DETERMINISTIC_FACTORY},
    pending::PendingTransaction,
};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    artifact::{ArtifactIndex, ForgeArtifact},
    batch::Batch,
    extract,
    manifest::{self, DeployManifest, ManifestEntry, RepoMeta},
    metadata::{has_auxdata, split_auxdata},
    toolchain::BuildToolchain,
};

pub const DEFAULT_OUT_DIR: &str = "forge-out";

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// GitHub org every source repo must belong to, without the `@`.
    pub org: String,
    /// Source repos that may be built.
    pub allowed_repos: Vec<String>,
    /// Repos searched for `deploys/<hash>.json` manifests, in order.
    pub deploy_repos: Vec<String>,
    /// Scratch directory for checkouts, logs and persisted transactions.
    pub sandbox: PathBuf,
    pub factory: Address,
    /// Forge output directory name inside each checkout.
    pub out_dir: String,
}

impl VerifierConfig {
    pub fn new(org: impl Into<String>, sandbox: impl Into<PathBuf>) -> Self {
        Self {
            org: org.into(),
            allowed_repos: Vec::new(),
            deploy_repos: Vec::new(),
            sandbox: sandbox.into(),
            factory: DETERMINISTIC_FACTORY,
            out_dir: DEFAULT_OUT_DIR.to_string(),
        }
    }
}

/// Outcome for one deployment address. A mismatch is a result, not an
/// error; only infrastructure failures abort a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Bytecode matches. `exact` when the compiled artifact still carries
    /// its metadata trailer, so the comparison covered every byte.
    Match { exact: bool },
    Mismatch { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedDeployment {
    pub address: Address,
    pub contract_name: String,
    pub verdict: Verdict,
}

/// Rebuilds the sources a deploy manifest points at and compares the
/// compiled bytecode against the initcode of each extracted deployment.
pub struct DeployVerifier<T> {
    toolchain: T,
    config: VerifierConfig,
}

impl<T: BuildToolchain> DeployVerifier<T> {
    pub fn new(toolchain: T, config: VerifierConfig) -> Self {
        Self { toolchain, config }
    }

    /// Resets the sandbox to an empty directory.
    pub async fn prepare_sandbox(&self) -> eyre::Result<()> {
        let dir = &self.config.sandbox;
        if tokio::fs::try_exists(dir).await? {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    /// Verifies every deterministic deployment found in one pending
    /// transaction, discovering its manifest in the configured deploy repos.
    pub async fn verify_transaction(
        &self,
        tx: &PendingTransaction,
    ) -> eyre::Result<Vec<VerifiedDeployment>> {
        info!(hash = %tx.safe_tx_hash, "verifying safe transaction");
        self.prepare_sandbox().await?;

        let copy = serde_json::to_vec_pretty(tx)?;
        let path = self
            .config
            .sandbox
            .join(format!("{}.tx.json", tx.safe_tx_hash));
        tokio::fs::write(&path, copy)
            .await
            .wrap_err_with(|| format!("cannot persist transaction to {}", path.display()))?;

        let manifest = self.find_manifest(&tx.safe_tx_hash.to_string()).await?;
        let candidates = extract::candidates_from_transaction(tx, self.config.factory);
        self.verify_candidates(&candidates, &manifest).await
    }

    /// Offline entry point: a tx-builder batch document plus its manifest.
    pub async fn verify_batch(
        &self,
        batch: &Batch,
        manifest: &DeployManifest,
    ) -> eyre::Result<Vec<VerifiedDeployment>> {
        self.prepare_sandbox().await?;
        let candidates = extract::candidates_from_batch(batch, self.config.factory);
        self.verify_candidates(&candidates, manifest).await
    }

    async fn find_manifest(&self, safe_tx_hash: &str) -> eyre::Result<DeployManifest> {
        try_join_all(self.config.deploy_repos.iter().map(|repo| async move {
            let url = manifest::github_url(&format!("@{}/{repo}", self.config.org));
            let dest = self.config.sandbox.join(repo);
            self.toolchain.fetch_source(&url, None, &dest).await
        }))
        .await?;
        manifest::find_deploy_manifest(&self.config.sandbox, &self.config.deploy_repos, safe_tx_hash)
            .await
    }

    pub async fn verify_candidates(
        &self,
        candidates: &[DeploymentCandidate],
        manifest: &DeployManifest,
    ) -> eyre::Result<Vec<VerifiedDeployment>> {
        if candidates.is_empty() {
            info!("no deterministic deployments to verify");
            return Ok(Vec::new());
        }
        let repos = manifest::gather_repos(manifest, &self.config.org, &self.config.allowed_repos)?;
        let index = self.build_repos(&repos).await?;
        debug!(artifacts = index.len(), "indexed build artifacts");

        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let address = candidate.address(self.config.factory)?;
            let entry = manifest
                .values()
                .find(|e| e.contract_address == address)
                .ok_or_else(|| eyre::eyre!("no manifest entry for deployment at {address}"))?;
            let artifact = index.get(&entry.metadata.source).ok_or_else(|| {
                eyre::eyre!("no build artifact for source '{}'", entry.metadata.source)
            })?;

            let verdict = self.check_candidate(address, candidate, entry, artifact).await?;
            match &verdict {
                Verdict::Match { exact } => {
                    info!(%address, contract = entry.contract_name, exact, "bytecode matches")
                }
                Verdict::Mismatch { reason } => {
                    warn!(%address, contract = entry.contract_name, reason, "bytecode mismatch")
                }
            }
            out.push(VerifiedDeployment {
                address,
                contract_name: entry.contract_name.clone(),
                verdict,
            });
        }
        Ok(out)
    }

    /// Clones and builds each source repo, then indexes its artifacts.
    /// Distinct repos are fetched and built concurrently.
    async fn build_repos(
        &self,
        repos: &BTreeMap<String, RepoMeta>,
    ) -> eyre::Result<ArtifactIndex> {
        try_join_all(repos.values().map(|meta| self.fetch_and_build(meta))).await?;

        let mut index = ArtifactIndex::default();
        for meta in repos.values() {
            let out_dir = self
                .config
                .sandbox
                .join(manifest::checkout_name(&meta.repo))
                .join(&self.config.out_dir);
            index.scan_repo(&meta.repo, &out_dir)?;
        }
        Ok(index)
    }

    async fn fetch_and_build(&self, meta: &RepoMeta) -> eyre::Result<()> {
        let dest = self.config.sandbox.join(manifest::checkout_name(&meta.repo));
        self.toolchain
            .fetch_source(&manifest::github_url(&meta.repo), meta.commit.as_deref(), &dest)
            .await?;
        self.toolchain.build(&dest, &meta.forge_flags, false).await
    }

    async fn check_candidate(
        &self,
        address: Address,
        candidate: &DeploymentCandidate,
        entry: &ManifestEntry,
        artifact: &ForgeArtifact,
    ) -> eyre::Result<Verdict> {
        let compiled = artifact.bytecode_bytes()?;
        let args = hex::decode(&entry.encoded_constructor_args)
            .wrap_err("encoded constructor arguments are not valid hex")?;

        let mut verdict = match_bytecode(&candidate.initcode, &compiled, &args);
        if matches!(verdict, Verdict::Match { .. }) && !args.is_empty() {
            if let Err(reason) = roundtrip_constructor_args(&artifact.abi, &args) {
                verdict = Verdict::Mismatch { reason };
            }
        }

        self.write_log(address, &candidate.initcode, &compiled, &args)
            .await?;
        Ok(verdict)
    }

    /// Diagnostic artifact written for every address, match or not.
    async fn write_log(
        &self,
        address: Address,
        candidate: &[u8],
        compiled: &[u8],
        args: &[u8],
    ) -> eyre::Result<()> {
        let mut forge_bytecode = compiled.to_vec();
        forge_bytecode.extend_from_slice(args);
        let match_len = common_prefix_len(candidate, &forge_bytecode);

        let log = format!(
            "MATCH === {}\n\n\
             CREATE2 LENGTH: {}\n\
             FORGE BYTECODE LENGTH: {}\n\
             MATCH LEN: {}\n\n\
             ----------- CREATE2 BYTECODE TAIL -----------------\n{}\n\n\
             ----------- FORGE BYTECODE TAIL -----------------\n{}\n\n\
             ----------- CREATE2 TRANSACTION BYTECODE -----------------\n{}\n\n\
             ----------- FORGE BYTECODE -----------------\n{}\n\n\
             ----------- CONSTRUCTOR ARGS -----------------\n{}\n",
            candidate == forge_bytecode.as_slice(),
            candidate.len(),
            forge_bytecode.len(),
            match_len,
            hex::encode(&candidate[match_len.min(candidate.len())..]),
            hex::encode(&forge_bytecode[match_len.min(forge_bytecode.len())..]),
            hex::encode(candidate),
            hex::encode(&forge_bytecode),
            hex::encode(args),
        );

        let path = self.config.sandbox.join(format!("{address}.log"));
        tokio::fs::write(&path, log)
            .await
            .wrap_err_with(|| format!("cannot write verification log {}", path.display()))
    }
}

/// Compares deployed initcode against compiled creation bytecode.
///
/// The encoded constructor arguments must form the suffix of the initcode.
/// An identical remainder is a match, exact when the artifact still carries
/// a metadata trailer. Otherwise the artifact's trailer is stripped and a
/// prefix comparison tolerates metadata differences on either side.
fn match_bytecode(candidate: &[u8], compiled: &[u8], args: &[u8]) -> Verdict {
    if !candidate.ends_with(args) {
        return Verdict::Mismatch {
            reason: "constructor arguments are not a suffix of the initcode".to_string(),
        };
    }
    let code = &candidate[..candidate.len() - args.len()];
    if code == compiled {
        return Verdict::Match {
            exact: has_auxdata(compiled),
        };
    }
    let base = split_auxdata(compiled).map(|(head, _)| head).unwrap_or(compiled);
    if !base.is_empty() && code.starts_with(base) {
        return Verdict::Match { exact: false };
    }
    Verdict::Mismatch {
        reason: format!(
            "bytecode diverges after {} of {} compiled bytes",
            common_prefix_len(code, compiled),
            compiled.len()
        ),
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Decodes the encoded constructor arguments against the artifact's
/// constructor parameter types, re-encodes, and requires the bytes to come
/// back unchanged. Catches arguments that only decode by accident.
fn roundtrip_constructor_args(abi: &JsonAbi, args: &[u8]) -> Result<(), String> {
    let Some(constructor) = abi.constructor() else {
        return Err("constructor arguments present but artifact has no constructor".to_string());
    };
    let types = constructor
        .inputs
        .iter()
        .map(|param| param.resolve())
        .collect::<Result<Vec<DynSolType>, _>>()
        .map_err(|err| format!("cannot resolve constructor parameter types: {err}"))?;
    let value = DynSolType::Tuple(types)
        .abi_decode_params(args)
        .map_err(|err| format!("constructor arguments do not decode: {err}"))?;
    if value.abi_encode_params() != args {
        return Err("constructor arguments do not round-trip".to_string());
    }
    Ok(())
}
