use std::{collections::BTreeMap, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Compiler and optimizer settings one deployment was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerInfo {
    pub enabled: bool,
    #[serde(default)]
    pub runs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Compiler version, e.g. `0.8.17+commit.8df45f5f`.
    pub compiler: String,
    pub optimizer: OptimizerInfo,
    /// Source path of the form `@<org>/<repo>/<path/to/Contract.sol>`.
    pub source: String,
    #[serde(default)]
    pub commit: Option<String>,
}

/// One deployed contract as recorded in a `deploys/<safe-tx-hash>.json`
/// manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub contract_name: String,
    pub contract_address: Address,
    #[serde(default)]
    pub constructor_arguments: Vec<String>,
    #[serde(default = "default_true")]
    pub verify: bool,
    #[serde(default)]
    pub verified: bool,
    pub metadata: SourceMetadata,
    /// ABI-encoded constructor arguments, hex without `0x` prefix.
    #[serde(default)]
    pub encoded_constructor_args: String,
}

fn default_true() -> bool {
    true
}

/// A deploy manifest maps free-form labels to contract entries.
pub type DeployManifest = BTreeMap<String, ManifestEntry>;

/// Source repository resolved from a manifest entry, with the build settings
/// every entry of that repo must agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMeta {
    /// Repo name with `@org/` prefix.
    pub repo: String,
    pub commit: Option<String>,
    pub forge_flags: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("unknown repo for source '{0}'")]
    UnknownRepo(String),
    #[error("unknown org for source '{0}'")]
    UnknownOrg(String),
    #[error("repo is not allow-listed for source '{0}'")]
    NotAllowed(String),
    #[error("deploy uses multiple commits from repo {0}")]
    CommitConflict(String),
    #[error("deploy uses different forge settings within repo {0}")]
    FlagsConflict(String),
}

/// Resolves the source repo of a manifest entry, rejecting anything outside
/// `org` and `allowed_repos`.
pub fn contract_repo(
    entry: &ManifestEntry,
    org: &str,
    allowed_repos: &[String],
) -> Result<RepoMeta, ManifestError> {
    let source = &entry.metadata.source;
    let mut parts = source
        .split('/')
        .filter(|p| *p != "node_modules")
        .map(str::to_lowercase);
    let src_org = parts
        .next()
        .ok_or_else(|| ManifestError::UnknownRepo(source.clone()))?;
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ManifestError::UnknownRepo(source.clone()))?;

    if src_org.strip_prefix('@') != Some(&org.to_lowercase()) {
        return Err(ManifestError::UnknownOrg(source.clone()));
    }
    if !allowed_repos.iter().any(|r| r.to_lowercase() == name) {
        return Err(ManifestError::NotAllowed(source.clone()));
    }

    Ok(RepoMeta {
        repo: format!("{src_org}/{name}"),
        commit: entry.metadata.commit.clone(),
        forge_flags: forge_build_flags(&entry.metadata),
    })
}

/// CLI flags for `forge build`, derived from the recorded compiler settings.
pub fn forge_build_flags(meta: &SourceMetadata) -> String {
    let mut flags: Vec<String> = Vec::new();
    if !meta.compiler.is_empty() {
        let version = meta.compiler.split('+').next().unwrap_or(&meta.compiler);
        flags.push("--use".to_string());
        flags.push(version.to_string());
    }
    if meta.optimizer.enabled {
        flags.push("--optimize".to_string());
        if let Some(runs) = meta.optimizer.runs {
            flags.push("--optimizer-runs".to_string());
            flags.push(runs.to_string());
        }
    }
    flags.join(" ")
}

/// Groups manifest entries by source repo and checks that each repo is
/// pinned to a single commit and a single set of forge flags.
pub fn gather_repos(
    manifest: &DeployManifest,
    org: &str,
    allowed_repos: &[String],
) -> Result<BTreeMap<String, RepoMeta>, ManifestError> {
    let mut repos: BTreeMap<String, RepoMeta> = BTreeMap::new();
    for entry in manifest.values() {
        let meta = contract_repo(entry, org, allowed_repos)?;
        if let Some(old) = repos.get(&meta.repo) {
            if old.commit != meta.commit {
                return Err(ManifestError::CommitConflict(meta.repo));
            }
            if old.forge_flags != meta.forge_flags {
                return Err(ManifestError::FlagsConflict(meta.repo));
            }
        }
        repos.insert(meta.repo.clone(), meta);
    }
    Ok(repos)
}

/// Clone URL for a `@org/name` repo.
pub fn github_url(repo: &str) -> String {
    let path = repo.trim_start_matches('@').trim_end_matches('/');
    format!("https://github.com/{path}.git")
}

/// Directory name a repo is checked out under.
pub fn checkout_name(repo: &str) -> &str {
    repo.rsplit('/').next().unwrap_or(repo)
}

/// Looks for `deploys/<safe_tx_hash>.json` across the fetched deploy repos,
/// first readable manifest wins.
pub async fn find_deploy_manifest(
    sandbox: &Path,
    deploy_repos: &[String],
    safe_tx_hash: &str,
) -> eyre::Result<DeployManifest> {
    for repo in deploy_repos {
        let path = sandbox
            .join(checkout_name(repo))
            .join("deploys")
            .join(format!("{safe_tx_hash}.json"));
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), %err, "deploy manifest not readable");
                continue;
            }
        };
        match serde_json::from_slice(&content) {
            Ok(manifest) => return Ok(manifest),
            Err(err) => warn!(path = %path.display(), %err, "deploy manifest not parseable"),
        }
    }
    eyre::bail!("deploy manifest for safe tx {safe_tx_hash} not found")
}
