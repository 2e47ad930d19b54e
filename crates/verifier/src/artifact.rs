use std::{collections::BTreeMap, fs, path::Path};

use alloy_json_abi::JsonAbi;
use alloy_primitives::hex;
use eyre::WrapErr;
use serde::Deserialize;
use tracing::debug;

/// The parts of a forge output JSON file the verifier consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ForgeArtifact {
    pub abi: JsonAbi,
    pub bytecode: BytecodeObject,
    pub ast: AstSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BytecodeObject {
    /// Creation bytecode as a hex string.
    pub object: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AstSummary {
    #[serde(rename = "absolutePath")]
    pub absolute_path: String,
}

impl ForgeArtifact {
    pub fn bytecode_bytes(&self) -> eyre::Result<Vec<u8>> {
        hex::decode(&self.bytecode.object).wrap_err("artifact bytecode is not valid hex")
    }
}

/// Build artifacts keyed by `@org/repo/<ast.absolutePath>`, the same form as
/// a manifest entry's `metadata.source`. Keys are compared
/// case-insensitively, since manifest sources and repo names vary in case.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    artifacts: BTreeMap<String, ForgeArtifact>,
}

impl ArtifactIndex {
    /// Walks a repo's forge output directory and indexes every artifact in
    /// it. Files that do not parse as artifacts are skipped; two artifacts
    /// claiming the same source path are a hard error.
    pub fn scan_repo(&mut self, repo: &str, out_dir: &Path) -> eyre::Result<()> {
        for entry in fs::read_dir(out_dir)
            .wrap_err_with(|| format!("cannot read forge output dir {}", out_dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                self.scan_repo(repo, &path)?;
                continue;
            }
            let Ok(content) = fs::read(&path) else {
                continue;
            };
            let artifact: ForgeArtifact = match serde_json::from_slice(&content) {
                Ok(artifact) => artifact,
                Err(err) => {
                    debug!(path = %path.display(), %err, "not a forge artifact");
                    continue;
                }
            };
            let key = format!("{repo}/{}", artifact.ast.absolute_path).to_lowercase();
            if self.artifacts.contains_key(&key) {
                eyre::bail!(
                    "duplicate absolutePath {} found in {}",
                    artifact.ast.absolute_path,
                    path.display()
                );
            }
            self.artifacts.insert(key, artifact);
        }
        Ok(())
    }

    pub fn get(&self, source: &str) -> Option<&ForgeArtifact> {
        self.artifacts.get(&source.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
