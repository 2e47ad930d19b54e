use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use eyre::{ensure, WrapErr};
use tokio::process::Command;
use tracing::info;

/// Fetches and compiles contract sources. The verification engine only
/// depends on this trait, tests substitute a fake that writes artifacts
/// directly.
#[async_trait]
pub trait BuildToolchain: Send + Sync {
    /// Clones `url` into `dest`, optionally pinned to `commit`.
    async fn fetch_source(&self, url: &str, commit: Option<&str>, dest: &Path)
        -> eyre::Result<()>;

    /// Installs dependencies and compiles the checkout at `dir`. With
    /// `bytecode_hash` off the compiler is told to omit metadata hashes.
    async fn build(&self, dir: &Path, forge_flags: &str, bytecode_hash: bool) -> eyre::Result<()>;
}

/// Real toolchain: `git` + `yarn` + `forge`, all expected on PATH.
pub struct ForgeToolchain;

async fn run(mut cmd: Command, what: &str) -> eyre::Result<()> {
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .wrap_err_with(|| format!("failed to spawn {what}"))?;
    ensure!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

#[async_trait]
impl BuildToolchain for ForgeToolchain {
    async fn fetch_source(
        &self,
        url: &str,
        commit: Option<&str>,
        dest: &Path,
    ) -> eyre::Result<()> {
        info!(url, dest = %dest.display(), "cloning");
        let mut clone = Command::new("git");
        clone.args(["clone", "--quiet", url]).arg(dest);
        run(clone, "git clone").await?;

        if let Some(commit) = commit {
            info!(commit, "pinning checkout");
            let mut reset = Command::new("git");
            reset.arg("-C").arg(dest).args(["reset", "--hard", commit]);
            run(reset, "git reset").await?;
        }
        Ok(())
    }

    async fn build(&self, dir: &Path, forge_flags: &str, bytecode_hash: bool) -> eyre::Result<()> {
        info!(dir = %dir.display(), "yarn install");
        let mut install = Command::new("yarn");
        install
            .args(["install", "--frozen-lockfile", "--silent"])
            .current_dir(dir);
        run(install, "yarn install").await?;

        info!(dir = %dir.display(), flags = forge_flags, "forge build");
        let mut build = Command::new("forge");
        build
            .arg("build")
            .args(forge_flags.split_whitespace())
            .current_dir(dir);
        if !bytecode_hash {
            build.env("FOUNDRY_BYTECODE_HASH", "none");
        }
        run(build, "forge build").await
    }
}
