use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use forkops::cmd::{replay::ReplayCommand, verify::VerifyCommand};

#[derive(Debug, Parser)]
#[command(
    name = "forkops",
    about = "Replay pending Safe governance transactions on a forked chain and verify deterministic deployments.",
    version,
    term_width = 80,
    styles = get_color_style()
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub debug: bool,
}

impl Cli {
    pub async fn run(self) -> eyre::Result<()> {
        match self.command {
            Commands::Replay(replay) => replay.execute().await,
            Commands::Verify(verify) => verify.execute().await,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "replay")]
    Replay(ReplayCommand),

    #[command(name = "verify")]
    Verify(VerifyCommand),
}

fn get_color_style() -> Styles {
    Styles::styled()
        .usage(AnsiColor::Green.on_default().bold().underline())
        .header(AnsiColor::Yellow.on_default().bold().underline())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}
