mod cmd;
use clap::{Parser, Subcommand};
use cmd::analyze::AnalyzeArgs;
use eyre::Result;

#[derive(Subcommand, Debug)]
pub enum EPSubcommand {
    #[command(about = "Summarize frame latency and stage CPU time from a timing report")]
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "encprobe CLI: inspect the timing reports written by an instrumented encoder"
)]
pub struct EPArgs {
    #[command(subcommand)]
    pub cmd: EPSubcommand,
}

fn main() -> Result<()> {
    let root_args = EPArgs::parse();

    match root_args.cmd {
        EPSubcommand::Analyze(args) => {
            args.run()?;
        }
    }

    Ok(())
}
