mod commands;
mod utils;
pub use utils::*;

use clap::{Args, CommandFactory, Parser, Subcommand};
use commands::{bridge, list};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: CommonOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct CommonOptions {
    /// Log verbosity level
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    /// Path to log file to write to. Defaults
    /// to system log file at ~/.serimidi/log/<command>.log
    #[arg(long, global = true)]
    log: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports and standard baud rates
    Ports,
    /// List MIDI inputs and outputs
    Devices,
    /// Forward MIDI from a serial port to a MIDI output
    Bridge(bridge::Options),
    /// `serimidi completions --generate=zsh > serimidi.zsh`
    Completions(Completions),
}

#[derive(Debug, Parser)]
#[command(arg_required_else_help(true))]
struct Completions {
    /// shell to generate the completion script for
    #[arg(long = "generate", value_enum)]
    shell: Option<clap_complete::Shell>,
}

impl Completions {
    fn generate(&self) -> anyhow::Result<()> {
        let Some(shell) = self.shell else {
            anyhow::bail!("no shell specified for autocompletion generation");
        };

        let mut stdout = std::io::stdout();
        stdout.flush()?;

        let mut cli = Cli::command();
        clap_complete::generate(shell, &mut cli, "serimidi", &mut stdout);

        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let result = match args.command {
        Commands::Ports => list::ports(),
        Commands::Devices => list::devices(),
        Commands::Bridge(opts) => bridge::run(opts, args.opts),
        Commands::Completions(ref c) => c.generate(),
    };

    if let Err(e) = result {
        if logger::is_active() {
            log::error!("{e}");
        } else {
            use colored::*;
            eprintln!("{} {}", "Error:".red().bold(), format!("{e}").bold());
        }
        std::process::exit(1);
    }

    Ok(())
}
