mod remote;
mod shell;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY},
    LedgerConfig,
};
use remote::NodeClient;
use shell::{load_ledger, write_report, Shell};
use std::{io, path::PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Operate a tamper-evident ledger locally or through a node")]
struct Cli {
    /// Difficulty for newly appended blocks
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = clap::value_parser!(u32).range(0..=MAX_DIFFICULTY as i64)
    )]
    difficulty: u32,

    /// Give up mining a block after this many nonces
    #[arg(long, global = true)]
    max_iterations: Option<u64>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive menu over a local ledger
    Shell {
        /// Ledger file to open instead of showing the start-up menu
        #[arg(long)]
        load: Option<PathBuf>,
    },
    /// Check every block of a ledger file; fails if any block is invalid
    Verify {
        file: PathBuf,
    },
    /// Talk to a running ledger-node
    Remote {
        /// Node base URL (e.g. http://127.0.0.1:8080)
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        node: String,
        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Subcommand, Debug)]
enum RemoteAction {
    /// Show height and tip hash
    Head,
    /// Mine and append a transaction
    Add {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        data: String,
    },
    /// Validate the node's chain
    Validate,
    /// Overwrite a block's payload without re-mining
    Corrupt {
        #[arg(long)]
        index: usize,
        #[arg(long)]
        data: String,
    },
    /// Re-link and re-mine the whole chain
    Repair,
    /// Set a block's difficulty without re-mining
    Difficulty {
        #[arg(long)]
        index: usize,
        #[arg(long)]
        difficulty: u32,
    },
    /// Print the ledger document, optionally saving it to a file
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Recipients keyed by sender
    Senders,
    /// Senders keyed by recipient
    Receivers,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::default()
        .with_difficulty(cli.difficulty)
        .with_max_iterations(cli.max_iterations);

    match cli.cmd {
        Command::Shell { load } => {
            let stdin = io::stdin();
            let mut shell = Shell::new(stdin.lock(), io::stdout(), config.clone());
            let ledger = match load {
                Some(path) => Some(load_ledger(&path, config)?),
                None => shell.start()?,
            };
            if let Some(mut ledger) = ledger {
                shell.run(&mut ledger)?;
            }
        }
        Command::Verify { file } => {
            let ledger = load_ledger(&file, config)?;
            let report = ledger.validate();
            write_report(&mut io::stdout(), &report)?;
            if !report.is_valid() {
                bail!("{} is not a valid chain", file.display());
            }
        }
        Command::Remote { node, action } => {
            let client = NodeClient::new(&node);
            let value = match action {
                RemoteAction::Head => client.head().await?,
                RemoteAction::Add {
                    sender,
                    recipient,
                    data,
                } => client.add(&sender, &recipient, &data).await?,
                RemoteAction::Validate => client.validate().await?,
                RemoteAction::Corrupt { index, data } => client.corrupt(index, &data).await?,
                RemoteAction::Repair => client.repair().await?,
                RemoteAction::Difficulty { index, difficulty } => {
                    client.change_difficulty(index, difficulty).await?
                }
                RemoteAction::Export { output } => client.export(output).await?,
                RemoteAction::Senders => client.senders().await?,
                RemoteAction::Receivers => client.receivers().await?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
