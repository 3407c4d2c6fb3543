//! Interactive menu over a local ledger.

use anyhow::{anyhow, Result};
use ledger_core::{Ledger, LedgerConfig, LedgerStore, PartyIndex, ValidationReport};
use ledger_storage::JsonFileStore;
use std::{
    io::{BufRead, Write},
    path::Path,
};
use tracing::warn;

const START_MENU: &str = "\
1. Create a new blockchain
2. Import a JSON file (.txt)
3. Exit the program
";

const MAIN_MENU: &str = "\
1. Add transaction
2. Verify blockchain
3. View blockchain
4. Corrupt block
5. Fix corruption
6. Export blockchain to json
7. Change difficulty
8. Print recipients by sender
9. Print senders by recipient
10.Quit
";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    AddTransaction,
    Verify,
    View,
    Corrupt,
    Repair,
    Export,
    ChangeDifficulty,
    RecipientsBySender,
    SendersByRecipient,
    Quit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        let choice = match input.trim().parse::<u8>().ok()? {
            1 => MenuChoice::AddTransaction,
            2 => MenuChoice::Verify,
            3 => MenuChoice::View,
            4 => MenuChoice::Corrupt,
            5 => MenuChoice::Repair,
            6 => MenuChoice::Export,
            7 => MenuChoice::ChangeDifficulty,
            8 => MenuChoice::RecipientsBySender,
            9 => MenuChoice::SendersByRecipient,
            10 => MenuChoice::Quit,
            _ => return None,
        };
        Some(choice)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Reads a ledger from a JSON file, refusing missing or malformed files.
pub fn load_ledger(path: &Path, config: LedgerConfig) -> Result<Ledger> {
    let document = JsonFileStore::new(path)
        .load()?
        .ok_or_else(|| anyhow!("{} does not exist", path.display()))?;
    Ok(Ledger::from_document(document, config)?)
}

pub fn write_report<W: Write>(out: &mut W, report: &ValidationReport) -> std::io::Result<()> {
    match report {
        ValidationReport::SizeMismatch { .. } => writeln!(
            out,
            "Blockchain size is not the same as the difficulty list size"
        ),
        ValidationReport::Checked { verdicts } => {
            for verdict in verdicts {
                if verdict.is_valid() {
                    writeln!(out, "Block at index {} is a valid block", verdict.index)?;
                } else {
                    writeln!(out, "Block at index {} is not a valid block", verdict.index)?;
                }
            }
            Ok(())
        }
    }
}

/// Menu-driven operator session. End of input behaves like choosing quit.
pub struct Shell<R, W> {
    input: R,
    output: W,
    config: LedgerConfig,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W, config: LedgerConfig) -> Self {
        Self {
            input,
            output,
            config,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Start-up menu: create a chain or import one. `None` means exit.
    pub fn start(&mut self) -> Result<Option<Ledger>> {
        loop {
            let Some(choice) = self.prompt(&format!("{START_MENU}Enter your choice: "))? else {
                return Ok(None);
            };
            match choice.trim() {
                "1" => return Ok(Some(Ledger::new(self.config.clone()))),
                "2" => {
                    let Some(file) = self.prompt("Enter name of file to load JSON to:")? else {
                        return Ok(None);
                    };
                    match load_ledger(Path::new(file.trim()), self.config.clone()) {
                        Ok(ledger) => return Ok(Some(ledger)),
                        Err(e) => {
                            warn!("load failed: {e:#}");
                            writeln!(self.output, "Unable to load json \n")?;
                        }
                    }
                }
                "3" => {
                    writeln!(self.output, "Exiting program...")?;
                    return Ok(None);
                }
                _ => writeln!(self.output, "Invalid option! Please enter a valid integer.")?,
            }
        }
    }

    pub fn run(&mut self, ledger: &mut Ledger) -> Result<()> {
        loop {
            let Some(line) = self.prompt(&format!("{MAIN_MENU}Enter your choice: "))? else {
                return Ok(());
            };
            let Some(choice) = MenuChoice::parse(&line) else {
                writeln!(self.output, "\nInvalid choice. Please try again.")?;
                continue;
            };
            if self.dispatch(ledger, choice)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn dispatch(&mut self, ledger: &mut Ledger, choice: MenuChoice) -> Result<Flow> {
        match choice {
            MenuChoice::AddTransaction => {
                let Some(sender) = self.prompt("Sender: ")? else {
                    return Ok(Flow::Quit);
                };
                let Some(recipient) = self.prompt("Receiver: ")? else {
                    return Ok(Flow::Quit);
                };
                let Some(data) = self.prompt("Data: ")? else {
                    return Ok(Flow::Quit);
                };
                match ledger.add_transaction(&sender, &recipient, &data) {
                    Ok(block) => writeln!(self.output, "Block mined with nonce {}", block.nonce)?,
                    Err(e) => writeln!(self.output, "Error: {e}")?,
                }
            }
            MenuChoice::Verify => write_report(&mut self.output, &ledger.validate())?,
            MenuChoice::View => {
                for block in ledger.blocks() {
                    writeln!(self.output, "Previous Hash: {}", block.previous_hash)?;
                    writeln!(self.output, "Sender: {}", block.sender)?;
                    writeln!(self.output, "Recipient: {}", block.recipient)?;
                    writeln!(self.output, "Data: {}", block.data)?;
                    writeln!(self.output, "Nonce: {}", block.nonce)?;
                    writeln!(self.output, "Difficulty: {}", block.difficulty)?;
                    writeln!(self.output)?;
                }
            }
            MenuChoice::Corrupt => {
                let Some(index) = self.prompt_index(ledger.len())? else {
                    return Ok(Flow::Quit);
                };
                let Some(data) = self.prompt("Input a new data: ")? else {
                    return Ok(Flow::Quit);
                };
                ledger.corrupt(index, data)?;
            }
            MenuChoice::Repair => match ledger.repair() {
                Ok(changed) => writeln!(self.output, "Repaired {changed} block(s)")?,
                Err(e) => writeln!(self.output, "Error: {e}")?,
            },
            MenuChoice::Export => {
                let Some(file) = self.prompt("Enter name of file to save JSON to: ")? else {
                    return Ok(Flow::Quit);
                };
                let file = file.trim();
                match ledger.save_to(&JsonFileStore::new(file)) {
                    Ok(()) => writeln!(self.output, "JSON saved to file {file}")?,
                    Err(e) => {
                        warn!("export failed: {e:#}");
                        writeln!(self.output, "Error: could not open file for writing to: {file}")?
                    }
                }
            }
            MenuChoice::ChangeDifficulty => {
                let Some(index) = self.prompt_index(ledger.len())? else {
                    return Ok(Flow::Quit);
                };
                let Some(difficulty) = self.prompt_difficulty(ledger.config().max_difficulty)?
                else {
                    return Ok(Flow::Quit);
                };
                ledger.change_difficulty(index, difficulty)?;
            }
            MenuChoice::RecipientsBySender => self.write_index(ledger.sender_map())?,
            MenuChoice::SendersByRecipient => self.write_index(ledger.receiver_map())?,
            MenuChoice::Quit => {
                writeln!(self.output, "\nExiting program...")?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn write_index(&mut self, index: &PartyIndex) -> Result<()> {
        for (party, counterparties) in index {
            write!(self.output, "{party}: ")?;
            for counterparty in counterparties {
                write!(self.output, "{counterparty} ")?;
            }
            writeln!(self.output)?;
        }
        Ok(())
    }

    fn prompt_index(&mut self, len: usize) -> Result<Option<usize>> {
        let mut label = "Enter block index number: ";
        loop {
            let Some(line) = self.prompt(label)? else {
                return Ok(None);
            };
            match line.trim().parse::<usize>() {
                Ok(index) if index < len => return Ok(Some(index)),
                _ => label = "Invalid index! Please try again: ",
            }
        }
    }

    fn prompt_difficulty(&mut self, max: u32) -> Result<Option<u32>> {
        let mut label = "Input a new difficulty: ";
        loop {
            let Some(line) = self.prompt(label)? else {
                return Ok(None);
            };
            match line.trim().parse::<u32>() {
                Ok(difficulty) if difficulty <= max => return Ok(Some(difficulty)),
                _ => label = "Invalid difficulty! Please try again: ",
            }
        }
    }

    /// Writes `label` and reads one line without its terminator.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
