use std::path::PathBuf;

use clap::Parser;

/// GridOps: ask a language model about the grid, backed by a tool server.
#[derive(Parser, Debug)]
#[command(name = "gridops", version, about)]
pub struct Args {
    /// Tool server script (.py or .js).
    pub server_script: PathBuf,

    /// Initial model as provider:model (defaults to the configured model).
    pub model: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter directive override, e.g. `gridops=debug`.
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

/// One line typed at the operator prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Context,
    Models,
    Help,
    ChangeModel(String),
    Query(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        match line.to_lowercase().as_str() {
            "quit" | "exit" => return Command::Quit,
            "context" => return Command::Context,
            "models" => return Command::Models,
            "help" => return Command::Help,
            _ => {}
        }
        match line.strip_prefix("model:") {
            Some(model) => Command::ChangeModel(model.trim().to_string()),
            None => Command::Query(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  quit                       exit
  context                    show the current operational context
  models                     list supported models
  model:<provider>:<model>   switch models
  help                       show this help
Anything else is sent to the model as a query. Ctrl-C cancels a running query.";
