use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "python-plugin", about = "Run Python actions in a python3 subprocess", version)]
#[command(group(ArgGroup::new("mode").args(["bindings", "install_runtime"]).multiple(false)))]
pub struct Cli {
    /// Execution request (PluginExecutionProps JSON). Read from stdin when omitted.
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Override the configured execution timeout for this run.
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Pretty-print the JSON written to stdout.
    #[arg(long)]
    pub pretty: bool,

    /// Extract binding pairs instead of executing.
    #[arg(long)]
    pub bindings: bool,

    /// Python source for --bindings. Read from stdin when omitted.
    #[arg(long, requires = "bindings")]
    pub code: Option<String>,

    /// Entity name to resolve (repeatable): --identifier Table1 --identifier Input1
    #[arg(long = "identifier", action = clap::ArgAction::Append, requires = "bindings")]
    pub identifiers: Vec<String>,

    /// Data context JSON object for --bindings.
    #[arg(long, value_name = "FILE", requires = "bindings")]
    pub data: Option<PathBuf>,

    /// Write the entry script next to this binary and exit.
    #[arg(long = "install-runtime")]
    pub install_runtime: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
