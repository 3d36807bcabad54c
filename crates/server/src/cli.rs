//! Command-line interface.

use clap::{Parser, Subcommand};

/// Inventory analytics over AWS Athena.
#[derive(Parser, Debug)]
#[command(name = "analytics-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Run one query and print the rows as a table.
    Query {
        /// Name of a fixed query, e.g. `top-products-value`.
        #[arg(required_unless_present = "sql", conflicts_with = "sql")]
        name: Option<String>,

        /// Arbitrary SQL instead of a named query.
        #[arg(long)]
        sql: Option<String>,

        /// Database to run against instead of the configured one.
        #[arg(long)]
        database: Option<String>,
    },
    /// List the fixed query names.
    List,
}

impl Cli {
    /// Subcommand to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}
