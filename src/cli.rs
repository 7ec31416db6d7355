use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a template against a JSON bindings file
    Render {
        /// Template file, or `-` for stdin
        template: PathBuf,
        /// JSON object with the values the template refers to
        #[arg(short, long)]
        bindings: Option<PathBuf>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Skip the code form of the template
        #[arg(long)]
        no_code: bool,
    },
    /// Print the token stream
    Tokens {
        template: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the parsed syntax tree
    Tree {
        template: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
