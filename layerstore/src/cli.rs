//! CLI argument parsing for layerstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "layerstore")]
#[command(author, version, about = "Inspect and export spatial feature layers", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Layer store directory (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List all layers
    List,

    /// Print a layer's schema and features
    Show {
        /// Layer name
        #[arg(required = true)]
        layer: String,

        /// Maximum features to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show feature count and extent of a layer
    Stats {
        /// Layer name
        #[arg(required = true)]
        layer: String,
    },

    /// Export a layer as GeoJSON
    Export {
        /// Layer name
        #[arg(required = true)]
        layer: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
