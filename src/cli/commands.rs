//! CLI commands and argument parsing

use crate::types::{Direction, TotalPages};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Meraki Dashboard API command-line client
#[derive(Parser, Debug)]
#[command(name = "meraki")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Session configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// API key (defaults to MERAKI_DASHBOARD_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Base URL override
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Do not send POST, PUT or DELETE requests
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Write a log file to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Print no log lines
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a resource
    Get {
        /// Resource path, e.g. /organizations/549236/networks
        path: String,

        /// Query parameter (repeatable), `key=value`; `key[]=value` for arrays
        #[arg(short = 'q', long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Follow pages: a page count, or `all`
        #[arg(long)]
        total_pages: Option<TotalPages>,

        /// Link relation to follow
        #[arg(long, default_value = "next")]
        direction: Direction,

        /// Print items one per line as pages arrive
        #[arg(long, requires = "total_pages")]
        iterate: bool,
    },

    /// POST a JSON body
    Post {
        /// Resource path
        path: String,

        /// Inline JSON body
        #[arg(long)]
        body: Option<String>,
    },

    /// PUT a JSON body
    Put {
        /// Resource path
        path: String,

        /// Inline JSON body
        #[arg(long)]
        body: Option<String>,
    },

    /// DELETE a resource
    Delete {
        /// Resource path
        path: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON (one document per line)
    Json,
    /// Indented JSON
    Pretty,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}
