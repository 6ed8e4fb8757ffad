// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! Meraki Dashboard CLI
//!
//! Command-line interface for one-off Dashboard API calls. Log output is
//! installed by the session from its logging options.

use anyhow::Context;
use clap::Parser;
use meraki_dashboard::cli::{Cli, Commands, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let action = match &cli.command {
        Commands::Get { path, .. } => format!("GET {path}"),
        Commands::Post { path, .. } => format!("POST {path}"),
        Commands::Put { path, .. } => format!("PUT {path}"),
        Commands::Delete { path } => format!("DELETE {path}"),
    };
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await.context(action) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
