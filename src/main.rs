// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # SiteWizard CLI
//!
//! This is the main entry point for the SiteWizard command-line interface.
//! It resolves the configuration, initialises the logger, and runs one
//! wizard command on a single-threaded runtime.

use anyhow::Context;
use log::debug;
use sitewizard::cli;

fn run() -> anyhow::Result<()> {
    let matches = cli::build().get_matches();
    let config =
        cli::load_config(&matches).context("Failed to load configuration")?;

    let verbose = matches.get_count("verbose");
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(cli::log_filter(verbose, config.profile)),
    )
    .init();
    debug!("Resolved configuration: {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(cli::execute(&matches, config))?;
    Ok(())
}

/// The main entry point for the SiteWizard CLI.
fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
