// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for SiteWizard
//!
//! Each invocation attaches a wizard to one site, runs one command against
//! it, and exits. The draft survives between invocations through the
//! snapshot in the storage directory, so a sequence of commands walks the
//! wizard the way a user would in the browser.
//!
//! # Examples
//!
//! ```
//! use sitewizard::cli;
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "sitewizard",
//!     "--site",
//!     "42",
//!     "edit",
//!     "headline",
//!     "Fresh bread daily",
//! ]);
//!
//! assert_eq!(matches.get_one::<String>("site").unwrap(), "42");
//! let edit = matches.subcommand_matches("edit").unwrap();
//! assert_eq!(edit.get_one::<String>("field").unwrap(), "headline");
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};

use crate::autosave::{AutoSave, UnloadVerdict};
use crate::core::config::{parse_overrides, Config, ConfigBuilder, Profile, ENV_PREFIX};
use crate::core::error::{Result, WizardError};
use crate::draft::{SiteId, Step};
use crate::request::FilePart;
use crate::surface::css_declarations;
use crate::wizard::{PublishOutcome, SaveOutcome, SiteWizard, UploadOutcome};

/// The current version of SiteWizard, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds and configures the SiteWizard command-line interface.
pub fn build() -> Command {
    debug!("Building CLI command structure");

    Command::new("sitewizard")
        .author("SiteWizard Contributors")
        .about("Walk a site through the template, content, style and review steps.")
        .version(VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML configuration file")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("site")
                .short('s')
                .long("site")
                .help("Identifier of the site being built")
                .value_parser(value_parser!(String))
                .global(true),
        )
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .help("Directory holding wizard snapshots")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Base URL of the builder backend")
                .value_parser(value_parser!(String))
                .global(true),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .help("Override a configuration key (KEY=VALUE)")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose mode (-v, -vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(Command::new("status").about("Show the wizard state"))
        .subcommand(
            Command::new("template").about("Select a template").arg(
                Arg::new("id")
                    .help("Template identifier")
                    .required(true)
                    .value_parser(value_parser!(String)),
            ),
        )
        .subcommand(Command::new("next").about("Advance to the next step"))
        .subcommand(Command::new("back").about("Return to the previous step"))
        .subcommand(
            Command::new("edit")
                .about("Edit a content field")
                .arg(
                    Arg::new("field")
                        .help("Content field key")
                        .required(true)
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("value")
                        .help("New value; empty clears the field")
                        .required(true)
                        .value_parser(value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("style")
                .about("Set a style property, or remove it when no value is given")
                .arg(
                    Arg::new("property")
                        .help("Style property, e.g. color")
                        .required(true)
                        .value_parser(value_parser!(String)),
                )
                .arg(
                    Arg::new("value")
                        .help("Property value")
                        .value_parser(value_parser!(String)),
                ),
        )
        .subcommand(Command::new("save").about("Save content to the backend"))
        .subcommand(
            Command::new("upload").about("Upload an image").arg(
                Arg::new("file")
                    .help("Image file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        )
        .subcommand(Command::new("publish").about("Publish the site"))
        .subcommand(Command::new("preview").about("Open the site preview"))
        .subcommand(
            Command::new("watch")
                .about("Auto-save until Ctrl-C, then check for unsaved changes"),
        )
        .after_help(
            "\x1b[1;4mEnvironment:\x1b[0m\n\n  SITEWIZARD_* variables override \
             configuration keys, e.g. SITEWIZARD_BASE_URL.\n\n\
             \x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

/// Resolves the configuration from the file, the environment and flags.
pub fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut builder = ConfigBuilder::new().with_env_prefix(ENV_PREFIX);
    if let Some(path) = matches.get_one::<PathBuf>("config") {
        builder = builder.with_file(path);
    }
    if let Some(url) = matches.get_one::<String>("base-url") {
        builder = builder.with_override("base_url", url.clone());
    }
    if let Some(dir) = matches.get_one::<PathBuf>("storage-dir") {
        builder = builder
            .with_override("storage_dir", dir.to_string_lossy().into_owned());
    }

    let pairs = matches
        .get_many::<String>("set")
        .map(|values| values.cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    let mut overrides: Vec<_> = parse_overrides(pairs)?.into_iter().collect();
    overrides.sort();
    for (key, value) in overrides {
        builder = builder.with_override(key, value);
    }

    builder.build()
}

/// Log filter for the given `-v` count, falling back to the profile's.
pub fn log_filter(verbose: u8, profile: Profile) -> &'static str {
    match verbose {
        0 => profile.default_log_filter(),
        1 => "debug",
        _ => "trace",
    }
}

/// Attaches a wizard and runs the selected subcommand against it.
pub async fn execute(matches: &ArgMatches, config: Config) -> Result<()> {
    let site = match matches.get_one::<String>("site") {
        Some(raw) => Some(SiteId::new(raw.as_str()).ok_or_else(|| {
            WizardError::config_error(
                format!(
                    "Invalid site id '{}': use letters, digits, '-' or '_'",
                    raw
                ),
                None,
            )
        })?),
        None => None,
    };
    let wizard = Arc::new(crate::attach_console(config, site)?);

    match matches.subcommand() {
        Some(("status", _)) => {
            print_status(&wizard);
            Ok(())
        }
        Some(("template", sub)) => {
            let id = required_arg(sub, "id")?;
            wizard.select_template(id)
        }
        Some(("next", _)) => {
            let step = wizard.advance()?;
            print_step(step);
            Ok(())
        }
        Some(("back", _)) => {
            let step = wizard.retreat();
            print_step(step);
            Ok(())
        }
        Some(("edit", sub)) => {
            let field = required_arg(sub, "field")?;
            let value = required_arg(sub, "value")?;
            wizard.record_content_edit(field, value);
            Ok(())
        }
        Some(("style", sub)) => {
            let property = required_arg(sub, "property")?;
            let value = sub.get_one::<String>("value").map_or("", String::as_str);
            wizard.record_style_edit(property, value);
            Ok(())
        }
        Some(("save", _)) => match wizard.save_content().await? {
            SaveOutcome::Saved => Ok(()),
            SaveOutcome::Skipped => {
                println!("No site attached; nothing to save");
                Ok(())
            }
        },
        Some(("upload", sub)) => {
            let path = sub.get_one::<PathBuf>("file").ok_or_else(|| {
                WizardError::internal_error("Missing argument: file")
            })?;
            match wizard.upload_image(FilePart::from_path(path)?).await? {
                UploadOutcome::Uploaded { url } => println!("{}", url),
                UploadOutcome::Skipped => {
                    println!("No site attached; nothing uploaded")
                }
            }
            Ok(())
        }
        Some(("publish", _)) => match wizard.publish().await? {
            PublishOutcome::Published { redirect_to } => {
                info!("Waiting for redirect to {}", redirect_to);
                wizard.redirect_finished().await;
                Ok(())
            }
            PublishOutcome::Skipped => {
                println!("No site attached; nothing published");
                Ok(())
            }
        },
        Some(("preview", _)) => {
            if wizard.preview().is_none() {
                println!("No site attached; nothing to preview");
            }
            Ok(())
        }
        Some(("watch", _)) => watch(wizard).await,
        _ => Err(WizardError::internal_error("Unknown command")),
    }
}

async fn watch(wizard: Arc<SiteWizard>) -> Result<()> {
    let autosave = AutoSave::from_config(wizard);
    println!(
        "Auto-saving every {}s at the content step; press Ctrl-C to stop",
        autosave.period().as_secs()
    );
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| WizardError::internal_error(format!("Signal handler failed: {}", e)))?;

    match autosave.on_unload() {
        UnloadVerdict::Proceed => println!("All changes saved"),
        UnloadVerdict::Warn(message) => println!("{}", message),
    }
    Ok(())
}

fn required_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| WizardError::internal_error(format!("Missing argument: {}", name)))
}

fn print_step(step: Step) {
    println!("Step {} of {}: {}", step.number(), Step::COUNT, step.label());
}

fn print_status(wizard: &SiteWizard) {
    let draft = wizard.draft();
    let site = wizard.site_id().map_or("(none)", |s| s.as_str());
    println!("Site:     {}", site);
    println!(
        "Step:     {} of {}, {} ({}%)",
        wizard.current_step().number(),
        Step::COUNT,
        wizard.current_step().label(),
        wizard.progress_percent()
    );
    let steps: Vec<String> = wizard
        .step_states()
        .into_iter()
        .map(|(step, reached)| {
            format!("[{}] {}", if reached { "x" } else { " " }, step.label())
        })
        .collect();
    println!("Progress: {}", steps.join(" "));
    println!(
        "Template: {}",
        draft.template.as_deref().unwrap_or("(none)")
    );
    for (key, value) in &draft.content {
        println!("Content:  {} = {}", key, value);
    }
    if !draft.style.is_empty() {
        println!("Style:    {}", css_declarations(&draft.style));
    }
    if wizard.has_unsaved_changes() {
        println!("Unsaved changes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_matches(args: Vec<&str>) -> ArgMatches {
        build().get_matches_from(args)
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let matches = get_matches(vec![
            "sitewizard",
            "next",
            "--site",
            "42",
            "--storage-dir",
            "/tmp/wizard",
        ]);
        assert!(matches.subcommand_matches("next").is_some());
        assert_eq!(matches.get_one::<String>("site").unwrap(), "42");
        assert_eq!(
            matches.get_one::<PathBuf>("storage-dir").unwrap(),
            &PathBuf::from("/tmp/wizard")
        );
    }

    #[test]
    fn test_style_value_is_optional() {
        let matches = get_matches(vec!["sitewizard", "style", "color"]);
        let style = matches.subcommand_matches("style").unwrap();
        assert_eq!(style.get_one::<String>("property").unwrap(), "color");
        assert!(style.get_one::<String>("value").is_none());
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(build().try_get_matches_from(vec!["sitewizard"]).is_err());
    }

    #[test]
    fn test_load_config_applies_flags_and_overrides() {
        let matches = get_matches(vec![
            "sitewizard",
            "--base-url",
            "http://localhost:8080/",
            "--set",
            "autosave.interval_ms=1000",
            "--set",
            "publish.redirect_to=/sites",
            "status",
        ]);
        let config = load_config(&matches).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.autosave.interval_ms, 1000);
        assert_eq!(config.publish.redirect_to, "/sites");
    }

    #[test]
    fn test_load_config_rejects_malformed_override() {
        let matches =
            get_matches(vec!["sitewizard", "--set", "autosave", "status"]);
        assert!(load_config(&matches).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(0, Profile::Production), "warn");
        assert_eq!(log_filter(1, Profile::Production), "debug");
        assert_eq!(log_filter(3, Profile::Development), "trace");
    }
}
