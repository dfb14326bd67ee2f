// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # SiteWizard Library
//!
//! SiteWizard is the client-side engine of a four-step site-building wizard.
//! It gates step transitions on validation, keeps a recoverable snapshot of
//! the draft, auto-saves content while the user edits it, and drives the
//! save, upload and publish exchanges with the builder backend.
//!
//! Everything outside the engine (HTTP, storage, notifications, navigation,
//! the live preview) is reached through the traits in [`core::traits`].

#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/sitewizard")]
#![crate_name = "sitewizard"]
#![crate_type = "lib"]

use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::Result;

/// Module containing core utilities, such as configuration and error handling.
pub mod core {
    /// Handles configuration of the wizard.
    pub mod config;
    /// Contains error types and handling for SiteWizard.
    pub mod error;
    /// Collaborator traits the wizard calls into.
    pub mod traits;
}

/// Periodic auto-save and the unload check.
pub mod autosave;

/// Provides command-line interface utilities.
pub mod cli;

/// Draft data model, steps and the persisted snapshot.
pub mod draft;

/// User notifications.
pub mod notify;

/// Request client and the backend's JSON envelope.
pub mod request;

/// Backend endpoints and wizard page routes.
pub mod routes;

/// Delayed and periodic tasks with cancel handles.
pub mod scheduler;

/// Snapshot persistence.
pub mod storage;

/// Terminal navigation and preview surfaces.
pub mod surface;

/// Step validation.
pub mod validation;

/// The wizard state machine.
pub mod wizard;

/// Recording fakes for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::autosave::{AutoSave, UnloadVerdict};
pub use crate::core::error::{RequestError, WizardError};
pub use crate::draft::{PersistedSnapshot, SiteDraft, SiteId, Step};
pub use crate::wizard::{
    PublishOutcome, SaveOutcome, SiteWizard, UploadOutcome, WizardContext,
};

/// Wires a wizard to the HTTP backend, file storage and the terminal.
///
/// The snapshot for `site` is restored from `config.storage_dir` if present.
///
/// # Errors
///
/// Fails when the HTTP client cannot be built.
pub fn attach_console(config: Config, site: Option<SiteId>) -> Result<SiteWizard> {
    let client = request::HttpRequestClient::new(
        config.base_url.clone(),
        config.request_timeout(),
    )?;
    let storage = storage::FileStorage::new(&config.storage_dir);
    let navigator = surface::ConsoleNavigator::new(config.base_url.clone());
    let schema = config.schema();

    let ctx = WizardContext::new(
        config,
        Arc::new(client),
        Arc::new(notify::ConsoleNotifier::stdout()),
        Arc::new(navigator),
    )
    .with_storage(Arc::new(storage))
    .with_preview(Arc::new(surface::ConsolePreview));

    Ok(SiteWizard::attach(ctx, site, schema))
}
