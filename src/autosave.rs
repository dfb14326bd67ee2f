// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Auto-Save Module
//!
//! Keeps remote content in step with local edits while the user works on
//! the content step, and answers the host's "may the user leave?" question.
//!
//! The timer lives as long as the [`AutoSave`] value; dropping it stops the
//! timer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::draft::Step;
use crate::scheduler::{schedule_every, TaskHandle};
use crate::wizard::SiteWizard;

/// Message attached to [`UnloadVerdict::Warn`].
pub const UNSAVED_WARNING: &str =
    "You have unsaved changes. Are you sure you want to leave?";

/// Answer to an unload check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadVerdict {
    /// Nothing would be lost.
    Proceed,
    /// Leaving now loses edits; the host should ask the user first.
    Warn(String),
}

type UnsavedPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Periodic auto-save bound to one wizard.
pub struct AutoSave {
    wizard: Arc<SiteWizard>,
    period: Duration,
    timer: Option<TaskHandle>,
    unsaved: UnsavedPredicate,
}

impl fmt::Debug for AutoSave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSave")
            .field("site", &self.wizard.site_id())
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl AutoSave {
    /// Starts ticking every `period`; the first tick comes one period
    /// from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(wizard: Arc<SiteWizard>, period: Duration) -> Self {
        let ticking = wizard.clone();
        let timer = schedule_every("autosave", period, move || {
            let wizard = ticking.clone();
            async move { tick(&wizard).await }
        });

        let dirty = wizard.clone();
        Self {
            wizard,
            period,
            timer: Some(timer),
            unsaved: Arc::new(move || dirty.has_unsaved_changes()),
        }
    }

    /// Starts with the interval from the wizard's configuration, or returns
    /// a stopped instance when auto-save is disabled.
    pub fn from_config(wizard: Arc<SiteWizard>) -> Self {
        let config = wizard.context().config();
        let period = config.autosave_interval();
        if config.autosave.enabled {
            Self::start(wizard, period)
        } else {
            debug!("Auto-save disabled by configuration");
            let dirty = wizard.clone();
            Self {
                wizard,
                period,
                timer: None,
                unsaved: Arc::new(move || dirty.has_unsaved_changes()),
            }
        }
    }

    /// Replaces the "unsaved changes" predicate consulted on unload.
    pub fn with_unsaved_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.unsaved = Arc::new(predicate);
        self
    }

    /// Interval between ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// `true` while the timer is scheduled.
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Decides whether leaving now needs a warning.
    ///
    /// Advisory only; nothing is saved here.
    pub fn on_unload(&self) -> UnloadVerdict {
        if (self.unsaved)() {
            warn!("Leaving with unsaved changes");
            UnloadVerdict::Warn(UNSAVED_WARNING.to_string())
        } else {
            UnloadVerdict::Proceed
        }
    }

    /// Stops the timer. A save already in flight completes.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick(wizard: &SiteWizard) {
    if wizard.current_step() != Step::Content {
        debug!("Auto-save tick skipped outside the content step");
        return;
    }
    // Failures are already reported to the user by the wizard.
    if let Err(err) = wizard.save_content().await {
        debug!("Auto-save failed: {}", err);
    }
}
