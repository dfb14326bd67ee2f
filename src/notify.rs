// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! User notifications and a console surface for them.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::traits::Notifier;

/// Default time a notification stays visible.
pub const DEFAULT_TTL: Duration = Duration::from_millis(5000);

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Neutral information.
    Info,
    /// An operation completed.
    Success,
    /// The user must fix something before continuing.
    Warning,
    /// An operation failed.
    Danger,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Danger => "danger",
        })
    }
}

/// A message for the user, dismissed automatically after `ttl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Text to display.
    pub message: String,
    /// Severity.
    pub level: Level,
    /// How long the message stays on screen.
    pub ttl: Duration,
}

impl Notification {
    /// Creates a notification with the default lifetime.
    pub fn new<S: Into<String>>(level: Level, message: S) -> Self {
        Self {
            message: message.into(),
            level,
            ttl: DEFAULT_TTL,
        }
    }

    /// Overrides the display lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Prints notifications as `[level] message` lines.
#[derive(Debug)]
pub struct ConsoleNotifier<W: Write + Send + fmt::Debug = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleNotifier {
    /// Notifier writing to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + fmt::Debug> ConsoleNotifier<W> {
    /// Notifier writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the notifier and returns its sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send + fmt::Debug> Notifier for ConsoleNotifier<W> {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Danger => error!("{}", notification.message),
            Level::Warning => warn!("{}", notification.message),
            Level::Info | Level::Success => debug!("{}", notification.message),
        }
        let mut out = self.out.lock();
        if let Err(err) =
            writeln!(out, "[{}] {}", notification.level, notification.message)
        {
            info!("Notification could not be displayed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_defaults_to_five_seconds() {
        let n = Notification::new(Level::Success, "Template selected");
        assert_eq!(n.ttl, Duration::from_secs(5));
        let n = n.with_ttl(Duration::from_secs(1));
        assert_eq!(n.ttl, Duration::from_secs(1));
    }

    #[test]
    fn test_console_notifier_formats_level() {
        let notifier = ConsoleNotifier::new(Vec::new());
        notifier.notify(Notification::new(Level::Danger, "quota exceeded"));
        notifier.notify(Notification::new(Level::Info, "hello"));

        let written = String::from_utf8(notifier.into_inner()).unwrap();
        assert_eq!(written, "[danger] quota exceeded\n[info] hello\n");
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Level::Warning).unwrap(),
            "\"warning\""
        );
    }
}
