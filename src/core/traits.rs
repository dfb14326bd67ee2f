// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! The seams between the wizard and the environment it runs in. The wizard
//! never touches a network socket, a storage medium or a screen directly;
//! it calls into these traits, which a host implements.
//!
//! ## Key Traits
//!
//! - [`Storage`]: key-value persistence that never fails
//! - [`RequestClient`]: JSON-envelope requests against the backend
//! - [`Notifier`]: fire-and-forget user notifications
//! - [`Navigator`]: page redirects and new browsing contexts
//! - [`PreviewSurface`]: the live preview the style step paints on

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::core::error::RequestError;
use crate::notify::Notification;
use crate::request::{Envelope, RequestOptions};

/// Key-value persistence with a fallback-safe contract.
///
/// No method may fail or panic. An implementation whose medium is
/// unavailable returns `None` from reads and discards writes.
pub trait Storage: Send + Sync + Debug {
    /// Reads a value.
    fn get(&self, key: &str) -> Option<JsonValue>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &JsonValue);

    /// Deletes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str);

    /// Reads a value, falling back to `default` when absent or unreadable.
    fn get_or(&self, key: &str, default: JsonValue) -> JsonValue {
        self.get(key).unwrap_or(default)
    }
}

/// Issues requests against the backend and decodes the JSON envelope.
#[async_trait]
pub trait RequestClient: Send + Sync + Debug {
    /// Sends a request to `path`, resolved against the backend base URL.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Transport`] when no response arrives.
    /// - [`RequestError::Server`] when the status is not a success.
    /// - [`RequestError::Decode`] when the body is not a JSON object.
    async fn send(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Envelope, RequestError>;
}

/// Surfaces a message to the user.
pub trait Notifier: Send + Sync + Debug {
    /// Shows a notification. Display is fire-and-forget.
    fn notify(&self, notification: Notification);
}

/// Moves the user between pages.
pub trait Navigator: Send + Sync + Debug {
    /// Replaces the current page with `url`.
    fn redirect(&self, url: &str);

    /// Opens `url` in a new browsing context, leaving the wizard in place.
    fn open_window(&self, url: &str);
}

/// A live rendering of the site that reflects style edits.
pub trait PreviewSurface: Send + Sync + Debug {
    /// Applies the complete style mapping. Properties missing from `style`
    /// must no longer be applied.
    fn apply_style(&self, style: &BTreeMap<String, String>);
}
