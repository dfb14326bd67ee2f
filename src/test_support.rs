// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test-only collaborators that record what the wizard asks of them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::core::config::Config;
use crate::core::error::RequestError;
use crate::core::traits::{Navigator, Notifier, PreviewSurface, RequestClient, Storage};
use crate::notify::{Level, Notification};
use crate::request::{Envelope, RequestOptions};
use crate::storage::MemoryStorage;
use crate::wizard::WizardContext;

/// Builds an envelope from a JSON literal.
pub fn envelope(value: JsonValue) -> Envelope {
    serde_json::from_value(value).unwrap_or_default()
}

/// Remembers every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// All notifications, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    /// Messages shown at `level`, oldest first.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    /// Most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Remembers redirects with the (tokio) time they happened.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<(String, Instant)>>,
    windows: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Redirect targets, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().iter().map(|(u, _)| u.clone()).collect()
    }

    /// Redirect targets with their timestamps.
    pub fn timed_redirects(&self) -> Vec<(String, Instant)> {
        self.redirects.lock().clone()
    }

    /// URLs opened in new windows.
    pub fn windows(&self) -> Vec<String> {
        self.windows.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) {
        self.redirects.lock().push((url.to_string(), Instant::now()));
    }

    fn open_window(&self, url: &str) {
        self.windows.lock().push(url.to_string());
    }
}

/// Remembers every style mapping applied.
#[derive(Debug, Default)]
pub struct RecordingPreview {
    applied: Mutex<Vec<BTreeMap<String, String>>>,
}

impl RecordingPreview {
    /// Applied mappings, oldest first.
    pub fn applied(&self) -> Vec<BTreeMap<String, String>> {
        self.applied.lock().clone()
    }
}

impl PreviewSurface for RecordingPreview {
    fn apply_style(&self, style: &BTreeMap<String, String>) {
        self.applied.lock().push(style.clone());
    }
}

/// Request client answering from a script.
///
/// Queued responses are used first; once the queue is empty every request
/// gets the fallback response.
#[derive(Debug)]
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<Envelope, RequestError>>>,
    fallback: Mutex<Result<Envelope, RequestError>>,
    requests: Mutex<Vec<(String, RequestOptions)>>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::answering(Ok(envelope(serde_json::json!({"success": true}))))
    }
}

impl ScriptedClient {
    /// Client giving `response` to every request.
    pub fn answering(response: Result<Envelope, RequestError>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response for the next unanswered request.
    pub fn push(&self, response: Result<Envelope, RequestError>) {
        self.queue.lock().push_back(response);
    }

    /// Replaces the fallback response.
    pub fn set_fallback(&self, response: Result<Envelope, RequestError>) {
        *self.fallback.lock() = response;
    }

    /// Requests received, oldest first.
    pub fn requests(&self) -> Vec<(String, RequestOptions)> {
        self.requests.lock().clone()
    }

    /// Paths of the requests received.
    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(p, _)| p.clone()).collect()
    }
}

#[async_trait]
impl RequestClient for ScriptedClient {
    async fn send(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Envelope, RequestError> {
        self.requests.lock().push((path.to_string(), options));
        let queued = self.queue.lock().pop_front();
        match queued {
            Some(response) => response,
            None => self.fallback.lock().clone(),
        }
    }
}

/// Request client that holds every request until released.
///
/// Each request waits for one [`GatedClient::release`] and then answers
/// `{success: true}`. A release given before the request arrives is kept.
#[derive(Debug, Default)]
pub struct GatedClient {
    gate: Notify,
    arrived: Notify,
    requests: Mutex<Vec<(String, RequestOptions)>>,
}

impl GatedClient {
    /// Waits until a request is parked at the gate.
    pub async fn request_arrived(&self) {
        self.arrived.notified().await;
    }

    /// Lets one parked (or the next) request through.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Requests received, oldest first.
    pub fn requests(&self) -> Vec<(String, RequestOptions)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RequestClient for GatedClient {
    async fn send(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Envelope, RequestError> {
        self.requests.lock().push((path.to_string(), options));
        self.arrived.notify_one();
        self.gate.notified().await;
        Ok(envelope(serde_json::json!({"success": true})))
    }
}

/// Storage whose medium is permanently unavailable.
#[derive(Debug, Default)]
pub struct UnavailableStorage {
    attempts: Mutex<usize>,
}

impl UnavailableStorage {
    /// Number of calls received.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl Storage for UnavailableStorage {
    fn get(&self, _key: &str) -> Option<JsonValue> {
        *self.attempts.lock() += 1;
        None
    }

    fn set(&self, _key: &str, _value: &JsonValue) {
        *self.attempts.lock() += 1;
    }

    fn remove(&self, _key: &str) {
        *self.attempts.lock() += 1;
    }
}

/// A full set of recording collaborators.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Configuration handed to the context.
    pub config: Config,
    /// Scripted backend.
    pub client: Arc<ScriptedClient>,
    /// Recorded notifications.
    pub notifier: Arc<RecordingNotifier>,
    /// Recorded navigation.
    pub navigator: Arc<RecordingNavigator>,
    /// Recorded preview updates.
    pub preview: Arc<RecordingPreview>,
    /// In-memory persistence.
    pub storage: Arc<MemoryStorage>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Harness {
    /// Harness around `config`, answering `{success: true}` by default.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Arc::new(ScriptedClient::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            preview: Arc::new(RecordingPreview::default()),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Context wired to every recording collaborator.
    pub fn context(&self) -> WizardContext {
        self.context_without_storage()
            .with_storage(self.storage.clone())
    }

    /// Context without any persistence layer.
    pub fn context_without_storage(&self) -> WizardContext {
        WizardContext::new(
            self.config.clone(),
            self.client.clone(),
            self.notifier.clone(),
            self.navigator.clone(),
        )
        .with_preview(self.preview.clone())
    }
}
