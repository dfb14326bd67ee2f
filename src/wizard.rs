// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Wizard Module
//!
//! The wizard state machine. A [`SiteWizard`] owns the current [`Step`] and
//! the [`SiteDraft`] for one site, gates transitions on validation, writes a
//! [`PersistedSnapshot`] after every local mutation, and runs the save,
//! upload and publish exchanges with the backend.
//!
//! Collaborators arrive through a [`WizardContext`] built once per session.
//! Every failure is converted into a notification at the point where it
//! happens and also returned to the caller; none of them ends the session.
//!
//! Without a site id the wizard still edits locally, but it neither persists
//! nor talks to the backend.

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::core::config::Config;
use crate::core::error::{RequestError, Result, WizardError};
use crate::core::traits::{Navigator, Notifier, PreviewSurface, RequestClient, Storage};
use crate::draft::{ContentSchema, FieldKey, PersistedSnapshot, SiteDraft, SiteId, Step};
use crate::notify::{Level, Notification};
use crate::request::{FilePart, RequestOptions};
use crate::routes;
use crate::scheduler::{schedule_after, TaskHandle};
use crate::validation::validate;

/// Collaborators and settings shared by one wizard session.
#[derive(Debug, Clone)]
pub struct WizardContext {
    config: Config,
    client: Arc<dyn RequestClient>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    storage: Option<Arc<dyn Storage>>,
    preview: Option<Arc<dyn PreviewSurface>>,
}

impl WizardContext {
    /// Creates a context without persistence or preview.
    pub fn new(
        config: Config,
        client: Arc<dyn RequestClient>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            client,
            notifier,
            navigator,
            storage: None,
            preview: None,
        }
    }

    /// Adds a persistence layer.
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Adds a live preview surface.
    pub fn with_preview(mut self, preview: Arc<dyn PreviewSurface>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn notify<S: Into<String>>(&self, level: Level, message: S) {
        self.notifier.notify(
            Notification::new(level, message).with_ttl(self.config.notification_ttl()),
        );
    }
}

/// Result of [`SiteWizard::save_content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend accepted the content.
    Saved,
    /// No site attached; nothing was sent.
    Skipped,
}

/// Result of [`SiteWizard::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The site is live; a redirect to `redirect_to` is scheduled.
    Published {
        /// Route the user is sent to.
        redirect_to: String,
    },
    /// No site attached; nothing was sent.
    Skipped,
}

/// Result of [`SiteWizard::upload_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The image is served at `url`.
    Uploaded {
        /// Public URL of the uploaded image.
        url: String,
    },
    /// No site attached; nothing was sent.
    Skipped,
}

#[derive(Debug, Default)]
struct WizardState {
    step: Step,
    draft: SiteDraft,
    // Bumped by every content or style edit.
    revision: u64,
    // Highest revision the backend acknowledged.
    saved_revision: u64,
    invalid: BTreeSet<FieldKey>,
}

impl WizardState {
    fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            current_step: self.step,
            site_data: self.draft.clone(),
        }
    }
}

/// The wizard state machine for one site.
#[derive(Debug)]
pub struct SiteWizard {
    ctx: WizardContext,
    site_id: Option<SiteId>,
    schema: ContentSchema,
    state: Mutex<WizardState>,
    redirect: Mutex<Option<TaskHandle>>,
}

impl SiteWizard {
    /// Attaches a wizard to `site_id`, restoring its snapshot if one exists.
    pub fn attach(
        ctx: WizardContext,
        site_id: Option<SiteId>,
        schema: ContentSchema,
    ) -> Self {
        let mut state = WizardState::default();
        if let (Some(storage), Some(site)) = (&ctx.storage, &site_id) {
            let key = PersistedSnapshot::storage_key(site);
            if let Some(snapshot) =
                storage.get(&key).and_then(PersistedSnapshot::from_value)
            {
                info!(
                    "Restored wizard for site {} at step {}",
                    site, snapshot.current_step
                );
                state.step = snapshot.current_step;
                state.draft = snapshot.site_data;
                let marker = storage.get(&PersistedSnapshot::unsaved_key(site));
                if marker == Some(JsonValue::Bool(true)) {
                    debug!("Site {} has edits the backend has not seen", site);
                    state.revision = 1;
                }
            }
        }

        Self {
            ctx,
            site_id,
            schema,
            state: Mutex::new(state),
            redirect: Mutex::new(None),
        }
    }

    /// Site the wizard is attached to.
    pub fn site_id(&self) -> Option<&SiteId> {
        self.site_id.as_ref()
    }

    /// Content schema used at the content step.
    pub fn schema(&self) -> &ContentSchema {
        &self.schema
    }

    /// Session context.
    pub fn context(&self) -> &WizardContext {
        &self.ctx
    }

    /// Step the user is on.
    pub fn current_step(&self) -> Step {
        self.state.lock().step
    }

    /// Copy of the current draft.
    pub fn draft(&self) -> SiteDraft {
        self.state.lock().draft.clone()
    }

    /// The record that would be persisted now.
    pub fn snapshot(&self) -> PersistedSnapshot {
        self.state.lock().snapshot()
    }

    /// Fields flagged by the last failed content validation.
    pub fn invalid_fields(&self) -> Vec<FieldKey> {
        self.state.lock().invalid.iter().cloned().collect()
    }

    /// `true` when an edit has not been acknowledged by the backend.
    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.state.lock();
        state.revision > state.saved_revision
    }

    /// Completion of the wizard, in percent.
    pub fn progress_percent(&self) -> u8 {
        let percent = u16::from(self.current_step().number()) * 100
            / u16::from(Step::COUNT);
        u8::try_from(percent).unwrap_or(100)
    }

    /// Each step paired with whether the user has reached it.
    pub fn step_states(&self) -> Vec<(Step, bool)> {
        let current = self.current_step();
        Step::ALL.iter().map(|&s| (s, s <= current)).collect()
    }

    /// `true` while a publish redirect is scheduled but has not happened.
    pub fn redirect_pending(&self) -> bool {
        self.redirect
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Resolves once the scheduled publish redirect has happened.
    ///
    /// Returns at once when no redirect is pending.
    pub async fn redirect_finished(&self) {
        let handle = self.redirect.lock().take();
        if let Some(handle) = handle {
            handle.finished().await;
        }
    }

    /// Records the chosen template.
    pub fn select_template(&self, template_id: &str) -> Result<()> {
        let id = template_id.trim();
        if id.is_empty() {
            let message = "Please select a template";
            warn!("Refusing blank template id");
            self.ctx.notify(Level::Warning, message);
            return Err(WizardError::validation(message, Vec::new()));
        }

        {
            let mut state = self.state.lock();
            state.draft.template = Some(id.to_string());
            self.persist(&state);
        }
        info!("Template {} selected", id);
        self.ctx.notify(Level::Success, "Template selected successfully");
        Ok(())
    }

    /// Moves to the next step when the current one validates.
    ///
    /// From the review step there is nowhere to go; the step stays put.
    pub fn advance(&self) -> Result<Step> {
        let moved = {
            let mut state = self.state.lock();
            match validate(state.step, &state.draft, &self.schema) {
                Err(failure) => {
                    state.invalid = failure.fields().iter().cloned().collect();
                    Err(failure)
                }
                Ok(()) => {
                    state.invalid.clear();
                    match state.step.next() {
                        Some(next) => {
                            state.step = next;
                            self.persist(&state);
                            Ok(Some(next))
                        }
                        None => Ok(None),
                    }
                }
            }
        };

        match moved {
            Err(failure) => {
                warn!("Cannot advance: {}", failure);
                self.ctx.notify(Level::Warning, failure.message());
                Err(failure.into())
            }
            Ok(Some(next)) => {
                debug!("Advanced to step {}", next);
                self.navigate(next);
                Ok(next)
            }
            Ok(None) => {
                debug!("Already at the last step");
                Ok(Step::Review)
            }
        }
    }

    /// Moves back one step without validation, stopping at the first.
    pub fn retreat(&self) -> Step {
        let step = {
            let mut state = self.state.lock();
            state.step = state.step.previous().unwrap_or(Step::Template);
            self.persist(&state);
            state.step
        };
        debug!("Retreated to step {}", step);
        self.navigate(step);
        step
    }

    /// Records a content field edit locally.
    pub fn record_content_edit(&self, key: &str, value: &str) {
        let mut state = self.state.lock();
        _ = state.draft.content.insert(key.to_string(), value.to_string());
        if !value.trim().is_empty() {
            _ = state.invalid.remove(key);
        }
        state.revision += 1;
        self.persist(&state);
        self.persist_unsaved(true);
    }

    /// Records a style edit and repaints the preview.
    ///
    /// A blank value removes the property. The preview receives the whole
    /// mapping so removed properties disappear from it.
    pub fn record_style_edit(&self, property: &str, value: &str) {
        let style = {
            let mut state = self.state.lock();
            if value.trim().is_empty() {
                _ = state.draft.style.remove(property);
            } else {
                _ = state
                    .draft
                    .style
                    .insert(property.to_string(), value.to_string());
            }
            state.revision += 1;
            self.persist(&state);
            self.persist_unsaved(true);
            state.draft.style.clone()
        };
        if let Some(preview) = &self.ctx.preview {
            preview.apply_style(&style);
        }
    }

    /// Sends the content mapping to the backend.
    ///
    /// The local draft is never modified by this call. On failure it stays
    /// dirty and the next save sends it again.
    pub async fn save_content(&self) -> Result<SaveOutcome> {
        let Some(site) = &self.site_id else {
            debug!("No site attached; content stays local");
            return Ok(SaveOutcome::Skipped);
        };

        let (body, revision) = {
            let state = self.state.lock();
            (serde_json::to_value(&state.draft.content)?, state.revision)
        };

        let response = self
            .ctx
            .client
            .send(&routes::content(site), RequestOptions::post_json(body))
            .await;

        match response {
            Ok(envelope) if envelope.is_success() => {
                {
                    let mut state = self.state.lock();
                    state.saved_revision = state.saved_revision.max(revision);
                    if state.saved_revision >= state.revision {
                        self.persist_unsaved(false);
                    }
                }
                info!("Content saved for site {}", site);
                self.ctx.notify(Level::Success, "Content saved");
                Ok(SaveOutcome::Saved)
            }
            Ok(envelope) => {
                let message = envelope.error_message();
                warn!("Content save rejected for site {}: {}", site, message);
                self.ctx.notify(Level::Danger, message.clone());
                Err(WizardError::rejected(message))
            }
            Err(err) => Err(self.request_failed("saving content", err)),
        }
    }

    /// Uploads an image for use in the site.
    pub async fn upload_image(&self, file: FilePart) -> Result<UploadOutcome> {
        let Some(site) = &self.site_id else {
            debug!("No site attached; upload skipped");
            return Ok(UploadOutcome::Skipped);
        };

        let name = file.file_name.clone();
        let response = self
            .ctx
            .client
            .send(&routes::upload(site), RequestOptions::post_file("image", file))
            .await;

        match response {
            Ok(envelope) => match envelope.str_field("url") {
                Some(url) => {
                    info!("Uploaded {} to {}", name, url);
                    Ok(UploadOutcome::Uploaded {
                        url: url.to_string(),
                    })
                }
                None => Err(self.request_failed(
                    "uploading image",
                    RequestError::Decode("upload response carries no url".into()),
                )),
            },
            Err(err) => Err(self.request_failed("uploading image", err)),
        }
    }

    /// Publishes the site and schedules the redirect away from the wizard.
    ///
    /// Publishing is never retried automatically.
    pub async fn publish(&self) -> Result<PublishOutcome> {
        let Some(site) = &self.site_id else {
            debug!("No site attached; publish skipped");
            return Ok(PublishOutcome::Skipped);
        };

        let response = self
            .ctx
            .client
            .send(&routes::publish(site), RequestOptions::post())
            .await;

        match response {
            Ok(envelope) if envelope.is_success() => {
                info!("Site {} published", site);
                self.ctx.notify(Level::Success, "Site published successfully!");
                if let Some(storage) = &self.ctx.storage {
                    storage.remove(&PersistedSnapshot::storage_key(site));
                    storage.remove(&PersistedSnapshot::unsaved_key(site));
                }

                let target = self.ctx.config.publish.redirect_to.clone();
                let navigator = self.ctx.navigator.clone();
                let route = target.clone();
                let handle = schedule_after(
                    "publish-redirect",
                    self.ctx.config.redirect_delay(),
                    async move { navigator.redirect(&route) },
                );
                *self.redirect.lock() = Some(handle);
                Ok(PublishOutcome::Published {
                    redirect_to: target,
                })
            }
            Ok(envelope) => {
                let message = envelope.error_message();
                warn!("Publish rejected for site {}: {}", site, message);
                self.ctx.notify(Level::Danger, message.clone());
                Err(WizardError::rejected(message))
            }
            Err(err) => Err(self.request_failed("publishing site", err)),
        }
    }

    /// Opens the read-only preview of the site in a new window.
    pub fn preview(&self) -> Option<String> {
        let site = self.site_id.as_ref()?;
        let url = routes::preview(site);
        self.ctx.navigator.open_window(&url);
        Some(url)
    }

    fn request_failed(&self, action: &str, err: RequestError) -> WizardError {
        error!("Error {}: {}", action, err);
        self.ctx.notify(Level::Danger, err.user_message());
        err.into()
    }

    fn navigate(&self, step: Step) {
        match &self.site_id {
            Some(site) => self.ctx.navigator.redirect(&routes::step(site, step)),
            None => debug!("No site attached; staying on the current page"),
        }
    }

    fn persist(&self, state: &WizardState) {
        let (Some(storage), Some(site)) = (&self.ctx.storage, &self.site_id) else {
            return;
        };
        match serde_json::to_value(state.snapshot()) {
            Ok(value) => storage.set(&PersistedSnapshot::storage_key(site), &value),
            Err(err) => warn!("Could not encode wizard snapshot: {}", err),
        }
    }

    // Kept apart from the snapshot so its stored shape stays unchanged.
    fn persist_unsaved(&self, unsaved: bool) {
        let (Some(storage), Some(site)) = (&self.ctx.storage, &self.site_id) else {
            return;
        };
        let key = PersistedSnapshot::unsaved_key(site);
        if unsaved {
            storage.set(&key, &JsonValue::Bool(true));
        } else {
            storage.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::FieldSpec;
    use crate::request::RequestBody;
    use crate::test_support::{envelope, GatedClient, Harness, UnavailableStorage};
    use serde_json::json;
    use std::time::Duration;

    fn schema() -> ContentSchema {
        ContentSchema::new(vec![
            FieldSpec::required("headline"),
            FieldSpec::optional("tagline"),
        ])
    }

    fn site() -> Option<SiteId> {
        SiteId::new("42")
    }

    fn wizard(harness: &Harness) -> SiteWizard {
        SiteWizard::attach(harness.context(), site(), schema())
    }

    fn at_content_step(harness: &Harness) -> SiteWizard {
        let wizard = wizard(harness);
        wizard.select_template("modern-1").unwrap();
        _ = wizard.advance().unwrap();
        wizard
    }

    #[test]
    fn test_select_template_persists_and_notifies() {
        let harness = Harness::default();
        let wizard = wizard(&harness);

        wizard.select_template("modern-1").unwrap();

        assert_eq!(wizard.draft().template.as_deref(), Some("modern-1"));
        let stored = harness.storage.get("site_builder_42").unwrap();
        assert_eq!(stored["siteData"]["template"], json!("modern-1"));
        assert_eq!(
            harness.notifier.messages_at(Level::Success),
            vec!["Template selected successfully"]
        );
    }

    #[test]
    fn test_blank_template_is_refused() {
        let harness = Harness::default();
        let wizard = wizard(&harness);

        let err = wizard.select_template("  ").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(wizard.draft().template, None);
        assert!(harness.storage.is_empty());
    }

    #[test]
    fn test_advance_without_template_stays_on_step_one() {
        let harness = Harness::default();
        let wizard = wizard(&harness);

        for _ in 0..3 {
            assert!(wizard.advance().is_err());
        }
        assert_eq!(wizard.current_step(), Step::Template);
        assert!(harness.navigator.redirects().is_empty());
        assert_eq!(
            harness.notifier.messages_at(Level::Warning),
            vec!["Please select a template"; 3]
        );
    }

    #[test]
    fn test_advance_never_passes_the_last_step() {
        let harness = Harness::default();
        let wizard = at_content_step(&harness);
        wizard.record_content_edit("headline", "Fresh bread daily");

        for _ in 0..10 {
            assert!(wizard.advance().is_ok());
        }
        assert_eq!(wizard.current_step(), Step::Review);
        assert_eq!(
            harness.navigator.redirects(),
            vec!["/builder/42/step2", "/builder/42/step3", "/builder/42/step4"]
        );
        assert_eq!(wizard.progress_percent(), 100);
    }

    #[test]
    fn test_required_field_blocks_content_step() {
        let harness = Harness::default();
        let wizard = at_content_step(&harness);
        wizard.record_content_edit("headline", "");
        wizard.record_content_edit("tagline", "Since 1901");

        let err = wizard.advance().unwrap_err();

        assert_eq!(wizard.current_step(), Step::Content);
        assert_eq!(wizard.invalid_fields(), vec!["headline"]);
        match err {
            WizardError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["headline".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(harness.navigator.redirects(), vec!["/builder/42/step2"]);
        assert_eq!(
            harness.notifier.last().map(|n| n.message),
            Some("Please fill in all required fields".to_string())
        );

        wizard.record_content_edit("headline", "Fresh bread daily");
        assert!(wizard.invalid_fields().is_empty());
        assert_eq!(wizard.advance().unwrap(), Step::Style);
    }

    #[test]
    fn test_retreat_floors_at_first_step() {
        let harness = Harness::default();
        let wizard = at_content_step(&harness);

        assert_eq!(wizard.retreat(), Step::Template);
        assert_eq!(wizard.retreat(), Step::Template);
        assert_eq!(wizard.retreat(), Step::Template);
        assert_eq!(wizard.current_step(), Step::Template);
        assert_eq!(
            harness.navigator.redirects().last().map(String::as_str),
            Some("/builder/42/step1")
        );
    }

    #[test]
    fn test_snapshot_survives_reattach() {
        let harness = Harness::default();
        let first = at_content_step(&harness);
        first.record_content_edit("headline", "Fresh bread daily");
        first.record_style_edit("color", "#333");
        let before = first.snapshot();
        drop(first);

        let second = wizard(&harness);
        assert_eq!(second.snapshot(), before);
        assert_eq!(second.current_step(), Step::Content);
        assert!(second.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_saved_session_reattaches_clean() {
        let harness = Harness::default();
        let first = at_content_step(&harness);
        first.record_content_edit("headline", "Fresh bread daily");
        assert!(harness.storage.get("site_builder_42_dirty").is_some());
        assert_eq!(first.save_content().await.unwrap(), SaveOutcome::Saved);
        assert!(harness.storage.get("site_builder_42_dirty").is_none());
        drop(first);

        let second = wizard(&harness);
        assert!(!second.has_unsaved_changes());
        assert_eq!(
            second.draft().content_value("headline"),
            Some("Fresh bread daily")
        );
    }

    #[test]
    fn test_snapshot_with_unusable_step_restores_draft() {
        let harness = Harness::default();
        harness.storage.set(
            "site_builder_42",
            &json!({
                "currentStep": 0,
                "siteData": {"template": "modern-1", "content": {"headline": "Hi"}}
            }),
        );

        let wizard = wizard(&harness);
        assert_eq!(wizard.current_step(), Step::Template);
        assert_eq!(wizard.draft().template.as_deref(), Some("modern-1"));
        assert_eq!(wizard.draft().content_value("headline"), Some("Hi"));
    }

    #[test]
    fn test_style_edit_reapplies_full_mapping() {
        let harness = Harness::default();
        let wizard = wizard(&harness);

        wizard.record_style_edit("color", "#333");
        wizard.record_style_edit("font-family", "Lato");
        wizard.record_style_edit("color", "");

        let applied = harness.preview.applied();
        assert_eq!(applied.len(), 3);
        assert_eq!(applied[1].len(), 2);
        assert_eq!(applied[2].get("font-family").map(String::as_str), Some("Lato"));
        assert!(!applied[2].contains_key("color"));
        assert!(wizard.has_unsaved_changes());
    }

    #[test]
    fn test_missing_storage_keeps_state_in_memory() {
        let harness = Harness::default();
        let wizard =
            SiteWizard::attach(harness.context_without_storage(), site(), schema());

        wizard.select_template("modern-1").unwrap();
        assert_eq!(wizard.advance().unwrap(), Step::Content);
        assert_eq!(wizard.draft().template.as_deref(), Some("modern-1"));
    }

    #[test]
    fn test_unavailable_storage_is_tolerated() {
        let harness = Harness::default();
        let storage = Arc::new(UnavailableStorage::default());
        let ctx = harness.context_without_storage().with_storage(storage.clone());
        let wizard = SiteWizard::attach(ctx, site(), schema());

        wizard.select_template("modern-1").unwrap();
        assert_eq!(wizard.advance().unwrap(), Step::Content);
        assert_eq!(storage.attempts(), 3);
    }

    #[test]
    fn test_step_states_and_progress() {
        let harness = Harness::default();
        let wizard = at_content_step(&harness);
        assert_eq!(wizard.progress_percent(), 50);
        assert_eq!(
            wizard.step_states(),
            vec![
                (Step::Template, true),
                (Step::Content, true),
                (Step::Style, false),
                (Step::Review, false),
            ]
        );
    }

    #[test]
    fn test_preview_opens_new_window() {
        let harness = Harness::default();
        let wizard = wizard(&harness);
        assert_eq!(wizard.preview().as_deref(), Some("/preview/42"));
        assert_eq!(harness.navigator.windows(), vec!["/preview/42"]);

        let detached = SiteWizard::attach(harness.context(), None, schema());
        assert_eq!(detached.preview(), None);
    }

    #[tokio::test]
    async fn test_save_content_twice_sends_identical_bodies() {
        let harness = Harness::default();
        let wizard = at_content_step(&harness);
        wizard.record_content_edit("tagline", "Since 1901");
        wizard.record_content_edit("headline", "Fresh bread daily");

        assert_eq!(wizard.save_content().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(wizard.save_content().await.unwrap(), SaveOutcome::Saved);

        let requests = harness.client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[0].0, "/api/sites/42/content");
        assert_eq!(
            requests[0].1,
            RequestOptions::post_json(
                json!({"headline": "Fresh bread daily", "tagline": "Since 1901"})
            )
        );
        assert!(!wizard.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft_and_dirty_flag() {
        let harness = Harness::default();
        harness.client.set_fallback(Err(RequestError::Server {
            status: 500,
            message: "quota exceeded".into(),
        }));
        let wizard = at_content_step(&harness);
        wizard.record_content_edit("headline", "Fresh bread daily");
        let before = wizard.draft();

        let err = wizard.save_content().await.unwrap_err();

        assert_eq!(err.user_message(), "quota exceeded");
        assert_eq!(wizard.draft(), before);
        assert!(wizard.has_unsaved_changes());
        assert_eq!(
            harness.notifier.messages_at(Level::Danger),
            vec!["quota exceeded"]
        );
    }

    #[tokio::test]
    async fn test_rejected_save_is_reported() {
        let harness = Harness::default();
        harness
            .client
            .set_fallback(Ok(envelope(json!({"success": false, "error": "locked"}))));
        let wizard = at_content_step(&harness);

        let err = wizard.save_content().await.unwrap_err();
        assert!(matches!(err, WizardError::Rejected { .. }));
        assert_eq!(harness.notifier.messages_at(Level::Danger), vec!["locked"]);
    }

    #[tokio::test]
    async fn test_remote_operations_without_site_are_noops() {
        let harness = Harness::default();
        let wizard = SiteWizard::attach(harness.context(), None, schema());
        wizard.select_template("modern-1").unwrap();
        wizard.record_content_edit("headline", "Hello");

        assert_eq!(wizard.save_content().await.unwrap(), SaveOutcome::Skipped);
        assert_eq!(wizard.publish().await.unwrap(), PublishOutcome::Skipped);
        let file = FilePart::new("a.png", "image/png", vec![1, 2, 3]);
        assert_eq!(wizard.upload_image(file).await.unwrap(), UploadOutcome::Skipped);

        assert!(harness.client.requests().is_empty());
        assert!(harness.storage.is_empty());
        assert_eq!(wizard.advance().unwrap(), Step::Content);
        assert!(harness.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_upload_returns_served_url() {
        let harness = Harness::default();
        harness
            .client
            .push(Ok(envelope(json!({"url": "/uploads/42/logo.png"}))));
        let wizard = wizard(&harness);

        let file = FilePart::new("logo.png", "image/png", vec![1, 2, 3]);
        let outcome = wizard.upload_image(file.clone()).await.unwrap();

        assert_eq!(
            outcome,
            UploadOutcome::Uploaded {
                url: "/uploads/42/logo.png".into()
            }
        );
        assert_eq!(
            harness.client.requests(),
            vec![(
                "/api/sites/42/upload".to_string(),
                RequestOptions::post_file("image", file)
            )]
        );
    }

    #[tokio::test]
    async fn test_upload_failure_notifies_server_message() {
        let harness = Harness::default();
        harness.client.push(Err(RequestError::Server {
            status: 413,
            message: "File too large".into(),
        }));
        let wizard = wizard(&harness);

        let file = FilePart::new("big.png", "image/png", vec![0; 16]);
        assert!(wizard.upload_image(file).await.is_err());
        assert_eq!(
            harness.notifier.messages_at(Level::Danger),
            vec!["File too large"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_redirects_once_after_delay() {
        let harness = Harness::default();
        let wizard = wizard(&harness);
        wizard.select_template("modern-1").unwrap();
        let started = tokio::time::Instant::now();

        let outcome = wizard.publish().await.unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Published {
                redirect_to: "/dashboard".into()
            }
        );
        assert_eq!(harness.client.paths(), vec!["/builder/42/publish"]);
        assert!(harness.storage.get("site_builder_42").is_none());
        assert!(wizard.redirect_pending());

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(harness.navigator.redirects().is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        let redirects = harness.navigator.timed_redirects();
        assert_eq!(redirects.len(), 1);
        assert_eq!(redirects[0].0, "/dashboard");
        assert!(redirects[0].1 - started >= Duration::from_millis(2000));
        assert!(!wizard.redirect_pending());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(harness.navigator.redirects().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publish_stays_on_step() {
        let harness = Harness::default();
        harness
            .client
            .set_fallback(Err(RequestError::Transport("connection reset".into())));
        let wizard = at_content_step(&harness);

        assert!(wizard.publish().await.is_err());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(wizard.current_step(), Step::Content);
        assert_eq!(harness.navigator.redirects(), vec!["/builder/42/step2"]);
        assert_eq!(harness.client.requests().len(), 1);
        assert_eq!(
            harness.notifier.messages_at(Level::Danger),
            vec!["Transport error: connection reset"]
        );
    }

    #[tokio::test]
    async fn test_edit_during_save_keeps_session_dirty() {
        let harness = Harness::default();
        let client = Arc::new(GatedClient::default());
        let ctx = WizardContext::new(
            harness.config.clone(),
            client.clone(),
            harness.notifier.clone(),
            harness.navigator.clone(),
        )
        .with_storage(harness.storage.clone());
        let wizard = Arc::new(SiteWizard::attach(ctx, site(), schema()));
        wizard.record_content_edit("headline", "v1");

        let saving = wizard.clone();
        let save = tokio::spawn(async move { saving.save_content().await });
        client.request_arrived().await;
        wizard.record_content_edit("headline", "v2");
        client.release();

        assert_eq!(save.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert!(wizard.has_unsaved_changes());
        assert!(harness.storage.get("site_builder_42_dirty").is_some());
        match &client.requests()[0].1.body {
            RequestBody::Json(body) => assert_eq!(body["headline"], json!("v1")),
            other => panic!("unexpected body: {other:?}"),
        }

        client.release();
        assert_eq!(wizard.save_content().await.unwrap(), SaveOutcome::Saved);
        assert!(!wizard.has_unsaved_changes());
    }
}
