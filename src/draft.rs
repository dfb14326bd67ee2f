// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Draft Module
//!
//! The data a wizard session accumulates: the [`SiteDraft`] itself, the
//! [`Step`] the user is on, the [`PersistedSnapshot`] written to local
//! storage, and the [`ContentSchema`] declaring which content fields are
//! required.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier of a template in the backend's catalog.
pub type TemplateId = String;

/// Key of an editable content field.
pub type FieldKey = String;

/// A style property applied to the live preview, such as `color`.
pub type StyleProperty = String;

/// Identifier of the site being built.
///
/// Limited to ASCII letters, digits, `-` and `_`, so it can be placed in
/// routes and storage keys as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteId(String);

impl SiteId {
    /// Wraps a site identifier, rejecting blank values and characters
    /// outside the route-safe set.
    pub fn new<S: Into<String>>(id: S) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        let safe = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if trimmed.is_empty() || !safe {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SiteId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.as_str())
            .ok_or_else(|| format!("invalid site id: {:?}", value))
    }
}

impl From<SiteId> for String {
    fn from(id: SiteId) -> Self {
        id.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four wizard steps, in order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    /// Step 1: choose a template.
    #[default]
    Template = 1,
    /// Step 2: fill in content fields.
    Content = 2,
    /// Step 3: adjust style.
    Style = 3,
    /// Step 4: review and publish.
    Review = 4,
}

impl Step {
    /// Number of steps in the wizard.
    pub const COUNT: u8 = 4;

    /// All steps in order.
    pub const ALL: [Step; 4] =
        [Step::Template, Step::Content, Step::Style, Step::Review];

    /// Step number, starting at 1.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The following step, or `None` from the last one.
    pub fn next(self) -> Option<Step> {
        Step::try_from(self.number() + 1).ok()
    }

    /// The preceding step, or `None` from the first one.
    pub fn previous(self) -> Option<Step> {
        self.number()
            .checked_sub(1)
            .and_then(|n| Step::try_from(n).ok())
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Step::Template => "template",
            Step::Content => "content",
            Step::Style => "style",
            Step::Review => "review",
        }
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Step::Template),
            2 => Ok(Step::Content),
            3 => Ok(Step::Style),
            4 => Ok(Step::Review),
            other => Err(format!("step must be between 1 and 4, got {}", other)),
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.number()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

/// Everything the user has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteDraft {
    /// Selected template, if any.
    pub template: Option<TemplateId>,
    /// Content field values.
    pub content: BTreeMap<FieldKey, String>,
    /// Style properties applied to the preview.
    pub style: BTreeMap<StyleProperty, String>,
    /// Free-form site settings.
    pub settings: BTreeMap<String, JsonValue>,
}

impl SiteDraft {
    /// Value of a content field, treating blank text as absent.
    pub fn content_value(&self, key: &str) -> Option<&str> {
        self.content
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Local recovery record stored under the session's storage key.
///
/// A missing or unusable `currentStep` loads as the template step; the
/// draft is kept either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSnapshot")]
pub struct PersistedSnapshot {
    /// Step the user was on.
    pub current_step: Step,
    /// Draft at the time of the write.
    pub site_data: SiteDraft,
}

impl PersistedSnapshot {
    /// Storage key for a site's snapshot.
    pub fn storage_key(site_id: &SiteId) -> String {
        format!("site_builder_{}", site_id)
    }

    /// Storage key of the marker recording edits the backend has not seen.
    pub fn unsaved_key(site_id: &SiteId) -> String {
        format!("site_builder_{}_dirty", site_id)
    }

    /// Decodes a stored value, returning `None` when it is not a snapshot.
    pub fn from_value(value: JsonValue) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("Ignoring unreadable wizard snapshot: {}", err);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshot {
    #[serde(default)]
    current_step: Option<JsonValue>,
    #[serde(default)]
    site_data: SiteDraft,
}

impl From<StoredSnapshot> for PersistedSnapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let step = stored
            .current_step
            .as_ref()
            .and_then(JsonValue::as_u64)
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| Step::try_from(n).ok());
        if step.is_none() {
            log::debug!(
                "Snapshot step {:?} unusable; starting at step 1",
                stored.current_step
            );
        }
        Self {
            current_step: step.unwrap_or_default(),
            site_data: stored.site_data,
        }
    }
}

/// Declaration of one content field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field key, as used in the content mapping.
    pub key: FieldKey,
    /// Whether the field must be filled before leaving the content step.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// A field that must be filled in.
    pub fn required<S: Into<String>>(key: S) -> Self {
        Self {
            key: key.into(),
            required: true,
        }
    }

    /// A field that may stay empty.
    pub fn optional<S: Into<String>>(key: S) -> Self {
        Self {
            key: key.into(),
            required: false,
        }
    }
}

/// The set of content fields a template exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSchema {
    fields: Vec<FieldSpec>,
}

impl ContentSchema {
    /// Creates a schema from field declarations.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// All declared fields.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Keys of the required fields, in declaration order.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.key.as_str())
    }

    /// Required fields the draft leaves blank.
    pub fn missing_required(&self, draft: &SiteDraft) -> Vec<FieldKey> {
        self.required_keys()
            .filter(|key| draft.content_value(key).is_none())
            .map(String::from)
            .collect()
    }
}
