// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paths of the builder endpoints and pages for one site.

use crate::draft::{SiteId, Step};

/// `POST` target receiving the content mapping.
pub fn content(site: &SiteId) -> String {
    format!("/api/sites/{}/content", site)
}

/// `POST` target receiving multipart image uploads.
pub fn upload(site: &SiteId) -> String {
    format!("/api/sites/{}/upload", site)
}

/// `POST` target publishing the site.
pub fn publish(site: &SiteId) -> String {
    format!("/builder/{}/publish", site)
}

/// Page of a wizard step.
pub fn step(site: &SiteId, step: Step) -> String {
    format!("/builder/{}/step{}", site, step.number())
}

/// Read-only preview of the generated site.
pub fn preview(site: &SiteId) -> String {
    format!("/preview/{}", site)
}
