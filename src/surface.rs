// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Terminal implementations of the navigation and preview surfaces.
//!
//! A terminal has no pages to leave, so navigation is reported as a line of
//! output naming the target route.

use std::collections::BTreeMap;

use log::debug;

use crate::core::traits::{Navigator, PreviewSurface};

/// Prints redirects instead of following them.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNavigator {
    base_url: String,
}

impl ConsoleNavigator {
    /// Navigator printing routes prefixed with `base_url`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute form of a route.
    pub fn full(&self, url: &str) -> String {
        format!("{}{}", self.base_url, url)
    }
}

impl Navigator for ConsoleNavigator {
    fn redirect(&self, url: &str) {
        debug!("redirect to {}", url);
        println!("-> {}", self.full(url));
    }

    fn open_window(&self, url: &str) {
        debug!("open window at {}", url);
        println!("-> (new window) {}", self.full(url));
    }
}

/// Prints the style mapping as CSS declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePreview;

/// Renders a style mapping as a CSS declaration block.
pub fn css_declarations(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(property, value)| format!("{}: {};", property, value))
        .collect::<Vec<_>>()
        .join(" ")
}

impl PreviewSurface for ConsolePreview {
    fn apply_style(&self, style: &BTreeMap<String, String>) {
        println!("preview {{ {} }}", css_declarations(style));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigator_prefixes_base_url() {
        let nav = ConsoleNavigator::new("http://localhost:5000/");
        assert_eq!(
            nav.full("/builder/1/step2"),
            "http://localhost:5000/builder/1/step2"
        );
        assert_eq!(ConsoleNavigator::default().full("/dashboard"), "/dashboard");
    }

    #[test]
    fn test_css_declarations() {
        let mut style = BTreeMap::new();
        _ = style.insert("color".to_string(), "#222".to_string());
        _ = style.insert("font-family".to_string(), "Lato".to_string());
        assert_eq!(
            css_declarations(&style),
            "color: #222; font-family: Lato;"
        );
        assert_eq!(css_declarations(&BTreeMap::new()), "");
    }
}
