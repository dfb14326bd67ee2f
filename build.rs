// Copyright © 2024 SiteWizard. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build script checking the minimum supported Rust version.

use std::process;

/// Minimum supported Rust version, kept in step with `rust-version`.
const MIN_RUST_VERSION: &str = "1.75.0";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    match version_check::is_min_version(MIN_RUST_VERSION) {
        Some(true) => {}
        Some(false) => {
            eprintln!(
                "SiteWizard requires Rust {} or newer. Please update your toolchain.",
                MIN_RUST_VERSION
            );
            process::exit(1);
        }
        None => {
            println!("cargo:warning=Unable to determine the Rust version");
        }
    }
}
