// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation port.
//!
//! Login start and callback completion end with a hard navigation (to the
//! provider consent page, then to the dashboard). The auth session only calls
//! this trait, so it runs the same way under tests and in the CLI.

/// Target of a terminal navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Prints URLs for the user to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        tracing::info!(url = %url, "Navigating");
        println!("Open this URL in your browser:\n\n    {}\n", url);
    }
}
