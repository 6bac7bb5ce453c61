// Copyright 2026 Tomato Tracker Contributors
// SPDX-License-Identifier: MIT

//! Tomato tracker library — renders a review page in headless Chromium,
//! extracts the critic and audience score widgets, and appends them to
//! append-only JSON logs.
//!
//! This library crate exposes the core modules for integration testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod renderer;
pub mod scrape;
pub mod store;

pub use error::{ErrorKind, Result, TrackerError};
