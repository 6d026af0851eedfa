// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatgate integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted capability provider (replies, streams, failures, hangs)
//! - [`TestHarness`] - A full pipeline over an in-memory store with one mock per tier

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, Script};
