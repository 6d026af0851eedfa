// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request tier classification for the chatgate gateway.
//!
//! This crate provides:
//! - [`TierClassifier`]: ordered rule evaluation assigning `direct`, `tool`, or `workflow`
//! - [`CombinationTable`]: the read-only table of capability sets that need multi-step coordination
//! - [`heuristic`]: zero-cost text signals used to grade confidence for the `tool` fallback rule
//!
//! Classification is pure: no I/O, no hidden state, no network calls.

pub mod classifier;
pub mod combinations;
pub mod heuristic;

pub use classifier::TierClassifier;
pub use combinations::{CombinationTable, normalize_capabilities};
