// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the chatgate collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::{CapabilityProvider, FragmentStream};
pub use storage::ConversationStore;
