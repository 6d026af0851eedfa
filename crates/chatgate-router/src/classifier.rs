// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based tier classification.
//!
//! Rules are evaluated in order and the first match wins:
//! 1. no capabilities and no workflow hint: `direct`
//! 2. the hint names a known workflow: `workflow`
//! 3. the capabilities cover a registered complex combination: `workflow`
//! 4. anything else: `tool`
//!
//! Rules 1-3 are set lookups and always report confidence 1.0. Only rule 4
//! consults the text heuristics, and only to grade confidence.

use std::collections::{BTreeSet, HashSet};

use chatgate_config::model::RoutingConfig;
use chatgate_core::{RoutingDecision, Tier};
use tracing::debug;

use crate::combinations::{CombinationTable, normalize_capabilities};
use crate::heuristic;

/// Deterministic request classifier. Immutable after construction.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    workflows: HashSet<String>,
    combinations: CombinationTable,
    heuristic_fallback: bool,
}

impl TierClassifier {
    /// Build a classifier from the routing section of the config.
    pub fn new(config: &RoutingConfig) -> Self {
        Self::from_parts(
            config.workflows.iter().map(String::as_str),
            CombinationTable::new(config.complex_combinations.iter()),
            config.heuristic_fallback,
        )
    }

    /// Build a classifier from explicit workflow names and a combination table.
    pub fn from_parts<'a>(
        workflows: impl IntoIterator<Item = &'a str>,
        combinations: CombinationTable,
        heuristic_fallback: bool,
    ) -> Self {
        let workflows = workflows
            .into_iter()
            .map(normalize_workflow)
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            workflows,
            combinations,
            heuristic_fallback,
        }
    }

    /// Whether `name` is a known multi-step workflow (case-insensitive).
    pub fn is_known_workflow(&self, name: &str) -> bool {
        self.workflows.contains(&normalize_workflow(name))
    }

    /// Assign a tier to one request.
    ///
    /// A blank hint is treated as absent. An unrecognized hint is not an
    /// error: it falls through to the combination and tool rules.
    /// Capability names are trimmed and blank names ignored, matching how
    /// the combination table stores them.
    pub fn classify(
        &self,
        message: &str,
        requested_capabilities: &BTreeSet<String>,
        workflow_hint: Option<&str>,
    ) -> RoutingDecision {
        let hint = workflow_hint.map(str::trim).filter(|h| !h.is_empty());
        let requested_capabilities = &normalize_capabilities(requested_capabilities);
        let decision = |tier, confidence, reason| RoutingDecision {
            tier,
            required_capabilities: requested_capabilities.clone(),
            confidence,
            reason,
        };

        // Rule 1: nothing beyond plain generation requested
        if requested_capabilities.is_empty() && hint.is_none() {
            return decision(Tier::Direct, 1.0, "no capabilities requested");
        }

        // Rule 2: explicit workflow
        if let Some(h) = hint {
            if self.is_known_workflow(h) {
                return decision(Tier::Workflow, 1.0, "known workflow hint");
            }
            debug!(hint = h, "unrecognized workflow hint, falling through");
        }

        // Rule 3: registered complex combination
        if self.combinations.matches(requested_capabilities) {
            return decision(Tier::Workflow, 1.0, "complex capability combination");
        }

        // Rule 4: single tool-augmented generation
        let confidence = if self.heuristic_fallback {
            heuristic::tool_confidence(message, requested_capabilities.len())
        } else {
            1.0
        };
        decision(Tier::Tool, confidence, "capabilities requested")
    }
}

fn normalize_workflow(name: &str) -> String {
    name.trim().to_lowercase()
}
