// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic confidence grading for free-text requests.
//!
//! Only consulted after the deterministic rules have fallen through to the
//! `tool` tier. The signals never change the tier; they only lower the
//! confidence when the message reads like a multi-step job that no
//! registered combination or workflow name captured.

/// Multi-step indicator patterns (contains, case-insensitive).
const COMPLEX_INDICATORS: &[&str] = &[
    "analyze", "compare", "evaluate", "implement", "design",
    "architecture", "trade-off", "tradeoff", "pros and cons",
    "step by step", "explain in detail", "debug", "refactor",
    "and then", "after that", "research", "plan", "report",
    "optimize", "strategy", "in depth", "comprehensive",
];

/// Confidence for a `tool` decision with no ambiguity signals.
const CLEAR_CONFIDENCE: f32 = 0.9;

/// Lowest confidence the heuristic will report.
const FLOOR_CONFIDENCE: f32 = 0.5;

/// Grade the confidence of a `tool` decision for `message`.
///
/// Each signal pointing towards multi-step work shaves off some confidence.
pub fn tool_confidence(message: &str, capability_count: usize) -> f32 {
    let trimmed = message.trim();
    let lower = trimmed.to_lowercase();
    let mut penalty = 0.0_f32;

    // Signal 1: multi-step wording
    let indicators = COMPLEX_INDICATORS
        .iter()
        .filter(|c| lower.contains(*c))
        .count();
    penalty += 0.1 * indicators.min(3) as f32;

    // Signal 2: code blocks
    if trimmed.contains("```") {
        penalty += 0.1;
    }

    // Signal 3: long message
    if trimmed.split_whitespace().count() > 50 {
        penalty += 0.05;
    }

    // Signal 4: several sentences
    if count_sentences(trimmed) >= 3 {
        penalty += 0.05;
    }

    // Signal 5: several capabilities that no registered combination covers
    if capability_count >= 3 {
        penalty += 0.1;
    }

    (CLEAR_CONFIDENCE - penalty).max(FLOOR_CONFIDENCE)
}

/// Count sentence-ending punctuation, at least 1 for non-empty text.
pub fn count_sentences(text: &str) -> usize {
    let count = text.chars().filter(|c| matches!(c, '.' | '?' | '!')).count();
    if text.trim().is_empty() { 0 } else { count.max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_is_clear() {
        assert_eq!(tool_confidence("look up the weather", 1), CLEAR_CONFIDENCE);
    }

    #[test]
    fn multi_step_wording_lowers_confidence() {
        let c = tool_confidence("research the topic and then compare the results", 1);
        assert!(c < CLEAR_CONFIDENCE);
        assert!(c >= FLOOR_CONFIDENCE);
    }

    #[test]
    fn confidence_never_drops_below_floor() {
        let msg = "analyze compare evaluate implement design refactor ```x``` ".repeat(20);
        assert_eq!(tool_confidence(&msg, 10), FLOOR_CONFIDENCE);
    }

    #[test]
    fn sentence_counting() {
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("no punctuation"), 1);
        assert_eq!(count_sentences("One. Two! Three?"), 3);
    }
}
