// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detecting "I want to talk to a human" messages.

/// Outcome of classifying a caller message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffVerdict {
    /// The pattern that fired, for logging. Never the full message.
    pub matched: &'static str,
}

/// Decides whether a caller message requests a human agent.
///
/// The relay consults the classifier on the latest caller message before
/// opening an upstream stream; a verdict short-circuits the AI entirely.
/// Implementations must be cheap enough to run on every request.
pub trait HandoffClassifier: Send + Sync {
    fn classify(&self, message: &str) -> Option<HandoffVerdict>;
}

/// Patterns the default classifier looks for, case-insensitively.
const AGENT_PATTERNS: &[&str] = &[
    "agent",
    "human",
    "person",
    "real person",
    "support team",
    "live support",
];

/// Case-insensitive substring heuristic over a fixed keyword set.
///
/// Deliberately eager: "person" also fires inside "personal", trading false
/// positives for never stranding a caller with the AI when they asked for a
/// human. An escalated conversation stays escalated, so one false negative
/// would be the costlier mistake.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl HandoffClassifier for KeywordClassifier {
    fn classify(&self, message: &str) -> Option<HandoffVerdict> {
        let lowered = message.to_lowercase();
        AGENT_PATTERNS
            .iter()
            .find(|pattern| lowered.contains(*pattern))
            .map(|pattern| HandoffVerdict { matched: pattern })
    }
}
