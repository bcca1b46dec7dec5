// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Heuristic query classification.
//!
//! [`QueryClassifier`] decides whether free text is a premium-grade
//! `Specific` lookup or a cheap `General` question.  The vocabulary lives in a
//! weight table ([`SignalGroup`]) rather than in branching code, so adding a
//! niche or a platform is a data change.
//!
//! Scoring:
//!
//! 1. Normalise (trim, lowercase).  Empty text is `General` with confidence 0.
//! 2. An explicit `search for:` prefix is `Specific` with confidence 100,
//!    regardless of what follows.
//! 3. Otherwise each group contributes `first_hit` for its first matching
//!    term, `additional_hit` for every further distinct term, up to `cap`.
//!    Group scores are summed and capped at 100.
//! 4. The text is `Specific` iff the score reaches the threshold.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{ClassificationResult, QueryCategory};

/// Prefix that always marks a query as `Specific`.
pub const EXPLICIT_SEARCH_PREFIX: &str = "search for:";

/// Default confidence threshold for a `Specific` verdict.
pub const DEFAULT_THRESHOLD: u8 = 60;

/// A family of terms that share a weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub name: String,
    /// Single words or space-separated phrases, lowercase.
    pub terms: Vec<String>,
    pub first_hit: u8,
    pub additional_hit: u8,
    pub cap: u8,
}

impl SignalGroup {
    fn new(name: &str, terms: &[&str], first_hit: u8, additional_hit: u8, cap: u8) -> Self {
        Self {
            name: name.into(),
            terms: terms.iter().map(|term| (*term).to_owned()).collect(),
            first_hit,
            additional_hit,
            cap,
        }
    }

    fn score(&self, tokens: &[String]) -> u8 {
        let hits = self
            .terms
            .iter()
            .filter(|term| contains_term(tokens, term))
            .count();
        if hits == 0 {
            return 0;
        }
        let extra = u32::from(self.additional_hit) * (hits as u32 - 1);
        let total = u32::from(self.first_hit) + extra;
        total.min(u32::from(self.cap)) as u8
    }
}

/// The built-in weight table.
pub fn default_signal_groups() -> Vec<SignalGroup> {
    vec![
        SignalGroup::new(
            "creator",
            &[
                "kol", "koc", "influencer", "creator", "blogger", "vlogger", "streamer",
                "youtuber", "tiktoker", "reviewer", "ambassador",
            ],
            30,
            10,
            40,
        ),
        SignalGroup::new(
            "niche",
            &[
                "beauty", "fashion", "skincare", "makeup", "food", "vegan", "travel",
                "fitness", "gaming", "tech", "lifestyle", "parenting", "finance", "music",
                "sport", "pet",
            ],
            20,
            5,
            25,
        ),
        SignalGroup::new(
            "platform",
            &["tiktok", "instagram", "youtube", "facebook", "shopee", "threads"],
            15,
            5,
            20,
        ),
        SignalGroup::new(
            "lookup",
            &[
                "find", "search", "looking for", "recommend", "suggest", "show me", "list",
                "who are", "top",
            ],
            25,
            5,
            30,
        ),
        SignalGroup::new(
            "audience",
            &["followers", "follower", "engagement", "subscribers", "views", "reach"],
            15,
            5,
            20,
        ),
    ]
}

/// Pure text classifier with an explicit weight table.
///
/// # Examples
///
/// ```rust
/// use credit_gate_core::classifier::QueryClassifier;
/// use credit_gate_core::types::QueryCategory;
///
/// let classifier = QueryClassifier::default();
///
/// let result = classifier.classify("search for: vegan food creators");
/// assert_eq!(result.category, QueryCategory::Specific);
/// assert_eq!(result.confidence_score, 100);
///
/// let result = classifier.classify("hello, how are you");
/// assert_eq!(result.category, QueryCategory::General);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryClassifier {
    groups: Vec<SignalGroup>,
    threshold: u8,
}

impl QueryClassifier {
    pub fn new(groups: Vec<SignalGroup>, threshold: u8) -> Self {
        Self { groups, threshold }
    }

    /// The default weight table with a custom threshold.
    pub fn with_threshold(threshold: u8) -> Self {
        Self::new(default_signal_groups(), threshold)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Classify `text`.  Never fails.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let normalised = text.trim().to_lowercase();
        if normalised.is_empty() {
            return ClassificationResult::unclassified();
        }
        if normalised.starts_with(EXPLICIT_SEARCH_PREFIX) {
            return ClassificationResult {
                category: QueryCategory::Specific,
                confidence_score: 100,
            };
        }

        let tokens = tokenize(&normalised);
        let score: u32 = self
            .groups
            .iter()
            .map(|group| {
                let points = group.score(&tokens);
                trace!(group = %group.name, points, "classifier signal");
                u32::from(points)
            })
            .sum();
        let confidence_score = score.min(100) as u8;

        let category = if confidence_score >= self.threshold {
            QueryCategory::Specific
        } else {
            QueryCategory::General
        };
        ClassificationResult {
            category,
            confidence_score,
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split on anything that is not a letter or digit.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Whether the token stream contains `term` as a whole word or phrase.
/// A trailing plural `s` on the last word is tolerated.
fn contains_term(tokens: &[String], term: &str) -> bool {
    let words: Vec<&str> = term.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens.windows(words.len()).any(|window| {
        let last = words.len() - 1;
        window.iter().zip(&words).enumerate().all(|(index, (token, word))| {
            token == word || (index == last && token.strip_suffix('s') == Some(*word))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_prefix_is_always_specific() {
        let classifier = QueryClassifier::default();
        let result = classifier.classify("search for: vegan food creators");
        assert_eq!(result.category, QueryCategory::Specific);
        assert_eq!(result.confidence_score, 100);

        let result = classifier.classify("  SEARCH FOR: anything at all");
        assert_eq!(result.confidence_score, 100);
    }

    #[test]
    fn test_small_talk_is_general() {
        let result = QueryClassifier::default().classify("hello, how are you");
        assert_eq!(result.category, QueryCategory::General);
        assert!(result.confidence_score <= DEFAULT_THRESHOLD);
        assert_eq!(result.confidence_score, 0);
    }

    #[test]
    fn test_empty_input_is_general_zero() {
        let classifier = QueryClassifier::default();
        assert_eq!(classifier.classify(""), ClassificationResult::unclassified());
        assert_eq!(classifier.classify("   \n"), ClassificationResult::unclassified());
    }

    #[test]
    fn test_creator_lookup_is_specific() {
        let result =
            QueryClassifier::default().classify("Find beauty influencers on TikTok please");
        assert_eq!(result.category, QueryCategory::Specific);
        // creator 30 + niche 20 + platform 15 + lookup 25
        assert_eq!(result.confidence_score, 90);
    }

    #[test]
    fn test_single_signal_stays_general() {
        let result = QueryClassifier::default().classify("what is an influencer?");
        assert_eq!(result.category, QueryCategory::General);
        assert_eq!(result.confidence_score, 30);
    }

    #[test]
    fn test_group_cap_limits_repeated_vocabulary() {
        let result = QueryClassifier::default().classify("kol koc influencer creator blogger");
        assert_eq!(result.confidence_score, 40);
        assert_eq!(result.category, QueryCategory::General);
    }

    #[test]
    fn test_substrings_do_not_match() {
        // "kolkata" must not count as "kol", "topic" not as "top".
        let result = QueryClassifier::default().classify("a topic about kolkata");
        assert_eq!(result.confidence_score, 0);
    }

    #[test]
    fn test_phrase_terms_match() {
        let result = QueryClassifier::default().classify("I'm looking for fashion creators");
        // creator 30 + niche 20 + lookup 25
        assert_eq!(result.confidence_score, 75);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // creator 30 + lookup 25 + niche 20 = 75
        let classifier = QueryClassifier::with_threshold(75);
        let result = classifier.classify("find fashion kols");
        assert_eq!(result.confidence_score, 75);
        assert_eq!(result.category, QueryCategory::Specific);

        let stricter = QueryClassifier::with_threshold(76);
        assert_eq!(stricter.classify("find fashion kols").category, QueryCategory::General);
    }

    #[test]
    fn test_score_never_exceeds_hundred() {
        let result = QueryClassifier::default().classify(
            "find top beauty fashion kol influencers on tiktok instagram youtube with followers engagement",
        );
        assert_eq!(result.confidence_score, 100);
    }
}
