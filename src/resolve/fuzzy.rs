//! Fuzzy suggestions for the interactive search menu
//!
//! Suggestions only help the operator find a candidate. Nothing here decides
//! identity: a suggestion becomes a resolution only once the operator picks it.

use std::cmp::Ordering;

use strsim::jaro_winkler;

use crate::core::name::{fold, NameKey};

/// Minimum Jaro-Winkler similarity for an approximate match
const APPROXIMATE_THRESHOLD: f64 = 0.75;

/// How a candidate matched the query, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    /// Equal ignoring case
    Exact,
    Prefix,
    Substring,
    /// Every query character appears in order
    Subsequence,
    /// Similar by edit distance
    Approximate,
}

/// One ranked candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Suggestion<'a> {
    /// Position in the candidate list
    pub index: usize,
    pub label: &'a str,
    pub tier: MatchTier,
    pub score: f64,
}

/// Ranks a fixed list of candidate labels against typed text
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    labels: Vec<String>,
    folded: Vec<String>,
}

impl FuzzyMatcher {
    /// Build a matcher; candidate order is the tie-break order
    pub fn new(labels: Vec<String>) -> Self {
        let folded = labels.iter().map(|label| fold(label)).collect();
        Self { labels, folded }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the first label equal to `text` after whitespace normalization
    pub fn position(&self, text: &str) -> Option<usize> {
        let key = NameKey::new(text)?;
        self.labels
            .iter()
            .position(|label| NameKey::new(label).as_ref() == Some(&key))
    }

    /// Ranked suggestions for `query`, computed on first use
    pub fn suggestions(&self, query: &str) -> Suggestions<'_> {
        Suggestions {
            matcher: self,
            query: fold(query),
            ranked: None,
            pos: 0,
        }
    }

    /// The single best suggestion
    pub fn best(&self, query: &str) -> Option<Suggestion<'_>> {
        self.suggestions(query).next()
    }

    fn rank(&self, query: &str) -> Vec<Suggestion<'_>> {
        let mut ranked: Vec<Suggestion<'_>> = self
            .folded
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let (tier, score) = classify(query, candidate)?;
                Some(Suggestion {
                    index,
                    label: &self.labels[index],
                    tier,
                    score,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
                .then_with(|| a.index.cmp(&b.index))
        });
        ranked
    }
}

fn classify(query: &str, candidate: &str) -> Option<(MatchTier, f64)> {
    if query.is_empty() {
        return Some((MatchTier::Prefix, 1.0));
    }

    let score = jaro_winkler(query, candidate);
    let tier = if candidate == query {
        MatchTier::Exact
    } else if candidate.starts_with(query) {
        MatchTier::Prefix
    } else if candidate.contains(query) {
        MatchTier::Substring
    } else if is_subsequence(query, candidate) {
        MatchTier::Subsequence
    } else if score >= APPROXIMATE_THRESHOLD {
        MatchTier::Approximate
    } else {
        return None;
    };
    Some((tier, score))
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|c| rest.any(|h| h == c))
}

/// Lazily ranked, restartable sequence of suggestions
#[derive(Debug, Clone)]
pub struct Suggestions<'a> {
    matcher: &'a FuzzyMatcher,
    query: String,
    ranked: Option<Vec<Suggestion<'a>>>,
    pos: usize,
}

impl Suggestions<'_> {
    /// Rewind to the best suggestion without re-ranking
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<'a> Iterator for Suggestions<'a> {
    type Item = Suggestion<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let matcher = self.matcher;
        let query = &self.query;
        let ranked = self.ranked.get_or_insert_with(|| matcher.rank(query));
        let next = ranked.get(self.pos).copied();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(labels: &[&str]) -> FuzzyMatcher {
        FuzzyMatcher::new(labels.iter().map(|s| s.to_string()).collect())
    }

    fn ranked<'a>(m: &'a FuzzyMatcher, query: &str) -> Vec<&'a str> {
        m.suggestions(query).map(|s| s.label).collect()
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let m = matcher(&["HMS Foobar", "Foo Fighter", "HMS FOO"]);
        let best = m.best("hms foo").unwrap();
        assert_eq!(best.label, "HMS FOO");
        assert_eq!(best.tier, MatchTier::Exact);
    }

    #[test]
    fn test_tiers_order_results() {
        let m = matcher(&["Seahawk", "Hawkeye", "Harrier", "Nighthawk"]);
        let results: Vec<_> = m.suggestions("hawk").map(|s| (s.label, s.tier)).collect();
        assert_eq!(results[0], ("Hawkeye", MatchTier::Prefix));
        assert!(results
            .iter()
            .skip(1)
            .take(2)
            .all(|(_, tier)| *tier == MatchTier::Substring));
        assert!(!results.iter().any(|(label, _)| *label == "Harrier"));
    }

    #[test]
    fn test_subsequence_and_approximate() {
        let m = matcher(&["Type 45 Destroyer", "Frigate"]);
        assert_eq!(m.best("t45d").unwrap().tier, MatchTier::Subsequence);

        let m = matcher(&["Warship"]);
        let best = m.best("warshp").unwrap();
        assert_eq!(best.label, "Warship");
        assert_eq!(best.tier, MatchTier::Subsequence);

        let m = matcher(&["Martha"]);
        assert_eq!(m.best("marhta").unwrap().tier, MatchTier::Approximate);
        assert!(m.best("zzz").is_none());
    }

    #[test]
    fn test_ties_break_by_candidate_order() {
        let m = matcher(&["GPS-2", "GPS-1"]);
        assert_eq!(ranked(&m, "gps"), vec!["GPS-2", "GPS-1"]);
    }

    #[test]
    fn test_empty_query_lists_everything_in_order() {
        let m = matcher(&["C", "A", "B"]);
        assert_eq!(ranked(&m, "  "), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_suggestions_are_restartable() {
        let m = matcher(&["Alpha", "Alphabet", "Alpine"]);
        let mut suggestions = m.suggestions("alp");
        let first: Vec<_> = suggestions.by_ref().take(2).map(|s| s.label).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(suggestions.by_ref().count(), 1);

        suggestions.restart();
        let again: Vec<_> = suggestions.map(|s| s.label).collect();
        assert_eq!(again.len(), 3);
        assert_eq!(again[..2], first[..]);
    }

    #[test]
    fn test_position_ignores_whitespace_not_case() {
        let m = matcher(&["HMS Foo", "HMS FOO"]);
        assert_eq!(m.position(" HMS  FOO "), Some(1));
        assert_eq!(m.position("hms foo"), None);
    }
}
