//! # Topic Routing Patterns
//!
//! AMQP topic-exchange matching. Routing keys and patterns are dot-separated
//! words; in a pattern `*` stands for exactly one word and `#` for zero or more
//! words.

use std::fmt;

/// A binding pattern for a topic exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingPattern(String);

impl RoutingPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `routing_key` is routed to a queue bound with this pattern.
    pub fn matches(&self, routing_key: &str) -> bool {
        let pattern: Vec<&str> = self.0.split('.').collect();
        let key: Vec<&str> = routing_key.split('.').collect();
        match_words(&pattern, &key)
    }
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}

impl fmt::Display for RoutingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutingPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for RoutingPattern {
    fn from(pattern: String) -> Self {
        Self(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_zero_or_more_words() {
        let p = RoutingPattern::new("lab.monitoring.#");
        assert!(p.matches("lab.monitoring"));
        assert!(p.matches("lab.monitoring.agent"));
        assert!(p.matches("lab.monitoring.agent.7.state"));
        assert!(!p.matches("lab.command.dashboard"));
        assert!(!p.matches("lab.monitoringx"));
        assert!(!p.matches("other.lab.monitoring"));
    }

    #[test]
    fn test_star_matches_exactly_one_word() {
        let p = RoutingPattern::new("lab.*.dashboard");
        assert!(p.matches("lab.command.dashboard"));
        assert!(!p.matches("lab.dashboard"));
        assert!(!p.matches("lab.a.b.dashboard"));
    }

    #[test]
    fn test_literal_pattern() {
        let p = RoutingPattern::new("lab.command.dashboard");
        assert!(p.matches("lab.command.dashboard"));
        assert!(!p.matches("lab.command"));
    }

    #[test]
    fn test_hash_in_the_middle() {
        let p = RoutingPattern::new("lab.#.report");
        assert!(p.matches("lab.report"));
        assert!(p.matches("lab.agent.3.report"));
        assert!(!p.matches("lab.agent.3.state"));
    }

    #[test]
    fn test_lone_hash_matches_everything() {
        let p = RoutingPattern::new("#");
        assert!(p.matches("anything.at.all"));
        assert!(p.matches(""));
    }
}
