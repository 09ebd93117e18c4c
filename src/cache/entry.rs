//! Cache entry, key pattern and statistics types.
//!
//! An entry is the unit of storage: a value plus the timestamps that decide
//! its visibility. Entries are serialized verbatim into snapshots.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::clock::Millis;

/// Marker that turns an invalidation pattern into a wildcard match.
pub const WILDCARD: char = '*';

/// A single cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub value: V,

    /// Entry is hidden once `now >= expiry`.
    pub expiry: Millis,

    pub created_at: Millis,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, now: Millis, ttl_ms: u64) -> Self {
        Self {
            value,
            expiry: now.saturating_add(ttl_ms),
            created_at: now,
        }
    }

    /// Whether the entry is still visible at `now`.
    pub fn is_live(&self, now: Millis) -> bool {
        self.expiry > now
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        !self.is_live(now)
    }

    /// Milliseconds of life left, zero once expired.
    pub fn remaining_ms(&self, now: Millis) -> u64 {
        self.expiry.saturating_sub(now)
    }
}

/// A parsed invalidation pattern.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Plain text, or text with a single trailing `*`: matches keys starting with it.
    Prefix(String),
    /// `*` somewhere before the end: each `*` matches any run of characters
    /// and the pattern must cover the whole key.
    Glob(Regex),
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.find(WILDCARD) {
            None => KeyPattern::Prefix(pattern.to_string()),
            Some(idx) if idx == pattern.len() - 1 => {
                KeyPattern::Prefix(pattern[..idx].to_string())
            }
            Some(_) => {
                let glob = regex::escape(pattern).replace(r"\*", ".*");
                match Regex::new(&format!("^{glob}$")) {
                    Ok(re) => KeyPattern::Glob(re),
                    Err(_) => KeyPattern::Prefix(pattern.to_string()),
                }
            }
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyPattern::Glob(re) => re.is_match(key),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        KeyPattern::parse(pattern)
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Percentage with two decimals and a `%` suffix, e.g. `"66.67%"`.
    pub hit_rate: String,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: usize, max_size: usize) -> Self {
        Self {
            hits,
            misses,
            hit_rate: format_hit_rate(hits, misses),
            size,
            max_size,
        }
    }
}

/// Format `hits / (hits + misses)` as a percentage string.
pub fn format_hit_rate(hits: u64, misses: u64) -> String {
    let total = hits + misses;
    if total == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", hits as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_visibility_boundary() {
        let entry = CacheEntry::new("v", 1_000, 500);
        assert_eq!(entry.expiry, 1_500);
        assert!(entry.is_live(1_499));
        assert!(entry.is_expired(1_500));
        assert_eq!(entry.remaining_ms(1_200), 300);
        assert_eq!(entry.remaining_ms(9_999), 0);
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = CacheEntry::new(7, 10, 5);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"value": 7, "expiry": 15, "createdAt": 10}));
    }

    #[test]
    fn test_pattern_parsing() {
        assert!(matches!(KeyPattern::parse("user"), KeyPattern::Prefix(p) if p == "user"));
        assert!(matches!(KeyPattern::parse("user:1:*"), KeyPattern::Prefix(p) if p == "user:1:"));
        assert!(matches!(KeyPattern::parse("user:*:profile"), KeyPattern::Glob(_)));
        assert!(matches!(KeyPattern::parse("*"), KeyPattern::Prefix(p) if p.is_empty()));
    }

    #[test]
    fn test_prefix_matching() {
        let pattern = KeyPattern::parse("user:1:*");
        assert!(pattern.matches("user:1:profile"));
        assert!(!pattern.matches("user:2:profile"));
        assert!(!pattern.matches("user:10"));
    }

    #[test]
    fn test_glob_matching() {
        let pattern = KeyPattern::parse("campaign:*:donations");
        assert!(pattern.matches("campaign:42:donations"));
        assert!(pattern.matches("campaign::donations"));
        assert!(!pattern.matches("campaign:42:donations:page2"));
        assert!(!pattern.matches("campaign:42:meta"));

        let pattern = KeyPattern::parse("*:balance*x");
        assert!(pattern.matches("acct:balance:x"));
        assert!(!pattern.matches("acct:balance:y"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let pattern = KeyPattern::parse("tx.*(pending)");
        assert!(pattern.matches("tx.0xab(pending)"));
        assert!(!pattern.matches("txX0xab(pending)"));
        assert!(!pattern.matches("tx.0xab pending"));
    }

    #[test]
    fn test_hit_rate_formatting() {
        assert_eq!(format_hit_rate(0, 0), "0.00%");
        assert_eq!(format_hit_rate(2, 1), "66.67%");
        assert_eq!(format_hit_rate(1, 0), "100.00%");
        assert_eq!(format_hit_rate(0, 4), "0.00%");
    }
}
