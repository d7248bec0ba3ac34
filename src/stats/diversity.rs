//! Diversity of categorical usage (`name -> count` multisets).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{entropy, round};

/// Simpson diversity index `1 - Σp²`.
///
/// `0.0` for an empty multiset or one dominated by a single name; approaches
/// `1.0` as usage spreads over many names evenly.
#[must_use]
pub fn simpson_index(counts: &BTreeMap<String, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let concentration: f64 = counts
        .values()
        .map(|c| {
            let p = *c as f64 / total;
            p * p
        })
        .sum();
    (1.0 - concentration).clamp(0.0, 1.0)
}

/// Shannon entropy (bits) of usage counts.
#[must_use]
pub fn usage_entropy(counts: &BTreeMap<String, usize>) -> f64 {
    let frequencies: Vec<f64> = counts.values().map(|c| *c as f64).collect();
    entropy(&frequencies)
}

/// Entropy divided by its maximum `log2(k)`; `0.0` for fewer than two names.
#[must_use]
pub fn normalized_entropy(counts: &BTreeMap<String, usize>) -> f64 {
    let distinct = counts.values().filter(|c| **c > 0).count();
    if distinct < 2 {
        return 0.0;
    }
    (usage_entropy(counts) / (distinct as f64).log2()).clamp(0.0, 1.0)
}

/// Sum several multisets into one.
pub fn merge_counts<'a>(
    maps: impl IntoIterator<Item = &'a BTreeMap<String, usize>>,
) -> BTreeMap<String, usize> {
    let mut merged = BTreeMap::new();
    for map in maps {
        for (name, count) in map {
            *merged.entry(name.clone()).or_insert(0) += count;
        }
    }
    merged
}

/// Most used names, highest count first, ties broken by name.
pub fn top_n(counts: &BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

/// Diversity profile of one multiset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityProfile {
    pub total: usize,
    pub distinct: usize,
    pub simpson: f64,
    pub entropy: f64,
    pub normalized_entropy: f64,
}

impl DiversityProfile {
    pub fn from_counts(counts: &BTreeMap<String, usize>) -> Self {
        Self {
            total: counts.values().sum(),
            distinct: counts.values().filter(|c| **c > 0).count(),
            simpson: round(simpson_index(counts), 4),
            entropy: round(usage_entropy(counts), 4),
            normalized_entropy: round(normalized_entropy(counts), 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_is_zero() {
        let empty = BTreeMap::new();
        assert_eq!(simpson_index(&empty), 0.0);
        assert_eq!(usage_entropy(&empty), 0.0);
        assert_eq!(normalized_entropy(&empty), 0.0);
    }

    #[test]
    fn test_single_name_is_zero() {
        let single = counts(&[("upper", 12)]);
        assert_eq!(simpson_index(&single), 0.0);
        assert_eq!(usage_entropy(&single), 0.0);
        assert_eq!(normalized_entropy(&single), 0.0);
    }

    #[test]
    fn test_even_spread() {
        let even = counts(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        assert!((simpson_index(&even) - 0.75).abs() < 1e-9);
        assert!((usage_entropy(&even) - 2.0).abs() < 1e-9);
        assert!((normalized_entropy(&even) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_concentrated_usage_is_lower() {
        let skewed = counts(&[("a", 97), ("b", 1), ("c", 1), ("d", 1)]);
        let even = counts(&[("a", 25), ("b", 25), ("c", 25), ("d", 25)]);
        assert!(simpson_index(&skewed) < simpson_index(&even));
        assert!(usage_entropy(&skewed) < usage_entropy(&even));
    }

    #[test]
    fn test_merge_and_top() {
        let merged = merge_counts([&counts(&[("a", 2), ("b", 1)]), &counts(&[("b", 3)])]);
        assert_eq!(merged, counts(&[("a", 2), ("b", 4)]));
        let top = top_n(&counts(&[("x", 1), ("a", 5), ("b", 5)]), 2);
        assert_eq!(top, vec![("a".to_string(), 5), ("b".to_string(), 5)]);
    }

    #[test]
    fn test_profile() {
        let profile = DiversityProfile::from_counts(&counts(&[("a", 1), ("b", 1), ("z", 0)]));
        assert_eq!(profile.total, 2);
        assert_eq!(profile.distinct, 2);
        assert_eq!(profile.simpson, 0.5);
        assert_eq!(profile.entropy, 1.0);
    }
}
