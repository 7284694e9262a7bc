use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::model::{SecretRef, VaultRef};

/// Anything shown in the main list by its display name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for VaultRef {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for SecretRef {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Case-insensitive substring filter. An empty query returns every item.
pub fn filter<T: Named + Clone>(items: &[T], query: &str) -> Vec<T> {
    if query.is_empty() {
        return items.to_vec();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.name().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Best fuzzy match for `query`, used for "did you mean" hints.
pub fn closest<'a, T: Named>(items: &'a [T], query: &str) -> Option<&'a T> {
    let matcher = SkimMatcherV2::default().ignore_case();
    items
        .iter()
        .filter_map(|item| {
            matcher
                .fuzzy_match(item.name(), query.trim())
                .map(|score| (score, item))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, item)| item)
}
