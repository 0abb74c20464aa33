//! Merge per-term result lists into one deduplicated list.

use std::collections::HashSet;

use trendchat_shared::SearchResult;

/// Concatenate result lists in order, keeping the first result for each id.
///
/// The seen-set is local to the call; nothing carries over between merges.
pub fn merge<I>(per_term: I) -> Vec<SearchResult>
where
    I: IntoIterator<Item = Vec<SearchResult>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for results in per_term {
        for result in results {
            if seen.contains(&result.id) {
                continue;
            }
            seen.insert(result.id.clone());
            merged.push(result);
        }
    }

    merged
}
