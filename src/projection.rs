//! Coin list projection
//!
//! Derives the ordered list a view displays from the loaded coins, the
//! search/sort settings and the favorite set. The projection keeps no state:
//! every call builds a fresh `Vec`, so callers can compare results by value
//! and treat a new allocation as "recompute downstream".
//!
//! ```text
//! coins ──filter(search)──▶ stable sort(sort_type, sort_order) ──▶ favorites first
//! ```

use crate::favorites::FavoriteSet;
use crate::types::{Coin, ProjectionQuery, SortOrder, SortType};
use std::cmp::Ordering;

/// Builds the displayed coin list
///
/// # Arguments
/// * `coins` - The loaded collection, in source order
/// * `query` - Search text and ordering
/// * `favorites` - Coin ids promoted ahead of the rest
///
/// # Returns
/// A new list; `coins` is left untouched
pub fn project(coins: &[Coin], query: &ProjectionQuery, favorites: &FavoriteSet) -> Vec<Coin> {
    let needle = query.search_query.trim().to_lowercase();

    let mut result: Vec<Coin> = coins
        .iter()
        .filter(|coin| needle.is_empty() || matches_needle(coin, &needle))
        .cloned()
        .collect();

    // `sort_by` is stable; equal keys keep their source order
    if query.sort_type != SortType::Unsorted {
        result.sort_by(|a, b| compare(a, b, query.sort_type, query.sort_order));
    }

    result.sort_by_key(|coin| !favorites.contains(&coin.id));

    result
}

/// True if `coin` passes the search filter for `search_query`
pub fn matches_search(coin: &Coin, search_query: &str) -> bool {
    let needle = search_query.trim().to_lowercase();
    needle.is_empty() || matches_needle(coin, &needle)
}

fn matches_needle(coin: &Coin, needle: &str) -> bool {
    coin.name.to_lowercase().contains(needle) || coin.symbol.to_lowercase().contains(needle)
}

/// Orders two coins by `sort_type` in direction `sort_order`
///
/// `Unsorted` treats every pair as equal.
pub fn compare(a: &Coin, b: &Coin, sort_type: SortType, sort_order: SortOrder) -> Ordering {
    let ascending = match sort_type {
        SortType::Name => compare_names(&a.name, &b.name),
        SortType::Unsorted => return Ordering::Equal,
        metric => compare_metric(a.metric(metric), b.metric(metric)),
    };

    match sort_order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

/// Missing and NaN values rank below every real number
fn compare_metric(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());

    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Case-folded comparison first, so "bitcoin" sits next to "Bitcoin"
fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));

    folded.then_with(|| a.cmp(b))
}
