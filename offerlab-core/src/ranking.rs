//! Ranking generator: a full weighted permutation ("offer list") per trial.
//!
//! Repeatedly samples from a shrinking copy of the items, so heavier items
//! tend to rank early while every item appears exactly once. The caller's
//! list is never touched.
//!
//! Zero-weight items can never be drawn. Once only zero-weight items remain
//! they are appended in input order, so they always rank last.

use crate::domain::WeightedItem;
use crate::rng::DrawSource;
use crate::sampler::{pick_index, SampleError};

/// Rank every item. Output is a permutation of the input identifiers.
///
/// Removal scans the remainder linearly, which is quadratic overall and fine
/// for small hand-curated offer sets.
pub fn rank_all<D>(items: &[WeightedItem], source: &mut D) -> Result<Vec<String>, SampleError>
where
    D: DrawSource + ?Sized,
{
    let mut remainder: Vec<WeightedItem> = items.to_vec();
    let mut ranking = Vec::with_capacity(items.len());

    while !remainder.is_empty() {
        if remainder.iter().all(|item| item.weight == 0) {
            ranking.extend(remainder.drain(..).map(|item| item.id));
            break;
        }
        let idx = pick_index(&remainder, source)?;
        let picked = remainder[idx].id.clone();
        if let Some(pos) = remainder.iter().position(|item| item.id == picked) {
            remainder.remove(pos);
        }
        ranking.push(picked);
    }

    Ok(ranking)
}
