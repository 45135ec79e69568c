// ============================================================
// Layer 4 — Subset Sampling and Train/Validation Split
// ============================================================
// MultiNLI has ~393k training pairs; quick runs cap the number
// of examples per split. Sampling is a seeded Fisher-Yates
// shuffle so a given (seed, limit) always selects the same
// examples.
//
// `split_train_val` carves a validation set out of a single
// labelled pool when no separate validation split exists. The
// two halves are disjoint by construction.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Keep at most `limit` items, chosen uniformly with a seeded shuffle.
/// `None` keeps everything in the original order.
pub fn take_subset<T>(mut items: Vec<T>, limit: Option<usize>, seed: u64) -> Vec<T> {
    let Some(limit) = limit else { return items };
    if limit >= items.len() {
        return items;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items.truncate(limit);

    tracing::debug!("Sampled subset of {} items (seed={})", limit, seed);
    items
}

/// Seeded shuffle, then split into (train, validation).
pub fn split_train_val<T>(mut items: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total    = items.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let val      = items.split_off(split_at.min(total));

    tracing::debug!("Dataset split: {} training, {} validation", items.len(), val.len());
    (items, val)
}
