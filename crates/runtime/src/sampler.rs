use rand::Rng;

use crate::{GachaError, GachaResult};

pub trait Weighted {
    fn weight(&self) -> f64;
}

/// Negative and non-finite weights count as zero.
fn effective_weight<T: Weighted>(entry: &T) -> f64 {
    let weight = entry.weight();
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

pub struct WeightedSampler;

impl WeightedSampler {
    /// Draws `n` entries independently, each with probability proportional to its weight.
    ///
    /// The pool is walked in the order given, so callers that need reproducible
    /// results for a seeded rng must keep the order stable (the store hands pools out
    /// sorted by descending weight).
    pub fn draw_with_replacement<T, R>(entries: &[T], n: usize, rng: &mut R) -> GachaResult<Vec<T>>
    where
        T: Weighted + Clone,
        R: Rng,
    {
        let total: f64 = entries.iter().map(effective_weight).sum();
        if entries.is_empty() || total <= 0.0 {
            return Err(GachaError::EmptyPool);
        }

        // rounding can leave the walk a hair short of the end
        let fallback = entries
            .iter()
            .rposition(|entry| effective_weight(entry) > 0.0)
            .ok_or(GachaError::EmptyPool)?;

        let mut chosen = Vec::with_capacity(n);
        for _ in 0..n {
            let mut remaining = rng.random::<f64>() * total;
            let mut picked = fallback;
            for (index, entry) in entries.iter().enumerate() {
                remaining -= effective_weight(entry);
                if remaining < 0.0 {
                    picked = index;
                    break;
                }
            }
            chosen.push(entries[picked].clone());
        }
        Ok(chosen)
    }

    /// Draws `n` distinct entries uniformly, ignoring weight.
    ///
    /// Works on a private copy: the caller's slice is untouched whether the draw
    /// succeeds or fails.
    pub fn draw_without_replacement<T, R>(entries: &[T], n: usize, rng: &mut R) -> GachaResult<Vec<T>>
    where
        T: Clone,
        R: Rng,
    {
        if n > entries.len() {
            return Err(GachaError::InsufficientPool {
                requested: n,
                available: entries.len(),
            });
        }

        let mut remaining = entries.to_vec();
        let mut chosen = Vec::with_capacity(n);
        while chosen.len() < n {
            let index = rng.random_range(0..remaining.len());
            chosen.push(remaining.swap_remove(index));
        }
        Ok(chosen)
    }
}
