/// Weighted random choice over the balloon catalog.
///
/// Draws `r` uniformly in `[0, total)`, walks the entries in order
/// subtracting each weight, and returns the first entry that brings `r`
/// to zero or below. Rounding can leave `r` marginally positive after the
/// last entry; the first entry is the fallback.

use rand::Rng;

use super::balloon::{BalloonKind, CATALOG};

/// Pick from `items` with probability `weight(item) / total`.
/// Returns `None` only for an empty slice.
pub fn pick_weighted<'a, T, R, F>(items: &'a [T], weight: F, rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    let first = items.first()?;
    let total: f64 = items.iter().map(&weight).sum();
    if !(total > 0.0) {
        return Some(first);
    }

    let mut r = rng.gen::<f64>() * total;
    for item in items {
        r -= weight(item);
        if r <= 0.0 {
            return Some(item);
        }
    }
    Some(first)
}

/// Pick a balloon kind from the built-in catalog.
pub fn pick_kind<R: Rng + ?Sized>(rng: &mut R) -> BalloonKind {
    *pick_weighted(&CATALOG, |k| k.weight, rng).unwrap_or(&CATALOG[0])
}
