//! Exact random primitives built from uniform integers and fair bits only.

use rand::Rng;

/// Returns `true` with probability exactly `1 / r!`.
pub fn bernoulli_inverse_factorial<R: Rng + ?Sized>(rng: &mut R, r: usize) -> bool {
    (2..=r).all(|j| rng.gen_range(0..j) == 0)
}

/// Draws from a Poisson(1) distribution conditioned on being at most
/// `width`.
///
/// A geometric(1/2) proposal `z`, with weight `2^-(z+1)`, is accepted with
/// probability `1/2` for `z = 0`, `1` for `z` in `{1, 2}` and `Π_{j=3..=z} 2/j`
/// above, which leaves weights proportional to `1 / z!`.  Proposals above
/// `width` are redrawn.
pub fn truncated_poisson<R: Rng + ?Sized>(rng: &mut R, width: usize) -> usize {
    loop {
        let mut z = 0usize;
        while rng.gen::<bool>() {
            z += 1;
        }
        if z > width {
            continue;
        }
        let accepted = match z {
            0 => rng.gen::<bool>(),
            1 | 2 => true,
            _ => (3..=z).all(|j| rng.gen_range(0..j) < 2),
        };
        if accepted {
            return z;
        }
    }
}

/// Uniformly shuffles `items[pinned..]` and interleaves it with
/// `items[..pinned]`, whose relative order is kept, in a single backward
/// pass.
///
/// Position `i` takes a pinned item with probability `pinned_left / (i + 1)`,
/// which makes every interleaving equally likely.
pub fn interleave_pinned<R: Rng + ?Sized, T>(rng: &mut R, items: &mut [T], pinned: usize) {
    assert!(pinned <= items.len());
    let mut pinned_left = pinned;
    for i in (0..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        if j < pinned_left {
            items.swap(pinned_left - 1, i);
            pinned_left -= 1;
        } else {
            items.swap(j, i);
        }
    }
}
