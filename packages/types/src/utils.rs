use rand::SeedableRng;
use rand::rngs::StdRng;

/// Seeded RNG so that splits and ensembles are reproducible across runs.
#[inline]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Derive a child seed for the `index`-th member of a seeded ensemble.
#[inline]
pub fn child_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(index as u64)
        .rotate_left(17)
}
