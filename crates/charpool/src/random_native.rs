use crate::RandSource;
use rand::{Rng, rng};

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// The underlying `ThreadRng` is not `Send` or `Sync`, but this type does not
/// store it: every call reaches the generator of the current thread, so the
/// zero-sized wrapper is freely shareable across threads and contention-free.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn rand_below(&self, bound: usize) -> usize {
        rng().random_range(0..bound)
    }
}
