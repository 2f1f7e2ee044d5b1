/// A source of uniformly distributed indices.
///
/// The allocator draws every sample and every shuffle step through this trait,
/// so tests can plug in a scripted source in place of a real RNG.
///
/// # Example
/// ```
/// use charpool::RandSource;
///
/// struct AlwaysFirst;
/// impl RandSource for AlwaysFirst {
///     fn rand_below(&self, _bound: usize) -> usize {
///         0
///     }
/// }
///
/// assert_eq!(AlwaysFirst.rand_below(26), 0);
/// ```
pub trait RandSource {
    /// Returns an index in `0..bound`. Callers never pass `bound == 0`.
    fn rand_below(&self, bound: usize) -> usize;
}

impl<R: RandSource + ?Sized> RandSource for &R {
    fn rand_below(&self, bound: usize) -> usize {
        (**self).rand_below(bound)
    }
}
