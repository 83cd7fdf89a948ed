//! Randomness abstraction for deterministic simulation testing
//!
//! Harnesses take an `Rng` so a run is fully determined by its seed.

pub mod simulation;

pub use simulation::SimulatedRng;

/// Source of randomness used by simulation harnesses
pub trait Rng {
    fn next_u64(&mut self) -> u64;

    /// `true` with the given probability (clamped to 0.0..=1.0)
    fn gen_bool(&mut self, probability: f64) -> bool;

    /// Uniform value in `min..max`; returns `min` when the range is empty
    fn gen_range(&mut self, min: u64, max: u64) -> u64;

    fn shuffle<T>(&mut self, slice: &mut [T]);

    /// Random element of a non-empty slice
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.gen_range(0, items.len() as u64) as usize;
        items.get(index)
    }
}
