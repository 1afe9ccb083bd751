//! Sources of uniform bucket indices.
//!
//! The sampling code only sees `UniformSource`.
//! Which generator sits behind it is decided once per run through `RngBackend`.

use rand::{
    rngs::{SmallRng, StdRng},
    Rng, RngCore, SeedableRng,
};
use std::{error::Error, fmt, str::FromStr};

/// Over-provisioning of pre-drawn indices per segment of the route.
/// Only a heuristic, the pool grows when a trial crosses more intervals.
#[cfg(not(override_ptdr_draws_per_segment))]
pub const DRAWS_PER_SEGMENT: usize = 5;
#[cfg(override_ptdr_draws_per_segment)]
pub const DRAWS_PER_SEGMENT: usize = include!(concat!(env!("OUT_DIR"), "/PTDR_DRAWS_PER_SEGMENT"));

pub trait UniformSource {
    /// Draw uniformly from `0..bound`
    fn draw(&mut self, bound: usize) -> usize;
}

impl<R: RngCore> UniformSource for R {
    #[inline]
    fn draw(&mut self, bound: usize) -> usize {
        self.gen_range(0..bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngBackend {
    /// ChaCha based, the default
    Std,
    /// Faster, not cryptographically secure
    Small,
}

impl Default for RngBackend {
    fn default() -> Self {
        RngBackend::Std
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRngBackend(pub String);

impl fmt::Display for UnknownRngBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown rng backend {:?} (expected std or small)", self.0)
    }
}

impl Error for UnknownRngBackend {}

impl FromStr for RngBackend {
    type Err = UnknownRngBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std" => Ok(RngBackend::Std),
            "small" => Ok(RngBackend::Small),
            _ => Err(UnknownRngBackend(s.to_string())),
        }
    }
}

impl fmt::Display for RngBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RngBackend::Std => write!(f, "std"),
            RngBackend::Small => write!(f, "small"),
        }
    }
}

/// The generator owned by one worker.
#[derive(Debug, Clone)]
pub enum WorkerRng {
    Std(StdRng),
    Small(SmallRng),
}

impl WorkerRng {
    pub fn new(backend: RngBackend, seed: u64) -> WorkerRng {
        match backend {
            RngBackend::Std => WorkerRng::Std(StdRng::seed_from_u64(seed)),
            RngBackend::Small => WorkerRng::Small(SmallRng::seed_from_u64(seed)),
        }
    }
}

impl RngCore for WorkerRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        match self {
            WorkerRng::Std(rng) => rng.next_u32(),
            WorkerRng::Small(rng) => rng.next_u32(),
        }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        match self {
            WorkerRng::Std(rng) => rng.next_u64(),
            WorkerRng::Small(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            WorkerRng::Std(rng) => rng.fill_bytes(dest),
            WorkerRng::Small(rng) => rng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self {
            WorkerRng::Std(rng) => rng.try_fill_bytes(dest),
            WorkerRng::Small(rng) => rng.try_fill_bytes(dest),
        }
    }
}

/// Replays a fixed sequence of indices, starting over at the end.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<usize>,
    next: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<usize>) -> SequenceSource {
        assert!(!values.is_empty());
        SequenceSource { values, next: 0 }
    }

    /// Number of values handed out so far
    pub fn consumed(&self) -> usize {
        self.next
    }
}

impl UniformSource for SequenceSource {
    fn draw(&mut self, bound: usize) -> usize {
        let value = self.values[self.next % self.values.len()];
        assert!(value < bound, "replayed value {} not below {}", value, bound);
        self.next += 1;
        value
    }
}

/// Bucket indices drawn in batches ahead of a trial.
///
/// `refill` draws `size` indices up front, the returned cursor hands them out
/// and draws another batch from the underlying source whenever a trial needs more.
#[derive(Debug, Clone)]
pub struct DrawPool {
    draws: Vec<u32>,
    size: usize,
    resolution: usize,
    extensions: u64,
}

impl DrawPool {
    pub fn new(size: usize, resolution: usize) -> DrawPool {
        assert!(resolution > 0 && resolution <= u32::MAX as usize);
        let size = size.max(1);
        DrawPool {
            draws: Vec::with_capacity(size),
            size,
            resolution,
            extensions: 0,
        }
    }

    /// Sized for one trial over `num_segments` segments
    pub fn for_route(num_segments: usize, resolution: usize) -> DrawPool {
        DrawPool::new(num_segments * DRAWS_PER_SEGMENT, resolution)
    }

    pub fn refill<'a, S: UniformSource>(&'a mut self, source: &'a mut S) -> PoolDraws<'a, S> {
        self.draws.clear();
        self.extend(source);
        PoolDraws { pool: self, source, next: 0 }
    }

    fn extend<S: UniformSource>(&mut self, source: &mut S) {
        let resolution = self.resolution;
        self.draws.extend((0..self.size).map(|_| source.draw(resolution) as u32));
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// How often a trial ran out of pre-drawn indices
    pub fn extensions(&self) -> u64 {
        self.extensions
    }
}

pub struct PoolDraws<'a, S> {
    pool: &'a mut DrawPool,
    source: &'a mut S,
    next: usize,
}

impl<'a, S> PoolDraws<'a, S> {
    pub fn consumed(&self) -> usize {
        self.next
    }
}

impl<'a, S: UniformSource> UniformSource for PoolDraws<'a, S> {
    #[inline]
    fn draw(&mut self, bound: usize) -> usize {
        assert_eq!(bound, self.pool.resolution, "pool was drawn for a different resolution");
        if self.next == self.pool.draws.len() {
            self.pool.extend(self.source);
            self.pool.extensions += 1;
        }
        let value = self.pool.draws[self.next];
        self.next += 1;
        value as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_from_str() {
        assert_eq!("std".parse(), Ok(RngBackend::Std));
        assert_eq!("small".parse(), Ok(RngBackend::Small));
        assert!("mkl".parse::<RngBackend>().is_err());
    }

    #[test]
    fn same_seed_same_draws() {
        for backend in [RngBackend::Std, RngBackend::Small] {
            let mut a = WorkerRng::new(backend, 42);
            let mut b = WorkerRng::new(backend, 42);
            let a: Vec<usize> = (0..100).map(|_| a.draw(100)).collect();
            let b: Vec<usize> = (0..100).map(|_| b.draw(100)).collect();
            assert_eq!(a, b);
            assert!(a.iter().all(|&x| x < 100));
        }
    }

    #[test]
    fn pool_grows_past_its_size() {
        let mut source = SequenceSource::new((0..10).collect());
        let mut pool = DrawPool::new(3, 10);
        let drawn: Vec<usize> = {
            let mut draws = pool.refill(&mut source);
            (0..7).map(|_| draws.draw(10)).collect()
        };
        assert_eq!(drawn, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(pool.extensions(), 2);
        assert_eq!(pool.len(), 9);

        let mut draws = pool.refill(&mut source);
        assert_eq!(draws.draw(10), 9);
        assert_eq!(draws.consumed(), 1);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn sequence_source_cycles() {
        let mut source = SequenceSource::new(vec![4, 2]);
        assert_eq!((0..5).map(|_| source.draw(5)).collect::<Vec<_>>(), vec![4, 2, 4, 2, 4]);
        assert_eq!(source.consumed(), 5);
    }
}
