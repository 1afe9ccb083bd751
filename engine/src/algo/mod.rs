//! Sampling travel times and summarizing them.

pub mod monte_carlo;
pub mod random;
pub mod statistics;
