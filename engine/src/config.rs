//! Run parameters which can be overridden through environment variables.

use crate::algo::{monte_carlo::SimulationConfig, random::RngBackend};
use std::{env, error::Error, fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid value {:?} for {}", self.value, self.var)
    }
}

impl Error for ConfigError {}

fn lookup(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError { var, value: value.to_string() })
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    lookup(var).map(|value| parse_value(var, &value)).transpose()
}

fn positive(var: &'static str, value: Option<usize>) -> Result<Option<usize>, ConfigError> {
    match value {
        Some(0) => Err(ConfigError { var, value: "0".to_string() }),
        value => Ok(value),
    }
}

/// Base seed from `PTDR_SEED`, either a number or `entropy` for a random seed.
pub fn seed() -> Result<u64, ConfigError> {
    match lookup("PTDR_SEED") {
        Some(value) if value.trim() == "entropy" => Ok(rand::random()),
        Some(value) => parse_value("PTDR_SEED", &value),
        None => Ok(0),
    }
}

/// Simulation parameters from `PTDR_SEED`, `PTDR_RNG`, `PTDR_NUM_THREADS`, `PTDR_CHUNK_SIZE` and `PTDR_PIN_THREADS`.
pub fn simulation_config() -> Result<SimulationConfig, ConfigError> {
    let defaults = SimulationConfig::default();
    Ok(SimulationConfig {
        seed: seed()?,
        rng: parse_var::<RngBackend>("PTDR_RNG")?.unwrap_or(defaults.rng),
        num_threads: positive("PTDR_NUM_THREADS", parse_var("PTDR_NUM_THREADS")?)?,
        chunk_size: positive("PTDR_CHUNK_SIZE", parse_var("PTDR_CHUNK_SIZE")?)?.unwrap_or(defaults.chunk_size),
        pin_threads: parse_var("PTDR_PIN_THREADS")?.unwrap_or(defaults.pin_threads),
    })
}

/// Number of repeated simulations in profiling runs.
/// Can be overriden through the PTDR_PROFILE_REPETITIONS env var.
pub fn profile_repetitions() -> Result<usize, ConfigError> {
    Ok(positive("PTDR_PROFILE_REPETITIONS", parse_var("PTDR_PROFILE_REPETITIONS")?)?.unwrap_or(1000))
}

/// Number of samples used to extract the unpredictability feature.
/// Can be overriden through the PTDR_FEATURE_SAMPLES env var.
pub fn feature_samples() -> Result<usize, ConfigError> {
    Ok(positive("PTDR_FEATURE_SAMPLES", parse_var("PTDR_FEATURE_SAMPLES")?)?.unwrap_or(100))
}

/// Sample count bands `cv:samples,cv:samples,...` ascending by cv, from `PTDR_SAMPLE_BANDS`.
pub fn sample_bands() -> Result<Option<Vec<(f64, usize)>>, ConfigError> {
    lookup("PTDR_SAMPLE_BANDS").map(|value| parse_bands(&value)).transpose()
}

pub fn parse_bands(value: &str) -> Result<Vec<(f64, usize)>, ConfigError> {
    let err = || ConfigError {
        var: "PTDR_SAMPLE_BANDS",
        value: value.to_string(),
    };
    let bands = value
        .split(',')
        .map(|band| {
            let (cv, samples) = band.split_once(':').ok_or_else(err)?;
            let cv: f64 = cv.trim().parse().map_err(|_| err())?;
            let samples: usize = samples.trim().parse().map_err(|_| err())?;
            if cv.is_finite() && cv >= 0.0 && samples > 0 {
                Ok((cv, samples))
            } else {
                Err(err())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if bands.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
        return Err(err());
    }
    Ok(bands)
}
