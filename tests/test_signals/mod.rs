//! Shared signal generators for integration tests.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One sample of a square wave that starts positive at tick 0.
pub fn square_wave(tick: usize, period: usize, amplitude: i32) -> i32 {
    if tick % period < period / 2 {
        amplitude
    } else {
        -amplitude
    }
}

/// `quiet` samples of silence followed by a square-wave burst running to
/// `total` samples.
pub fn burst_square(total: usize, quiet: usize, period: usize, amplitude: i32) -> Vec<i32> {
    (0..total)
        .map(|tick| {
            if tick < quiet {
                0
            } else {
                square_wave(tick - quiet, period, amplitude)
            }
        })
        .collect()
}

/// Add deterministic uniform noise in `[-spread, spread]` to a signal.
pub fn with_noise(signal: &[i32], spread: i32, seed: u64) -> Vec<i32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    signal
        .iter()
        .map(|&value| value + rng.gen_range(-spread..=spread))
        .collect()
}

/// Indices where a boolean trace goes from false to true.
pub fn rising_edges(trace: &[bool]) -> Vec<usize> {
    let mut edges = Vec::new();
    let mut prev = false;
    for (tick, &flag) in trace.iter().enumerate() {
        if flag && !prev {
            edges.push(tick);
        }
        prev = flag;
    }
    edges
}
