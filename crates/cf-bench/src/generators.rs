//! Test data generators for benchmarks

use cf_core::{CfResult, Value, ValueKind};
use cf_engine::Automation;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Linear ramp from 0.0 to 1.0
pub fn generate_ramp(size: usize) -> Vec<f64> {
    let last = size.saturating_sub(1).max(1) as f64;
    (0..size).map(|i| i as f64 / last).collect()
}

/// Square wave between `low` and `high` with `reversals` direction changes
pub fn generate_square(size: usize, reversals: usize, low: f64, high: f64) -> Vec<f64> {
    let half_period = (size / (reversals + 1)).max(1);
    (0..size)
        .map(|i| if (i / half_period) % 2 == 0 { low } else { high })
        .collect()
}

/// Reproducible sine in [0, 1] with uniform noise, like a hand-ridden fader
pub fn generate_noisy_sine(size: usize, period: f64, noise: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / period;
            let jitter = (rng.random::<f64>() * 2.0 - 1.0) * noise;
            (0.5 + 0.5 * phase.sin() + jitter).clamp(0.0, 1.0)
        })
        .collect()
}

/// Float automation with `count` keyframes at random values, `spacing` apart
pub fn generate_automation(count: usize, spacing: i64, seed: u64) -> CfResult<Automation> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let automation = Automation::bind(
        Value::Float(0.5),
        Value::Float(0.0),
        Value::Float(1.0),
        ValueKind::Float,
    )?;
    for i in 1..count as i64 {
        automation.insert_keyframe(i * spacing, Value::Float(rng.random::<f32>()));
    }
    Ok(automation)
}

/// Common render block sizes
pub const BLOCK_SIZES: &[usize] = &[64, 256, 1024, 4096];

/// Keyframe counts for evaluation benchmarks
pub const KEYFRAME_COUNTS: &[usize] = &[2, 64, 4096];
