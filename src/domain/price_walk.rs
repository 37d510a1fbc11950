//! Single-step random walk for quoted prices.
//!
//! Most steps draw a small Gaussian return; occasionally a fat-tail event
//! moves the price by up to twenty percent in either direction. Prices are
//! floored so an instrument never quotes at or below zero.

use rand::Rng;

/// Probability that a step is a fat-tail event rather than a Gaussian move.
pub const FAT_TAIL_PROBABILITY: f64 = 0.05;
/// Largest fractional move a fat-tail event can produce.
pub const FAT_TAIL_LIMIT: f64 = 0.2;
/// Standard deviation of the everyday Gaussian return.
pub const GAUSSIAN_SIGMA: f64 = 0.02;
/// Prices never fall below this.
pub const PRICE_FLOOR: f64 = 0.01;

/// Standard normal draw via the Box-Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Advance one price by a single step of the walk.
pub fn step_price<R: Rng + ?Sized>(rng: &mut R, current: f64) -> f64 {
    let change = if rng.gen_bool(FAT_TAIL_PROBABILITY) {
        rng.gen_range(-FAT_TAIL_LIMIT..FAT_TAIL_LIMIT)
    } else {
        GAUSSIAN_SIGMA * standard_normal(rng)
    };

    (current * (1.0 + change)).max(PRICE_FLOOR)
}

/// Advance every quote by one step, preserving order.
pub fn step_all<R: Rng + ?Sized>(rng: &mut R, quotes: &[(String, f64)]) -> Vec<(String, f64)> {
    quotes
        .iter()
        .map(|(ticker, price)| (ticker.clone(), step_price(rng, *price)))
        .collect()
}
