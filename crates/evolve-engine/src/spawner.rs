//! Generators for seeding a scenario.
//!
//! Scenarios build their starting population from these helpers: positions
//! scattered uniformly or laid out on an even grid, copies of a template
//! agent, random colors, and uniform or normal scalars. Every generator
//! takes the caller's RNG so a seeded run spawns the same population.

use std::f64::consts::TAU;

use evolve_agents::Agent;
use evolve_types::Vec2;
use rand::Rng;

use crate::error::EngineError;

/// An RGB color for renderers.
pub type Rgb = [u8; 3];

/// Default divisor for the margin kept free by [`even_positions`].
pub const DEFAULT_OFFSET_SCALER: f64 = 10.0;

// -----------------------------------------------------------------------
// Positions
// -----------------------------------------------------------------------

/// `number` points drawn uniformly from `[0, upper)` on each axis.
pub fn uniform_positions(rng: &mut impl Rng, number: usize, upper: Vec2) -> Vec<Vec2> {
    (0..number)
        .map(|_| {
            Vec2::new(
                rng.random::<f64>() * upper.x,
                rng.random::<f64>() * upper.y,
            )
        })
        .collect()
}

/// `number` points laid out on a regular grid inside `arena`.
///
/// A margin of `arena / offset_scaler` is kept free on every side. The
/// column count is the middle proper divisor of `number`, so 12 agents form
/// a 3x4 grid and a prime count forms a single column.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if `offset_scaler` is not a positive
/// finite number.
pub fn even_positions(
    number: usize,
    arena: Vec2,
    offset_scaler: f64,
) -> Result<Vec<Vec2>, EngineError> {
    if !offset_scaler.is_finite() || offset_scaler <= 0.0 {
        return Err(EngineError::Spawner {
            message: format!("offset scaler must be positive, got {offset_scaler}"),
        });
    }
    if number == 0 {
        return Ok(Vec::new());
    }

    let lower = arena * offset_scaler.recip();
    let upper = arena - lower;

    let divisors: Vec<usize> = (1..number.max(2))
        .filter(|divisor| number.checked_rem(*divisor) == Some(0))
        .collect();
    let columns = divisors.get(divisors.len() / 2).copied().unwrap_or(1);
    let rows = number.checked_div(columns).unwrap_or(number);

    let mut positions = Vec::with_capacity(number);
    for column in 0..columns {
        for row in 0..rows {
            positions.push(Vec2::new(
                linspace(lower.x, upper.x, columns, column),
                linspace(lower.y, upper.y, rows, row),
            ));
        }
    }
    Ok(positions)
}

/// The `index`-th of `count` evenly spaced values from `lower` to `upper`
/// inclusive.
#[allow(clippy::cast_precision_loss)]
fn linspace(lower: f64, upper: f64, count: usize, index: usize) -> f64 {
    let steps = count.saturating_sub(1);
    if steps == 0 {
        return lower;
    }
    (upper - lower).mul_add(index as f64 / steps as f64, lower)
}

// -----------------------------------------------------------------------
// Agents
// -----------------------------------------------------------------------

/// Name used by [`agents_like`] callers that have no naming scheme.
pub fn default_agent_name(index: usize) -> String {
    format!("DefaultAgent_{index}")
}

/// `number` independent copies of `template`, named by `name`.
pub fn agents_like<S: Clone>(
    template: &Agent<S>,
    number: usize,
    name: impl Fn(usize) -> String,
) -> Vec<Agent<S>> {
    (0..number)
        .map(|index| {
            let mut agent = template.new_like_me();
            agent.set_name(name(index));
            agent
        })
        .collect()
}

// -----------------------------------------------------------------------
// Colors and numbers
// -----------------------------------------------------------------------

/// `number` colors with every channel drawn from `lower..=upper`.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if `lower > upper`.
pub fn random_colors(
    rng: &mut impl Rng,
    number: usize,
    lower: u8,
    upper: u8,
) -> Result<Vec<Rgb>, EngineError> {
    if lower > upper {
        return Err(EngineError::Spawner {
            message: format!("color bounds are inverted: {lower} > {upper}"),
        });
    }
    Ok((0..number)
        .map(|_| {
            [
                rng.random_range(lower..=upper),
                rng.random_range(lower..=upper),
                rng.random_range(lower..=upper),
            ]
        })
        .collect())
}

/// `offset + scaler * u` with `u` uniform in `[0, 1)`.
pub fn uniform_number(rng: &mut impl Rng, offset: f64, scaler: f64) -> f64 {
    scaler.mul_add(rng.random::<f64>(), offset)
}

/// `offset + scaler * z` with `z` standard normal (Box-Muller).
pub fn normal_number(rng: &mut impl Rng, offset: f64, scaler: f64) -> f64 {
    // 1 - u keeps the logarithm's argument in (0, 1].
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
    scaler.mul_add(z, offset)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn uniform_positions_stay_in_bounds_and_replay() {
        let upper = Vec2::new(50.0, 20.0);
        let first = uniform_positions(&mut StdRng::seed_from_u64(7), 100, upper);
        let second = uniform_positions(&mut StdRng::seed_from_u64(7), 100, upper);
        assert_eq!(first, second);
        for point in &first {
            assert!((0.0..50.0).contains(&point.x));
            assert!((0.0..20.0).contains(&point.y));
        }
    }

    #[test]
    fn even_positions_form_a_grid() {
        let arena = Vec2::new(100.0, 100.0);
        let points = even_positions(12, arena, DEFAULT_OFFSET_SCALER).unwrap();
        assert_eq!(points.len(), 12);

        let xs: BTreeSet<u64> = points.iter().map(|p| p.x.to_bits()).collect();
        let ys: BTreeSet<u64> = points.iter().map(|p| p.y.to_bits()).collect();
        assert_eq!(xs.len(), 3);
        assert_eq!(ys.len(), 4);

        for point in &points {
            assert!(point.x >= 10.0 - 1e-9 && point.x <= 90.0 + 1e-9);
            assert!(point.y >= 10.0 - 1e-9 && point.y <= 90.0 + 1e-9);
        }
        assert!((points[0].x - 10.0).abs() < 1e-9);
        assert!((points[11].x - 90.0).abs() < 1e-9);
    }

    #[test]
    fn even_positions_with_a_prime_count_use_one_column() {
        let points = even_positions(7, Vec2::new(100.0, 100.0), 10.0).unwrap();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| (p.x - 10.0).abs() < 1e-9));
    }

    #[test]
    fn even_positions_reject_a_bad_scaler() {
        assert!(even_positions(4, Vec2::new(10.0, 10.0), 0.0).is_err());
        assert!(even_positions(0, Vec2::new(10.0, 10.0), 2.0).unwrap().is_empty());
    }

    #[test]
    fn agents_like_copies_under_new_ids() {
        let template = Agent::new("t", Vec2::new(1.0, 2.0), Vec2::new(3.0, 3.0), 9_u8);
        let agents = agents_like(&template, 3, default_agent_name);
        let names: Vec<&str> = agents.iter().map(Agent::name).collect();
        assert_eq!(names, ["DefaultAgent_0", "DefaultAgent_1", "DefaultAgent_2"]);

        let ids: BTreeSet<_> = agents.iter().map(Agent::id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&template.id()));
        assert!(agents.iter().all(|a| a.state == 9 && a.position() == template.position()));
    }

    #[test]
    fn colors_respect_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let colors = random_colors(&mut rng, 50, 100, 120).unwrap();
        assert_eq!(colors.len(), 50);
        assert!(colors.iter().flatten().all(|c| (100..=120).contains(c)));
        assert!(random_colors(&mut rng, 1, 9, 3).is_err());
    }

    #[test]
    fn number_generators_follow_offset_and_scale() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let value = uniform_number(&mut rng, 2.0, 10.0);
            assert!((2.0..12.0).contains(&value));
        }

        let samples: Vec<f64> = (0..20_000)
            .map(|_| normal_number(&mut rng, 5.0, 2.0))
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 5.0).abs() < 0.1, "mean was {mean}");
        assert!(samples.iter().all(|s| s.is_finite()));
    }
}
