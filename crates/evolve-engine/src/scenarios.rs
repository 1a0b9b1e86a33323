//! Demo scenarios the engine can populate a board with.
//!
//! - **Fight**: two teams charge each other along shared lanes. Touching
//!   enemies trade blows until one drops; the survivor spawns a child.
//! - **Space**: bodies drift with random velocities, bounce off the arena
//!   walls, and collide elastically with each other.
//!
//! Both scenarios share the [`Body`] payload so the binary runs a single
//! `Scheduler<Body>` whichever one is selected.

use std::f64::consts::PI;

use evolve_agents::Agent;
use evolve_core::config::{ScenarioKind, SimulationConfig, SpawnLayout};
use evolve_core::scheduler::Scheduler;
use evolve_core::task::{HIGHEST_TASK_PRIORITY, LOWEST_TASK_PRIORITY, Task, TaskKind};
use evolve_types::{BorderDirection, MAGNITUDE_EPSILON, Vec2};
use evolve_world::Board;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::spawner::{
    DEFAULT_OFFSET_SCALER, Rgb, agents_like, default_agent_name, even_positions, normal_number,
    random_colors, uniform_number, uniform_positions,
};

/// Horizontal speed of a charging fighter.
const FIGHT_SPEED: f64 = 25.0;

/// Fighter health is drawn from `[offset, offset + scaler)`.
const HEALTH_OFFSET: f64 = 2.0;
const HEALTH_SCALER: f64 = 10.0;

/// Fighter damage per blow is drawn from `[offset, offset + scaler)`.
const DAMAGE_OFFSET: f64 = 0.5;
const DAMAGE_SCALER: f64 = 1.0;

/// Simulated milliseconds between fight standings reports.
const STANDINGS_PERIOD_MS: u64 = 1000;

/// Standard deviation of each velocity component in the space scenario.
const SPACE_VELOCITY_SCALER: f64 = 15.0;

/// Velocity multipliers applied on wall contact, indexed by
/// [`BorderDirection::index`].
const BOUNCE: [(f64, f64); 4] = [(1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, 1.0)];

/// Per-agent payload for the demo scenarios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    /// Fight team. Teammates never attack each other.
    pub team: u8,
    /// Remaining health; the agent dies at or below zero.
    pub health: f64,
    /// Health removed from an enemy per blow.
    pub damage: f64,
    /// Mass used by elastic collisions.
    pub mass: f64,
    /// Display color for renderers.
    pub color: Rgb,
}

/// Build the scheduler for the configured scenario.
///
/// # Errors
///
/// Returns [`EngineError`] if the config is invalid or an agent or task is
/// rejected.
pub fn build(config: &SimulationConfig, rng: &mut StdRng) -> Result<Scheduler<Body>, EngineError> {
    match config.scenario.kind {
        ScenarioKind::Fight => fight(config, rng),
        ScenarioKind::Space => space(config, rng),
    }
}

// -----------------------------------------------------------------------
// Fight
// -----------------------------------------------------------------------

struct Team {
    id: u8,
    name: &'static str,
    color: Rgb,
    direction: f64,
}

const TEAMS: [Team; 2] = [
    Team {
        id: 0,
        name: "Red",
        color: [255, 0, 0],
        direction: 1.0,
    },
    Team {
        id: 1,
        name: "Blue",
        color: [0, 0, 255],
        direction: -1.0,
    },
];

fn fight(config: &SimulationConfig, rng: &mut StdRng) -> Result<Scheduler<Body>, EngineError> {
    let mut scheduler = Scheduler::from_config(config)?;
    let arena = scheduler.board().arena_size();
    let size = config.scenario.agent_size;
    let per_team = usize::try_from(config.scenario.agents.div_ceil(2))
        .unwrap_or(1)
        .max(1);

    for team in &TEAMS {
        let x = if team.direction > 0.0 {
            arena.x / 5.0
        } else {
            arena.x * 4.0 / 5.0 - size
        };
        let template = Agent::new(
            team.name,
            Vec2::ZERO,
            Vec2::new(size, size),
            Body {
                team: team.id,
                color: team.color,
                ..Body::default()
            },
        )
        .with_velocity(Vec2::new(team.direction * FIGHT_SPEED, 0.0))
        .with_reproduction(1.0, 1);

        let fighters = agents_like(&template, per_team, |index| format!("{}_{index}", team.name));
        for (lane, mut fighter) in fighters.into_iter().enumerate() {
            fighter.move_to(Vec2::new(x, lane_y(arena.y, size, lane, per_team)));
            fighter.state.health = uniform_number(rng, HEALTH_OFFSET, HEALTH_SCALER);
            fighter.state.damage = uniform_number(rng, DAMAGE_OFFSET, DAMAGE_SCALER);
            scheduler.board_mut().add_agent(fighter)?;
        }
    }

    let mut offspring_rng = StdRng::seed_from_u64(rng.random());
    let duel = TaskKind::collision_pair(move |a: &mut Agent<Body>, b: &mut Agent<Body>, _elapsed| {
        if a.state.team == b.state.team {
            return;
        }
        if strike(a, b) {
            a.add_reproduce_metric(1.0);
            a.reproduce(&mut offspring_rng);
            return;
        }
        if strike(b, a) {
            b.add_reproduce_metric(1.0);
            b.reproduce(&mut offspring_rng);
        }
    });
    let standings = TaskKind::frame_end(|board: &mut Board<Body>| {
        let red = board.agents().filter(|agent| agent.state.team == 0).count();
        let blue = board.len().saturating_sub(red);
        info!(red, blue, "Fight standings");
    });

    scheduler.add_tasks([
        Task::new(duel, 0, HIGHEST_TASK_PRIORITY)?.with_label("duel"),
        Task::new(standings, STANDINGS_PERIOD_MS, LOWEST_TASK_PRIORITY)?.with_label("standings"),
    ]);
    Ok(scheduler)
}

/// Vertical position of lane `lane` out of `lanes`, spread evenly.
#[allow(clippy::cast_precision_loss)]
fn lane_y(height: f64, size: f64, lane: usize, lanes: usize) -> f64 {
    let slot = lane.saturating_add(1) as f64;
    let slots = lanes.saturating_add(1) as f64;
    (height - size) * slot / slots
}

/// `attacker` stops and hits `defender`. Returns whether the blow killed.
fn strike(attacker: &mut Agent<Body>, defender: &mut Agent<Body>) -> bool {
    attacker.stop();
    defender.state.health -= attacker.state.damage;
    if defender.state.health <= 0.0 {
        defender.die();
        debug!(winner = attacker.name(), loser = defender.name(), "Fighter down");
        return true;
    }
    false
}

// -----------------------------------------------------------------------
// Space
// -----------------------------------------------------------------------

fn space(config: &SimulationConfig, rng: &mut StdRng) -> Result<Scheduler<Body>, EngineError> {
    let mut scheduler = Scheduler::from_config(config)?;
    let arena = scheduler.board().arena_size();
    let size = config.scenario.agent_size;
    let number = usize::try_from(config.scenario.agents).map_err(|_err| EngineError::Spawner {
        message: format!("cannot spawn {} agents", config.scenario.agents),
    })?;

    let positions = match config.scenario.layout {
        SpawnLayout::Even => even_positions(number, arena, DEFAULT_OFFSET_SCALER)?,
        SpawnLayout::Uniform => uniform_positions(rng, number, arena - Vec2::new(size, size)),
    };
    let colors = random_colors(rng, number, 0, u8::MAX)?;
    let template = Agent::new("Body", Vec2::ZERO, Vec2::new(size, size), Body::default());

    let bodies = agents_like(&template, number, default_agent_name);
    for ((mut body, position), color) in bodies.into_iter().zip(positions).zip(colors) {
        let side = uniform_number(rng, size / 2.0, size / 2.0);
        body.set_size(Vec2::new(side, side));
        body.move_to(position);
        body.set_velocity(Vec2::new(
            normal_number(rng, 0.0, SPACE_VELOCITY_SCALER),
            normal_number(rng, 0.0, SPACE_VELOCITY_SCALER),
        ));
        body.state.color = color;
        debug!(name = body.name(), side, color = ?body.state.color, "Body spawned");
        scheduler.board_mut().add_agent(body)?;
    }

    let weigh = TaskKind::agent(|body: &mut Agent<Body>, _elapsed| {
        let width = body.size().x;
        body.state.mass = PI * width * width / 4.0;
    });
    let walls = TaskKind::border_collision(bounce);
    let impacts = TaskKind::collision_pair(|a: &mut Agent<Body>, b: &mut Agent<Body>, _elapsed| {
        elastic_collision(a, b);
    });

    scheduler.add_tasks([
        Task::new(weigh, 0, HIGHEST_TASK_PRIORITY)?
            .with_limit(1)?
            .with_label("weigh"),
        Task::new(walls, 0, 1)?.with_label("walls"),
        Task::new(impacts, 0, 1)?.with_label("impacts"),
    ]);
    Ok(scheduler)
}

/// Reflect the velocity off every wall the agent touched on its last move.
fn bounce(body: &mut Agent<Body>) {
    let directions: Vec<BorderDirection> = body.collision_directions().iter().copied().collect();
    for direction in directions {
        if let Some(&(x, y)) = BOUNCE.get(direction.index()) {
            let velocity = body.velocity();
            body.set_velocity(Vec2::new(velocity.x * x, velocity.y * y));
        }
    }
}

/// Exchange momentum between two approaching bodies along the line joining
/// their centers. Separating pairs keep their velocities.
fn elastic_collision(a: &mut Agent<Body>, b: &mut Agent<Body>) {
    let total_mass = a.state.mass + b.state.mass;
    if total_mass <= MAGNITUDE_EPSILON {
        return;
    }
    let offset = a.rect().center() - b.rect().center();
    let distance_sq = offset.dot(offset).max(MAGNITUDE_EPSILON);
    let closing = (a.velocity() - b.velocity()).dot(offset) / distance_sq;
    if closing >= 0.0 {
        return;
    }

    let a_velocity = a.velocity() - offset * (2.0 * b.state.mass / total_mass * closing);
    let b_velocity = b.velocity() + offset * (2.0 * a.state.mass / total_mass * closing);
    a.set_velocity(a_velocity);
    b.set_velocity(b_velocity);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn body(position: Vec2, velocity: Vec2, mass: f64) -> Agent<Body> {
        Agent::new(
            "b",
            position,
            Vec2::new(2.0, 2.0),
            Body {
                mass,
                ..Body::default()
            },
        )
        .with_velocity(velocity)
    }

    fn space_config(agents: u32) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.scenario.kind = ScenarioKind::Space;
        config.scenario.agents = agents;
        config
    }

    #[test]
    fn fight_places_two_facing_agents() {
        let config = SimulationConfig::default();
        let scheduler = build(&config, &mut StdRng::seed_from_u64(1)).unwrap();
        let board = scheduler.board();
        assert_eq!(board.len(), 2);

        let agents: Vec<_> = board.agents().collect();
        let (red, blue) = if agents[0].state.team == 0 {
            (agents[0], agents[1])
        } else {
            (agents[1], agents[0])
        };
        assert!((red.velocity().x - FIGHT_SPEED).abs() < 1e-9);
        assert!((blue.velocity().x + FIGHT_SPEED).abs() < 1e-9);
        assert!((red.position().y - blue.position().y).abs() < 1e-9);
        assert!(red.position().x < blue.position().x);
        assert!(red.state.health >= HEALTH_OFFSET);
        assert_eq!(scheduler.tasks().len(), 2);
    }

    #[test]
    fn fight_splits_agents_into_teams() {
        let mut config = SimulationConfig::default();
        config.scenario.agents = 4;
        let scheduler = build(&config, &mut StdRng::seed_from_u64(1)).unwrap();
        let red = scheduler
            .board()
            .agents()
            .filter(|agent| agent.state.team == 0)
            .count();
        assert_eq!(red, 2);
        assert_eq!(scheduler.board().len(), 4);
    }

    #[test]
    fn fight_ends_with_a_death_and_a_child() {
        let config = SimulationConfig::default();
        let mut scheduler = build(&config, &mut StdRng::seed_from_u64(5)).unwrap();

        let mut deaths: usize = 0;
        let mut births: usize = 0;
        for _ in 0..3000 {
            let summary = scheduler.tick().unwrap();
            deaths = deaths.saturating_add(summary.deaths);
            births = births.saturating_add(summary.births);
            if deaths > 0 {
                break;
            }
        }
        assert_eq!(deaths, 1);
        assert_eq!(births, 1);

        let board = scheduler.board();
        assert_eq!(board.len(), 2);
        let teams: Vec<u8> = board.agents().map(|agent| agent.state.team).collect();
        assert_eq!(teams[0], teams[1]);
        assert!(board.agents().any(|agent| agent.name().ends_with("Child")));
    }

    #[test]
    fn strike_kills_at_zero_health() {
        let mut attacker = body(Vec2::ZERO, Vec2::new(3.0, 0.0), 0.0);
        attacker.state.damage = 2.0;
        let mut defender = body(Vec2::ZERO, Vec2::ZERO, 0.0);
        defender.state.health = 3.0;

        assert!(!strike(&mut attacker, &mut defender));
        assert_eq!(attacker.velocity(), Vec2::ZERO);
        assert!(strike(&mut attacker, &mut defender));
        assert!(defender.is_dead());
    }

    #[test]
    fn equal_masses_swap_head_on_velocities() {
        let mut a = body(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 1.0);
        let mut b = body(Vec2::new(1.0, 0.0), Vec2::new(-10.0, 0.0), 1.0);
        elastic_collision(&mut a, &mut b);
        assert!((a.velocity().x + 10.0).abs() < 1e-9);
        assert!((b.velocity().x - 10.0).abs() < 1e-9);
        assert!(a.velocity().y.abs() < 1e-9);
    }

    #[test]
    fn separating_bodies_keep_their_velocities() {
        let mut a = body(Vec2::new(0.0, 0.0), Vec2::new(-1.0, 0.0), 1.0);
        let mut b = body(Vec2::new(1.0, 0.0), Vec2::new(1.0, 0.0), 1.0);
        elastic_collision(&mut a, &mut b);
        assert_eq!(a.velocity(), Vec2::new(-1.0, 0.0));
        assert_eq!(b.velocity(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn bounce_reflects_off_the_touched_wall() {
        let mut agent = body(Vec2::new(7.0, 4.0), Vec2::new(5.0, 1.0), 1.0);
        agent
            .move_by_velocity(1.0, Vec2::ZERO, Vec2::new(10.0, 10.0))
            .unwrap();
        assert!(agent.collision_directions().contains(&BorderDirection::Right));

        bounce(&mut agent);
        assert_eq!(agent.velocity(), Vec2::new(-5.0, 1.0));
    }

    #[test]
    fn space_bodies_stay_in_the_arena() {
        let config = space_config(30);
        let mut scheduler = build(&config, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(scheduler.board().len(), 30);
        assert_eq!(scheduler.tasks().len(), 3);

        for _ in 0..300 {
            scheduler.tick().unwrap();
        }
        let board = scheduler.board();
        let arena = board.arena_size();
        assert_eq!(board.len(), 30);
        assert_eq!(scheduler.tasks().len(), 2);
        for agent in board.agents() {
            assert!(agent.rect().is_within(Vec2::ZERO, arena));
            assert!(agent.state.mass > 0.0);
            assert!(agent.velocity().x.is_finite() && agent.velocity().y.is_finite());
        }
    }

    #[test]
    fn space_uniform_layout_spawns_every_body() {
        let mut config = space_config(12);
        config.scenario.layout = SpawnLayout::Uniform;
        let scheduler = build(&config, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(scheduler.board().len(), 12);
        assert!(scheduler.board().agents().all(|agent| {
            let side = agent.size().x;
            side >= config.scenario.agent_size / 2.0 && side < config.scenario.agent_size
        }));
    }
}
