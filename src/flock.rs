//! The boid population and its per-tick update.
//!
//! A [`Flock`] owns a fixed-size array of [`Agent`]s and the [`Octree`] that
//! indexes their positions. Each tick runs in two phases:
//!
//! 1. **Steer** (parallel, read-only): every agent queries the index for its
//!    separation and flocking neighborhoods and computes a new velocity from
//!    the positions and velocities at the start of the tick.
//! 2. **Integrate** (parallel, per-agent writes): every agent moves, is kept
//!    inside the world box, and updates its own index entry.
//!
//! Phase 1 finishes for all agents before phase 2 starts, so steering never
//! observes a partially moved flock.
//!
//! # Example
//!
//! ```
//! use octoflock::{Aabb, Flock, FlockConfig};
//!
//! let config = FlockConfig::default().with_agent_count(200);
//! let mut flock = Flock::from_seed(config, Aabb::cube(20.0), 42).unwrap();
//!
//! for _ in 0..10 {
//!     flock.step(1.0 / 60.0).unwrap();
//! }
//! assert_eq!(flock.index().count_points(), 200);
//! ```

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::aabb::Aabb;
use crate::config::FlockConfig;
use crate::error::{ConfigError, SimulationError};
use crate::octree::{Entry, Octree};
use crate::rules;
use crate::spawn::SpawnContext;
use crate::time::SimClock;

/// One boid.
///
/// The layout is fixed so the agent array can be uploaded as instance data
/// without conversion (see [`Flock::instance_bytes`]).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Agent {
    pub position: Vec3,
    /// Stable identity; equals the agent's index in the flock.
    pub id: u32,
    pub velocity: Vec3,
}

/// Counters gathered during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Number of the tick just completed, starting at 1.
    pub tick: u64,
    pub agents: usize,
    /// Sum of separation neighborhood sizes over all agents.
    pub separation_neighbors: usize,
    /// Sum of alignment/cohesion neighborhood sizes over all agents.
    pub flock_neighbors: usize,
    /// Whether the index was rebuilt before steering.
    pub index_rebuilt: bool,
}

/// Output of the steering phase for a single agent.
#[derive(Clone, Copy)]
struct Steering {
    velocity: Vec3,
    separation_neighbors: usize,
    flock_neighbors: usize,
}

/// A flock of boids over a shared spatial index.
pub struct Flock {
    agents: Vec<Agent>,
    index: Octree,
    config: FlockConfig,
    clock: SimClock,
    ticks: u64,
}

impl Flock {
    /// Spawn `config.agent_count` boids uniformly inside `region` with random
    /// headings and speeds below `config.spawn_speed`.
    pub fn spawn<R: Rng>(config: FlockConfig, region: Aabb, rng: &mut R) -> Result<Self, SimulationError> {
        let speed = config.spawn_speed;
        Self::spawn_with(config, region, rng, |ctx| {
            (ctx.random_in_region(), ctx.random_velocity(speed))
        })
    }

    /// Spawn `config.agent_count` boids, asking `spawner` for each one's
    /// initial position and velocity.
    ///
    /// Positions outside the world box are clamped onto it.
    pub fn spawn_with<R, F>(config: FlockConfig, region: Aabb, rng: &mut R, mut spawner: F) -> Result<Self, SimulationError>
    where
        R: Rng,
        F: FnMut(&mut SpawnContext<'_, R>) -> (Vec3, Vec3),
    {
        config.validate()?;
        if !(region.min.is_finite() && region.max.is_finite() && region.min.cmple(region.max).all()) {
            return Err(ConfigError::Invalid("spawn region must be finite with min <= max").into());
        }

        let count = config.agent_count;
        let mut agents = Vec::with_capacity(count);
        for i in 0..count {
            let mut ctx = SpawnContext::new(i, count, region, &mut *rng);
            let (position, velocity) = spawner(&mut ctx);
            agents.push(Agent {
                position: config.world_bounds.clamp(position),
                id: i as u32,
                velocity,
            });
        }

        let index = build_index(&config, &agents)?;
        info!(count, ?region, nodes = index.count_nodes(), "spawned flock");

        Ok(Self {
            agents,
            index,
            config,
            clock: SimClock::default(),
            ticks: 0,
        })
    }

    /// Spawn with a [`SmallRng`] seeded from `seed`, for reproducible runs.
    pub fn from_seed(config: FlockConfig, region: Aabb, seed: u64) -> Result<Self, SimulationError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        Self::spawn(config, region, &mut rng)
    }

    /// Replace every boid with a fresh spawn under the current configuration.
    ///
    /// This is the only point where a changed `agent_count` takes effect.
    pub fn respawn<R: Rng>(&mut self, region: Aabb, rng: &mut R) -> Result<(), SimulationError> {
        let fresh = Self::spawn(self.config.clone(), region, rng)?;
        self.agents = fresh.agents;
        self.index = fresh.index;
        self.ticks = 0;
        self.clock.reset();
        Ok(())
    }

    // ========== Views ==========

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.get(id as usize)
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.agents.iter().map(|a| a.position)
    }

    pub fn velocities(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.agents.iter().map(|a| a.velocity)
    }

    /// The agent array as raw bytes, ready for a vertex/instance buffer.
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.agents)
    }

    /// The spatial index. Entries mirror agent positions between ticks.
    pub fn index(&self) -> &Octree {
        &self.index
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    ///
    /// Changes are picked up by the next [`step`](Self::step); values are
    /// validated there.
    pub fn config_mut(&mut self) -> &mut FlockConfig {
        &mut self.config
    }

    /// Replace the configuration after validating it.
    pub fn set_config(&mut self, config: FlockConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    /// Ticks completed since spawn.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // ========== Stepping ==========

    /// Advance one tick of `dt` seconds under the flock's own configuration.
    pub fn step(&mut self, dt: f32) -> Result<TickStats, SimulationError> {
        let config = self.config.clone();
        self.tick(&config, dt)
    }

    /// Feed one frame's duration through the clock and run the fixed ticks it
    /// yields. Returns the number of ticks run.
    pub fn advance(&mut self, frame_delta: f32) -> Result<u32, SimulationError> {
        let ticks = self.clock.advance(frame_delta);
        let dt = self.clock.fixed_delta();
        for _ in 0..ticks {
            self.step(dt)?;
        }
        Ok(ticks)
    }

    /// Advance one tick of `dt` seconds under `config`.
    ///
    /// A `dt` that is not a positive finite number is a no-op. If the index
    /// disagrees with the agents after integration, it is rebuilt from the
    /// agent positions before the error is returned, so the next tick starts
    /// from a consistent state.
    pub fn tick(&mut self, config: &FlockConfig, dt: f32) -> Result<TickStats, SimulationError> {
        config.validate()?;
        if !(dt.is_finite() && dt > 0.0) {
            debug!(dt, "skipping tick with unusable dt");
            return Ok(TickStats {
                tick: self.ticks,
                agents: self.agents.len(),
                ..TickStats::default()
            });
        }

        let index_rebuilt = !index_matches(&self.index, config);
        if index_rebuilt {
            for agent in &mut self.agents {
                agent.position = config.world_bounds.clamp(agent.position);
            }
            self.index = build_index(config, &self.agents)?;
            info!(
                capacity = config.node_capacity,
                max_depth = config.max_depth,
                "index parameters changed, rebuilt index"
            );
        }

        // Phase 1: steering from the start-of-tick snapshot
        let agents = &self.agents;
        let index = &self.index;
        let steering: Vec<Steering> = agents
            .par_iter()
            .map_init(Vec::new, |scratch, agent| steer(agent, agents, index, config, dt, scratch))
            .collect();

        // Phase 2: integrate and move index entries
        let bounds = config.world_bounds;
        let mut failures: Vec<SimulationError> = self
            .agents
            .par_iter_mut()
            .zip(steering.par_iter())
            .filter_map(|(agent, steer)| {
                let old = agent.position;
                let (position, velocity) = integrate(old, steer.velocity, dt, &bounds);
                agent.position = position;
                agent.velocity = velocity;
                match index.update(agent.id, old, position) {
                    Ok(true) => None,
                    Ok(false) => Some(SimulationError::StaleEntry { id: agent.id, position: old }),
                    Err(e) => Some(e.into()),
                }
            })
            .collect();

        self.ticks += 1;

        if !failures.is_empty() {
            error!(
                tick = self.ticks,
                failures = failures.len(),
                "index out of sync after integration, rebuilding"
            );
            self.index = build_index(config, &self.agents)?;
            return Err(failures.swap_remove(0));
        }

        let stats = TickStats {
            tick: self.ticks,
            agents: self.agents.len(),
            separation_neighbors: steering.iter().map(|s| s.separation_neighbors).sum(),
            flock_neighbors: steering.iter().map(|s| s.flock_neighbors).sum(),
            index_rebuilt,
        };
        debug!(
            tick = stats.tick,
            separation_neighbors = stats.separation_neighbors,
            flock_neighbors = stats.flock_neighbors,
            "tick complete"
        );
        Ok(stats)
    }

    /// Throw away the index and rebuild it from the current agent positions.
    pub fn rebuild_index(&mut self) -> Result<(), SimulationError> {
        self.index = build_index(&self.config, &self.agents)?;
        info!(nodes = self.index.count_nodes(), "rebuilt index");
        Ok(())
    }
}

fn index_matches(index: &Octree, config: &FlockConfig) -> bool {
    index.bounds() == config.world_bounds
        && index.capacity() == config.node_capacity
        && index.max_depth() == config.max_depth
}

fn build_index(config: &FlockConfig, agents: &[Agent]) -> Result<Octree, SimulationError> {
    let index = Octree::with_max_depth(config.world_bounds, config.node_capacity, config.max_depth);
    for agent in agents {
        if !index.insert(agent.id, agent.position)? {
            return Err(SimulationError::Unindexed {
                id: agent.id,
                position: agent.position,
            });
        }
    }
    Ok(index)
}

/// Compute one agent's next velocity from the snapshot.
///
/// Neighborhoods exclude the agent itself by id and are summed in id order,
/// so the result does not depend on the order the index returns entries in.
fn steer(
    agent: &Agent,
    agents: &[Agent],
    index: &Octree,
    config: &FlockConfig,
    dt: f32,
    scratch: &mut Vec<Entry>,
) -> Steering {
    neighborhood(index, agent, config.separation_radius, scratch);
    let separation = rules::separation(
        agent.position,
        scratch.iter().map(|e| e.position),
        config.separation_radius,
        config.separation_falloff,
        config.separation_factor,
    );
    let separation_neighbors = scratch.len();

    neighborhood(index, agent, config.neighbor_radius, scratch);
    let alignment = rules::alignment(
        agent.velocity,
        scratch.iter().map(|e| agents[e.id as usize].velocity),
        config.alignment_factor,
    );
    let cohesion = rules::cohesion(agent.position, scratch.iter().map(|e| e.position), config.cohesion_factor);
    let containment = rules::containment(
        agent.position,
        &config.world_bounds,
        config.boundary_threshold,
        config.boundary_factor,
    );

    let force = rules::limit(separation + alignment + cohesion + containment, config.max_force);
    Steering {
        velocity: rules::limit(agent.velocity + force * dt, config.max_speed),
        separation_neighbors,
        flock_neighbors: scratch.len(),
    }
}

fn neighborhood(index: &Octree, agent: &Agent, radius: f32, out: &mut Vec<Entry>) {
    out.clear();
    index.query_sphere_into(agent.position, radius, out);
    out.retain(|e| e.id != agent.id);
    out.sort_unstable_by_key(|e| e.id);
}

/// Move by `velocity * dt` and keep the result inside `bounds`.
///
/// A boid that hits a face stops moving along that axis.
fn integrate(position: Vec3, velocity: Vec3, dt: f32, bounds: &Aabb) -> (Vec3, Vec3) {
    let moved = position + velocity * dt;
    let clamped = bounds.clamp(moved);
    let hit = moved.cmpne(clamped);
    (clamped, Vec3::select(hit, Vec3::ZERO, velocity))
}
