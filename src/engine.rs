use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{SimError, SimResult};
use crate::registry::{EntityKind, PlayerColor};
use crate::rng::RngManager;
use crate::systems::setup::place_starting_cities;
use crate::world::World;

/// Cities raise an army on turns divisible by this.
pub const ARMY_SPAWN_INTERVAL: u64 = 5;
/// Cities lay road on turns divisible by this.
pub const ROAD_EXPANSION_INTERVAL: u64 = 3;

const SETUP_STREAM: &str = "setup";

/// Resolved run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub turns: u64,
    /// Lifetime cap on armies each player may raise.
    pub max_armies: u32,
    pub cities_per_player: u32,
    pub players: [PlayerColor; 2],
}

impl Rules {
    /// Players in the order they act every turn.
    pub fn player_order(&self) -> [Player; 2] {
        [
            Player {
                slot: 0,
                color: self.players[0],
            },
            Player {
                slot: 1,
                color: self.players[1],
            },
        ]
    }

    pub fn starting_cities(&self) -> usize {
        self.players.len() * self.cities_per_player as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub slot: usize,
    pub color: PlayerColor,
}

/// Mutable bookkeeping for one run.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    current_turn: u64,
    setup_complete: bool,
    failure: Option<SimError>,
    armies_created: [u32; 2],
}

impl SimulationState {
    pub fn current_turn(&self) -> u64 {
        self.current_turn
    }

    /// Positions the turn counter for driving a single phase outside the
    /// engine loop.
    pub fn set_turn(&mut self, turn: u64) {
        self.current_turn = turn;
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&SimError> {
        self.failure.as_ref()
    }

    /// Armies ever raised by the player in `slot`; losses do not decrement it.
    pub fn armies_created(&self, slot: usize) -> u32 {
        self.armies_created[slot]
    }

    pub fn record_army(&mut self, slot: usize) {
        self.armies_created[slot] += 1;
    }

    fn fail(&mut self, err: SimError) {
        self.failure.get_or_insert(err);
    }
}

pub struct SystemContext<'a> {
    pub player: Player,
    pub rules: &'a Rules,
    pub state: &'a mut SimulationState,
}

impl SystemContext<'_> {
    pub fn turn(&self) -> u64 {
        self.state.current_turn
    }
}

/// One phase of a player's turn.
pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        rng: &mut dyn RngCore,
    ) -> SimResult<()>;
}

pub struct EngineSettings {
    pub seed: u64,
    pub rules: Rules,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            rules: self.settings.rules,
            state: SimulationState::default(),
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    rules: Rules,
    state: SimulationState,
}

impl Engine {
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run(&mut self, world: &mut World) -> SimResult<RunSummary> {
        self.run_with_hook(world, |_, _| {})
    }

    /// Runs setup (once) and every remaining turn, calling `hook` after each
    /// turn with the turn number and the settled world.
    ///
    /// The first error puts the engine in its failed state; later calls return
    /// that error without simulating anything.
    pub fn run_with_hook<F>(&mut self, world: &mut World, mut hook: F) -> SimResult<RunSummary>
    where
        F: FnMut(u64, &World),
    {
        if let Some(err) = self.state.failure() {
            return Err(err.clone());
        }
        info!(
            seed = self.rng.seed(),
            turns = self.rules.turns,
            width = world.grid().width(),
            height = world.grid().height(),
            "starting simulation"
        );
        if let Err(err) = self.drive(world, &mut hook) {
            error!(turn = self.state.current_turn, %err, "simulation failed");
            self.state.fail(err.clone());
            // Keep whatever was logged before the failure.
            if let Err(flush_err) = world.flush() {
                warn!(%flush_err, "could not flush action log after failure");
            }
            return Err(err);
        }
        let summary = self.summary(world);
        info!(
            turns = summary.turns_simulated,
            log_lines = summary.log_lines,
            "simulation finished"
        );
        Ok(summary)
    }

    fn drive(&mut self, world: &mut World, hook: &mut dyn FnMut(u64, &World)) -> SimResult<()> {
        if !self.state.setup_complete {
            world.mark_turn(0)?;
            let mut rng = self.rng.stream(SETUP_STREAM);
            place_starting_cities(world, &self.rules, &mut rng)?;
            self.state.setup_complete = true;
            world.flush()?;
            info!(
                cities = world.registry(EntityKind::City).len(),
                "starting cities placed"
            );
            hook(0, world);
        }

        while self.state.current_turn < self.rules.turns {
            if self.state.is_failed() {
                break;
            }
            self.state.current_turn += 1;
            let turn = self.state.current_turn;
            world.mark_turn(turn)?;

            for player in self.rules.player_order() {
                for system in &mut self.systems {
                    let mut rng = self.rng.stream(system.name());
                    let mut ctx = SystemContext {
                        player,
                        rules: &self.rules,
                        state: &mut self.state,
                    };
                    system.run(&mut ctx, world, &mut rng)?;
                }
            }

            world.flush()?;
            debug!(
                turn,
                cities = world.registry(EntityKind::City).len(),
                roads = world.registry(EntityKind::Road).len(),
                armies = world.registry(EntityKind::Army).len(),
                "turn complete"
            );
            hook(turn, world);
        }
        Ok(())
    }

    pub fn summary(&self, world: &World) -> RunSummary {
        let players = self
            .rules
            .player_order()
            .iter()
            .map(|player| PlayerSummary {
                color: player.color,
                cities: world.registry(EntityKind::City).owned_by(player.color),
                roads: world.registry(EntityKind::Road).owned_by(player.color),
                armies: world.registry(EntityKind::Army).owned_by(player.color),
                armies_created: self.state.armies_created(player.slot),
            })
            .collect();
        RunSummary {
            seed: self.rng.seed(),
            turns_simulated: self.state.current_turn,
            log_lines: world.log().lines_written(),
            players,
        }
    }
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub turns_simulated: u64,
    pub log_lines: u64,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub color: PlayerColor,
    pub cities: usize,
    pub roads: usize,
    pub armies: usize,
    pub armies_created: u32,
}
