use rand::{Rng, RngCore};
use tracing::debug;

use crate::engine::{System, SystemContext};
use crate::error::SimResult;
use crate::grid::{Position, Structure};
use crate::registry::{EntityKind, PlayerColor};
use crate::world::World;

/// What a single army did on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmyOutcome {
    Destroyed(Position),
    CapturedCity(Position),
    CapturedRoad(Position),
    Moved(Position),
    Held,
}

impl ArmyOutcome {
    /// A kill or a road capture ends the player's whole army phase.
    pub fn ends_phase(self) -> bool {
        matches!(self, ArmyOutcome::Destroyed(_) | ArmyOutcome::CapturedRoad(_))
    }
}

/// Army phase: fight, capture, or wander.
pub struct ArmySystem;

impl ArmySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArmySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ArmySystem {
    fn name(&self) -> &str {
        "army"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        rng: &mut dyn RngCore,
    ) -> SimResult<()> {
        let player = ctx.player.color;
        let mut index = 0;
        while let Some(army) = world.registry(EntityKind::Army).get(index).copied() {
            index += 1;
            if army.owner != player {
                continue;
            }
            let outcome = act(world, army.pos, player, rng)?;
            if outcome.ends_phase() {
                debug!(turn = ctx.turn(), color = %player, ?outcome, "army phase ended early");
                break;
            }
        }
        Ok(())
    }
}

/// Applies the fixed priority policy to the army at `pos`.
pub fn act(
    world: &mut World,
    pos: Position,
    player: PlayerColor,
    rng: &mut dyn RngCore,
) -> SimResult<ArmyOutcome> {
    let adjacent = world.grid().adjacent(pos);
    let enemy = |world: &World, kind: EntityKind| {
        adjacent
            .iter()
            .copied()
            .find(|next| world.enemy_at(kind, *next, player))
    };

    if let Some(target) = enemy(&*world, EntityKind::Army) {
        world.destroy(EntityKind::Army, target)?;
        return Ok(ArmyOutcome::Destroyed(target));
    }
    if let Some(target) = enemy(&*world, EntityKind::City) {
        world.recolor(EntityKind::City, target, player)?;
        debug!(?target, color = %player, "city captured");
        return Ok(ArmyOutcome::CapturedCity(target));
    }
    if let Some(target) = enemy(&*world, EntityKind::Road) {
        world.recolor(EntityKind::Road, target, player)?;
        return Ok(ArmyOutcome::CapturedRoad(target));
    }

    // Sample as many times as there are neighbours; roads of either owner
    // are open ground here.
    for _ in 0..adjacent.len() {
        let next = adjacent[rng.gen_range(0..adjacent.len())];
        let cell = world.grid().cell(next);
        if !cell.has_unit && cell.structure != Structure::City {
            world.move_army(pos, next)?;
            return Ok(ArmyOutcome::Moved(next));
        }
    }
    Ok(ArmyOutcome::Held)
}
