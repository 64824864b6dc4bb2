use rand::RngCore;
use tracing::trace;

use crate::engine::{System, SystemContext, ARMY_SPAWN_INTERVAL, ROAD_EXPANSION_INTERVAL};
use crate::error::SimResult;
use crate::grid::Position;
use crate::registry::{EntityKind, PlayerColor};
use crate::world::World;

/// City phase: raise armies and grow the road network.
pub struct CitySystem;

impl CitySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CitySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CitySystem {
    fn name(&self) -> &str {
        "city"
    }

    fn run(
        &mut self,
        ctx: &mut SystemContext<'_>,
        world: &mut World,
        _rng: &mut dyn RngCore,
    ) -> SimResult<()> {
        let turn = ctx.turn();
        let spawn = turn % ARMY_SPAWN_INTERVAL == 0;
        let expand = turn % ROAD_EXPANSION_INTERVAL == 0;
        if !spawn && !expand {
            return Ok(());
        }

        let player = ctx.player;
        let cities = owned_positions(world, EntityKind::City, player.color);
        let mut built = 0;

        for city in cities {
            if spawn
                && !world.grid().cell(city).has_unit
                && ctx.state.armies_created(player.slot) < ctx.rules.max_armies
            {
                world.create(EntityKind::Army, city, player.color)?;
                ctx.state.record_army(player.slot);
                trace!(turn, ?city, color = %player.color, "army raised");
            }

            if expand {
                if let Some(site) = vacant_neighbour(world, city) {
                    world.create(EntityKind::Road, site, player.color)?;
                    built += 1;
                }
            }
        }

        // Every city is boxed in: branch off the existing network instead.
        if expand && built == 0 {
            for road in owned_positions(world, EntityKind::Road, player.color) {
                if let Some(site) = vacant_neighbour(world, road) {
                    world.create(EntityKind::Road, site, player.color)?;
                    trace!(turn, from = ?road, to = ?site, "road branched");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn owned_positions(world: &World, kind: EntityKind, owner: PlayerColor) -> Vec<Position> {
    world
        .registry(kind)
        .iter()
        .filter(|entity| entity.owner == owner)
        .map(|entity| entity.pos)
        .collect()
}

/// First neighbour, in enumeration order, with no unit, city or road.
fn vacant_neighbour(world: &World, pos: Position) -> Option<Position> {
    world
        .grid()
        .adjacent(pos)
        .into_iter()
        .find(|next| world.grid().cell(*next).is_vacant())
}
