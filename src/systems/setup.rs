use rand::{Rng, RngCore};

use crate::engine::Rules;
use crate::error::{SimError, SimResult};
use crate::grid::Position;
use crate::registry::EntityKind;
use crate::world::World;

/// Turn 0: scatter each player's starting cities over buildable terrain.
///
/// Candidates are gathered row-major; each pick is swap-removed from the pool
/// so no two cities can share a cell.
pub fn place_starting_cities(
    world: &mut World,
    rules: &Rules,
    rng: &mut dyn RngCore,
) -> SimResult<()> {
    let mut candidates: Vec<Position> = world
        .grid()
        .iter()
        .filter(|(_, cell)| cell.terrain.is_buildable())
        .map(|(pos, _)| pos)
        .collect();

    let required = rules.starting_cities();
    if candidates.is_empty() || candidates.len() < required {
        return Err(SimError::InsufficientStartingLand {
            available: candidates.len(),
            required,
        });
    }

    for player in rules.player_order() {
        for _ in 0..rules.cities_per_player {
            let pick = rng.gen_range(0..candidates.len());
            let pos = candidates.swap_remove(pick);
            world.create(EntityKind::City, pos, player.color)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::{Action, ActionLog, MemorySink};
    use crate::grid::{Grid, Terrain};
    use crate::registry::PlayerColor;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rules(cities_per_player: u32) -> Rules {
        Rules {
            turns: 0,
            max_armies: 0,
            cities_per_player,
            players: [PlayerColor(3), PlayerColor(7)],
        }
    }

    #[test]
    fn only_buildable_cells_are_settled() {
        let mut grid = Grid::new(2, 3).unwrap();
        grid.populate([
            Terrain::River,
            Terrain::Forest,
            Terrain::Ocean,
            Terrain::Mountain,
            Terrain::Plains,
            Terrain::River,
        ]);
        let sink = MemorySink::new();
        let mut world = World::new(grid, ActionLog::from_writer(sink.clone()));
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        place_starting_cities(&mut world, &rules(1), &mut rng).unwrap();

        let mut settled: Vec<Position> = world
            .registry(EntityKind::City)
            .iter()
            .map(|city| city.pos)
            .collect();
        settled.sort();
        assert_eq!(settled, vec![Position::new(0, 1), Position::new(1, 1)]);
        assert!(world.check_invariants().is_empty());
    }

    #[test]
    fn first_player_settles_first() {
        let sink = MemorySink::new();
        let mut world = World::new(
            Grid::new(4, 4).unwrap(),
            ActionLog::from_writer(sink.clone()),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        place_starting_cities(&mut world, &rules(2), &mut rng).unwrap();

        let owners: Vec<PlayerColor> = sink
            .actions()
            .unwrap()
            .into_iter()
            .filter_map(|action| match action {
                Action::Create { owner, .. } => Some(owner),
                _ => None,
            })
            .collect();
        assert_eq!(
            owners,
            vec![PlayerColor(3), PlayerColor(3), PlayerColor(7), PlayerColor(7)]
        );
    }

    #[test]
    fn too_little_land_fails() {
        let mut grid = Grid::new(2, 2).unwrap();
        grid.populate([Terrain::Plains, Terrain::Ocean, Terrain::River, Terrain::Forest]);
        let mut world = World::new(grid, ActionLog::from_writer(MemorySink::new()));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let err = place_starting_cities(&mut world, &rules(2), &mut rng).unwrap_err();
        assert_eq!(
            err,
            SimError::InsufficientStartingLand {
                available: 2,
                required: 4
            }
        );
        assert!(world.registry(EntityKind::City).is_empty());
    }

    #[test]
    fn empty_pool_fails_even_without_cities() {
        let mut grid = Grid::new(1, 2).unwrap();
        grid.populate([Terrain::Ocean, Terrain::River]);
        let mut world = World::new(grid, ActionLog::from_writer(MemorySink::new()));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            place_starting_cities(&mut world, &rules(0), &mut rng),
            Err(SimError::InsufficientStartingLand { available: 0, .. })
        ));
    }
}
