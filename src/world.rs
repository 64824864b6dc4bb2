use tracing::warn;

use crate::action_log::{Action, ActionLog};
use crate::error::SimResult;
use crate::grid::{Grid, Position, Structure};
use crate::registry::{Entity, EntityKind, PlayerColor, Registry};

/// Grid, entity registries and the log every mutation is written to.
///
/// All state changes go through `create`, `move_army`, `recolor` and
/// `destroy`, which keep cell markers and registries in step and emit one log
/// line each.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    cities: Registry,
    roads: Registry,
    armies: Registry,
    log: ActionLog,
}

impl World {
    pub fn new(grid: Grid, log: ActionLog) -> Self {
        Self {
            grid,
            cities: Registry::new(),
            roads: Registry::new(),
            armies: Registry::new(),
            log,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self, kind: EntityKind) -> &Registry {
        match kind {
            EntityKind::City => &self.cities,
            EntityKind::Road => &self.roads,
            EntityKind::Army => &self.armies,
        }
    }

    fn registry_mut(&mut self, kind: EntityKind) -> &mut Registry {
        match kind {
            EntityKind::City => &mut self.cities,
            EntityKind::Road => &mut self.roads,
            EntityKind::Army => &mut self.armies,
        }
    }

    pub fn find(&self, kind: EntityKind, pos: Position) -> Option<&Entity> {
        self.registry(kind).at(pos)
    }

    /// True if a `kind` entity at `pos` belongs to someone other than `player`.
    pub fn enemy_at(&self, kind: EntityKind, pos: Position, player: PlayerColor) -> bool {
        self.find(kind, pos)
            .is_some_and(|entity| entity.owner != player)
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn mark_turn(&mut self, turn: u64) -> SimResult<()> {
        self.log.record(&Action::Turn(turn))
    }

    pub fn flush(&mut self) -> SimResult<()> {
        self.log.flush()
    }

    pub fn create(&mut self, kind: EntityKind, pos: Position, owner: PlayerColor) -> SimResult<()> {
        let cell = self.grid.cell_mut(pos);
        match kind {
            EntityKind::City => {
                debug_assert_eq!(cell.structure, Structure::None, "structure already at {pos:?}");
                cell.structure = Structure::City;
            }
            EntityKind::Road => {
                debug_assert_eq!(cell.structure, Structure::None, "structure already at {pos:?}");
                cell.structure = Structure::Road;
            }
            EntityKind::Army => {
                debug_assert!(!cell.has_unit, "unit already at {pos:?}");
                cell.has_unit = true;
            }
        }
        self.registry_mut(kind).push(Entity { pos, owner });
        self.log.record(&Action::Create { kind, pos, owner })
    }

    pub fn move_army(&mut self, from: Position, to: Position) -> SimResult<()> {
        let Some(index) = self.armies.find(from) else {
            warn!(?from, "no army to move");
            return Ok(());
        };
        if let Some(army) = self.armies.get_mut(index) {
            army.pos = to;
        }
        self.grid.cell_mut(from).has_unit = false;
        self.grid.cell_mut(to).has_unit = true;
        self.log.record(&Action::Move { from, to })
    }

    /// Changes the owner in place; capture never recreates the entity.
    pub fn recolor(&mut self, kind: EntityKind, pos: Position, owner: PlayerColor) -> SimResult<()> {
        let registry = self.registry_mut(kind);
        let Some(entity) = registry.find(pos).and_then(|index| registry.get_mut(index)) else {
            warn!(?kind, ?pos, "no entity to recolor");
            return Ok(());
        };
        entity.owner = owner;
        self.log.record(&Action::Recolor {
            layer: kind.layer(),
            pos,
            owner,
        })
    }

    pub fn destroy(&mut self, kind: EntityKind, pos: Position) -> SimResult<()> {
        if self.registry_mut(kind).remove_at(pos).is_none() {
            warn!(?kind, ?pos, "no entity to destroy");
            return Ok(());
        }
        let cell = self.grid.cell_mut(pos);
        match kind {
            EntityKind::City | EntityKind::Road => cell.structure = Structure::None,
            EntityKind::Army => cell.has_unit = false,
        }
        self.log.record(&Action::Destroy {
            layer: kind.layer(),
            pos,
        })
    }

    /// Lists every disagreement between cell markers and registries.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for kind in [EntityKind::City, EntityKind::Road, EntityKind::Army] {
            let registry = self.registry(kind);
            for (index, entity) in registry.iter().enumerate() {
                if !self.grid.contains(entity.pos) {
                    violations.push(InvariantViolation::new(format!(
                        "{} at {:?} lies outside the grid",
                        kind.label(),
                        entity.pos
                    )));
                    continue;
                }
                if registry.find(entity.pos) != Some(index) {
                    violations.push(InvariantViolation::new(format!(
                        "more than one {} at {:?}",
                        kind.label(),
                        entity.pos
                    )));
                }
            }
        }

        for (pos, cell) in self.grid.iter() {
            let city = self.cities.find(pos).is_some();
            let road = self.roads.find(pos).is_some();
            let army = self.armies.find(pos).is_some();
            let expected = match (city, road) {
                (false, false) => Structure::None,
                (true, false) => Structure::City,
                (false, true) => Structure::Road,
                (true, true) => {
                    violations.push(InvariantViolation::new(format!(
                        "city and road share {pos:?}"
                    )));
                    continue;
                }
            };
            if cell.structure != expected {
                violations.push(InvariantViolation::new(format!(
                    "cell {pos:?} marked {:?} but registries say {expected:?}",
                    cell.structure
                )));
            }
            if cell.has_unit != army {
                violations.push(InvariantViolation::new(format!(
                    "cell {pos:?} unit flag {} but army present {army}",
                    cell.has_unit
                )));
            }
            if army && cell.terrain.is_obstructing() {
                violations.push(InvariantViolation::new(format!(
                    "army stands on {:?} at {pos:?}",
                    cell.terrain
                )));
            }
        }

        violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub message: String,
}

impl InvariantViolation {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::MemorySink;

    const RED: PlayerColor = PlayerColor(1);
    const BLUE: PlayerColor = PlayerColor(2);

    fn world(width: usize, height: usize) -> (World, MemorySink) {
        let sink = MemorySink::new();
        let world = World::new(
            Grid::new(width, height).unwrap(),
            ActionLog::from_writer(sink.clone()),
        );
        (world, sink)
    }

    #[test]
    fn create_then_destroy_updates_lookup() {
        let (mut world, sink) = world(3, 3);
        let pos = Position::new(1, 2);

        world.create(EntityKind::Army, pos, RED).unwrap();
        assert_eq!(world.find(EntityKind::Army, pos).map(|e| e.owner), Some(RED));
        assert!(world.find(EntityKind::City, pos).is_none());
        assert!(world.grid().cell(pos).has_unit);

        world.destroy(EntityKind::Army, pos).unwrap();
        assert!(world.find(EntityKind::Army, pos).is_none());
        assert!(!world.grid().cell(pos).has_unit);
        assert!(world.check_invariants().is_empty());
        assert_eq!(sink.contents(), "C 2 2 1 1 army\nD 2 2 1\n");
    }

    #[test]
    fn layer_one_destroy_removes_the_named_kind() {
        let (mut world, sink) = world(2, 2);
        world.create(EntityKind::City, Position::new(0, 0), RED).unwrap();
        world.create(EntityKind::Road, Position::new(0, 1), RED).unwrap();

        world.destroy(EntityKind::Road, Position::new(0, 1)).unwrap();
        assert_eq!(world.registry(EntityKind::City).len(), 1);
        assert!(world.registry(EntityKind::Road).is_empty());
        assert_eq!(world.grid().cell(Position::new(0, 1)).structure, Structure::None);
        assert!(sink.contents().ends_with("D 1 1 0\n"));
    }

    #[test]
    fn move_relocates_unit_flag() {
        let (mut world, sink) = world(2, 2);
        let from = Position::new(0, 0);
        let to = Position::new(1, 0);
        world.create(EntityKind::Army, from, BLUE).unwrap();
        world.move_army(from, to).unwrap();

        assert!(!world.grid().cell(from).has_unit);
        assert!(world.grid().cell(to).has_unit);
        assert_eq!(world.find(EntityKind::Army, to).map(|e| e.owner), Some(BLUE));
        assert!(sink.contents().ends_with("M 0 0 0 1\n"));
    }

    #[test]
    fn recolor_keeps_entity_in_place() {
        let (mut world, sink) = world(2, 2);
        let pos = Position::new(1, 1);
        world.create(EntityKind::City, pos, RED).unwrap();
        assert!(world.enemy_at(EntityKind::City, pos, BLUE));

        world.recolor(EntityKind::City, pos, BLUE).unwrap();
        assert_eq!(world.registry(EntityKind::City).len(), 1);
        assert!(!world.enemy_at(EntityKind::City, pos, BLUE));
        assert!(sink.contents().ends_with("L 1 1 1 2\n"));
    }

    #[test]
    fn missing_targets_are_ignored() {
        let (mut world, sink) = world(2, 2);
        world.destroy(EntityKind::City, Position::new(0, 0)).unwrap();
        world.recolor(EntityKind::Road, Position::new(0, 0), RED).unwrap();
        world.move_army(Position::new(0, 0), Position::new(0, 1)).unwrap();
        assert!(sink.contents().is_empty());
        assert!(world.check_invariants().is_empty());
    }

    #[test]
    fn invariant_checker_reports_stray_markers() {
        let (mut world, _sink) = world(2, 2);
        world.grid.cell_mut(Position::new(1, 1)).has_unit = true;
        world.roads.push(Entity {
            pos: Position::new(0, 0),
            owner: RED,
        });

        let violations = world.check_invariants();
        assert_eq!(violations.len(), 2, "{violations:?}");
    }
}
