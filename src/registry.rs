use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// Integer colour code identifying a player in the action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerColor(pub i32);

impl std::fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    City,
    Road,
    Army,
}

impl EntityKind {
    /// Log layer: structures on 1, armies on 2.
    pub fn layer(self) -> u8 {
        match self {
            EntityKind::City | EntityKind::Road => 1,
            EntityKind::Army => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::City => "city",
            EntityKind::Road => "road",
            EntityKind::Army => "army",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "city" => Some(EntityKind::City),
            "road" => Some(EntityKind::Road),
            "army" => Some(EntityKind::Army),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub pos: Position,
    pub owner: PlayerColor,
}

/// Unordered collection of one entity kind.
///
/// Lookups scan linearly; removal swaps the last entry into the hole, so
/// indices are only stable until the next removal.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entity: Entity) {
        self.entries.push(entity);
    }

    pub fn find(&self, pos: Position) -> Option<usize> {
        self.entries.iter().position(|entity| entity.pos == pos)
    }

    pub fn at(&self, pos: Position) -> Option<&Entity> {
        self.find(pos).map(|index| &self.entries[index])
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entries.get_mut(index)
    }

    pub fn remove_at(&mut self, pos: Position) -> Option<Entity> {
        let index = self.find(pos)?;
        Some(self.entries.swap_remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entries.iter()
    }

    pub fn owned_by(&self, owner: PlayerColor) -> usize {
        self.entries.iter().filter(|e| e.owner == owner).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(x: usize, y: usize, owner: i32) -> Entity {
        Entity {
            pos: Position::new(x, y),
            owner: PlayerColor(owner),
        }
    }

    #[test]
    fn lookup_finds_unique_entry() {
        let mut registry = Registry::new();
        registry.push(entity(0, 0, 1));
        registry.push(entity(2, 3, 4));

        assert_eq!(registry.find(Position::new(2, 3)), Some(1));
        assert_eq!(registry.at(Position::new(0, 0)).map(|e| e.owner), Some(PlayerColor(1)));
        assert_eq!(registry.find(Position::new(1, 1)), None);
    }

    #[test]
    fn removal_swaps_last_into_hole() {
        let mut registry = Registry::new();
        registry.push(entity(0, 0, 1));
        registry.push(entity(0, 1, 1));
        registry.push(entity(0, 2, 2));

        let removed = registry.remove_at(Position::new(0, 0)).unwrap();
        assert_eq!(removed.pos, Position::new(0, 0));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).map(|e| e.pos), Some(Position::new(0, 2)));
        assert!(registry.find(Position::new(0, 0)).is_none());
        assert!(registry.remove_at(Position::new(0, 0)).is_none());
        assert_eq!(registry.owned_by(PlayerColor(1)), 1);
    }

    #[test]
    fn kind_labels_and_layers() {
        assert_eq!(EntityKind::Road.layer(), 1);
        assert_eq!(EntityKind::Army.layer(), 2);
        assert_eq!(EntityKind::from_label("city"), Some(EntityKind::City));
        assert_eq!(EntityKind::from_label("castle"), None);
    }
}
