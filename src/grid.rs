//! Terrain grid and adjacency resolution.
//!
//! The grid is indexed `(x, y)` where `x` selects one of `width` map rows and
//! `y` one of `height` symbols within that row.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Plains,
    Forest,
    Mountain,
    Ocean,
    River,
}

impl Terrain {
    /// Plains and forest can host a starting city.
    pub fn is_buildable(self) -> bool {
        matches!(self, Terrain::Plains | Terrain::Forest)
    }

    /// Ocean and mountain block adjacency and movement.
    pub fn is_obstructing(self) -> bool {
        matches!(self, Terrain::Ocean | Terrain::Mountain)
    }
}

/// Character used for each terrain type in map files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSymbols {
    #[serde(default = "default_plains")]
    pub plains: char,
    #[serde(default = "default_mountain")]
    pub mountain: char,
    #[serde(default = "default_forest")]
    pub forest: char,
    #[serde(default = "default_ocean")]
    pub ocean: char,
    #[serde(default = "default_river")]
    pub river: char,
}

fn default_plains() -> char {
    '.'
}

fn default_mountain() -> char {
    '^'
}

fn default_forest() -> char {
    '*'
}

fn default_ocean() -> char {
    '~'
}

fn default_river() -> char {
    '-'
}

impl Default for TerrainSymbols {
    fn default() -> Self {
        Self {
            plains: default_plains(),
            mountain: default_mountain(),
            forest: default_forest(),
            ocean: default_ocean(),
            river: default_river(),
        }
    }
}

impl TerrainSymbols {
    pub fn terrain(&self, symbol: char) -> Option<Terrain> {
        self.pairs()
            .into_iter()
            .find(|(candidate, _)| *candidate == symbol)
            .map(|(_, terrain)| terrain)
    }

    /// Returns the first symbol that is mapped to more than one terrain.
    pub fn first_duplicate(&self) -> Option<char> {
        let pairs = self.pairs();
        pairs
            .iter()
            .enumerate()
            .find(|(index, (symbol, _))| pairs[index + 1..].iter().any(|(other, _)| other == symbol))
            .map(|(_, (symbol, _))| *symbol)
    }

    fn pairs(&self) -> [(char, Terrain); 5] {
        [
            (self.plains, Terrain::Plains),
            (self.mountain, Terrain::Mountain),
            (self.forest, Terrain::Forest),
            (self.ocean, Terrain::Ocean),
            (self.river, Terrain::River),
        ]
    }
}

/// What, besides an army, occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Structure {
    #[default]
    None,
    City,
    Road,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub terrain: Terrain,
    pub has_unit: bool,
    pub structure: Structure,
}

impl Cell {
    fn empty(terrain: Terrain) -> Self {
        Self {
            terrain,
            has_unit: false,
            structure: Structure::None,
        }
    }

    /// No unit and no city or road.
    pub fn is_vacant(&self) -> bool {
        !self.has_unit && self.structure == Structure::None
    }
}

/// Where a cell sits relative to the grid border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    BottomRight,
    TopLeft,
    BottomLeft,
    TopRight,
    BottomEdge,
    TopEdge,
    RightEdge,
    LeftEdge,
    Interior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
    Left,
    Right,
}

impl Placement {
    fn classify(pos: Position, width: usize, height: usize) -> Self {
        let last_x = width - 1;
        let last_y = height - 1;
        match (pos.x, pos.y) {
            (x, y) if x == last_x && y == last_y => Placement::BottomRight,
            (0, 0) => Placement::TopLeft,
            (x, 0) if x == last_x => Placement::BottomLeft,
            (0, y) if y == last_y => Placement::TopRight,
            (x, _) if x == last_x => Placement::BottomEdge,
            (0, _) => Placement::TopEdge,
            (_, y) if y == last_y => Placement::RightEdge,
            (_, 0) => Placement::LeftEdge,
            _ => Placement::Interior,
        }
    }

    /// Neighbour enumeration order; road expansion takes the first fit, so
    /// this order is observable in the action log.
    fn steps(self) -> &'static [Step] {
        use Step::*;
        match self {
            Placement::BottomRight => &[Up, Left],
            Placement::TopLeft => &[Right, Down],
            Placement::BottomLeft => &[Up, Right],
            Placement::TopRight => &[Left, Down],
            Placement::BottomEdge => &[Right, Left, Up],
            Placement::TopEdge => &[Right, Left, Down],
            Placement::RightEdge => &[Up, Left, Down],
            Placement::LeftEdge => &[Up, Right, Down],
            Placement::Interior => &[Up, Right, Left, Down],
        }
    }
}

impl Step {
    fn apply(self, pos: Position, width: usize, height: usize) -> Option<Position> {
        let (x, y) = (pos.x, pos.y);
        let next = match self {
            Step::Up => Position::new(x.checked_sub(1)?, y),
            Step::Down => Position::new(x + 1, y),
            Step::Left => Position::new(x, y.checked_sub(1)?),
            Step::Right => Position::new(x, y + 1),
        };
        (next.x < width && next.y < height).then_some(next)
    }
}

/// Fixed-size terrain grid, stored row-major.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an all-plains grid.
    pub fn new(width: usize, height: usize) -> SimResult<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::empty(Terrain::Plains); width * height],
        })
    }

    /// Assigns terrain row-major and clears every occupancy marker.
    ///
    /// Cells beyond the end of `terrain` keep their current terrain.
    pub fn populate(&mut self, terrain: impl IntoIterator<Item = Terrain>) {
        let mut source = terrain.into_iter();
        for cell in &mut self.cells {
            let terrain = source.next().unwrap_or(cell.terrain);
            *cell = Cell::empty(terrain);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> usize {
        assert!(
            self.contains(pos),
            "position {pos:?} outside {}x{} grid",
            self.width,
            self.height
        );
        pos.x * self.height + pos.y
    }

    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn cell_mut(&mut self, pos: Position) -> &mut Cell {
        let index = self.index(pos);
        &mut self.cells[index]
    }

    /// Iterates cells row-major together with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        let height = self.height;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Position::new(index / height, index % height), cell))
    }

    /// Orthogonal in-bounds neighbours whose terrain is neither ocean nor
    /// mountain. Depends on terrain only, never on occupancy.
    pub fn adjacent(&self, pos: Position) -> Vec<Position> {
        Placement::classify(pos, self.width, self.height)
            .steps()
            .iter()
            .filter_map(|step| step.apply(pos, self.width, self.height))
            .filter(|next| !self.cell(*next).terrain.is_obstructing())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plains(width: usize, height: usize) -> Grid {
        Grid::new(width, height).unwrap()
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Grid::new(0, 4).unwrap_err(),
            SimError::InvalidDimensions { width: 0, height: 4 }
        );
        assert!(matches!(
            Grid::new(3, 0),
            Err(SimError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn adjacency_counts_on_open_map() {
        let grid = plains(5, 5);
        for (pos, _) in grid.iter() {
            let on_x_border = pos.x == 0 || pos.x == 4;
            let on_y_border = pos.y == 0 || pos.y == 4;
            let expected = match (on_x_border, on_y_border) {
                (true, true) => 2,
                (true, false) | (false, true) => 3,
                (false, false) => 4,
            };
            assert_eq!(grid.adjacent(pos).len(), expected, "at {pos:?}");
        }
    }

    #[test]
    fn interior_enumeration_order() {
        let grid = plains(3, 3);
        assert_eq!(
            grid.adjacent(Position::new(1, 1)),
            vec![
                Position::new(0, 1),
                Position::new(1, 2),
                Position::new(1, 0),
                Position::new(2, 1),
            ]
        );
        assert_eq!(
            grid.adjacent(Position::new(0, 0)),
            vec![Position::new(0, 1), Position::new(1, 0)]
        );
        assert_eq!(
            grid.adjacent(Position::new(2, 2)),
            vec![Position::new(1, 2), Position::new(2, 1)]
        );
    }

    #[test]
    fn obstructing_terrain_is_skipped() {
        let mut grid = plains(3, 3);
        grid.cell_mut(Position::new(0, 1)).terrain = Terrain::Ocean;
        grid.cell_mut(Position::new(2, 1)).terrain = Terrain::Mountain;
        grid.cell_mut(Position::new(1, 0)).terrain = Terrain::River;
        assert_eq!(
            grid.adjacent(Position::new(1, 1)),
            vec![Position::new(1, 2), Position::new(1, 0)]
        );
    }

    #[test]
    fn single_row_grid_stays_in_bounds() {
        let grid = plains(1, 4);
        assert_eq!(grid.adjacent(Position::new(0, 0)), vec![Position::new(0, 1)]);
        assert_eq!(
            grid.adjacent(Position::new(0, 2)),
            vec![Position::new(0, 3), Position::new(0, 1)]
        );
        assert!(plains(1, 1).adjacent(Position::new(0, 0)).is_empty());
    }

    #[test]
    fn populate_resets_occupancy() {
        let mut grid = plains(2, 2);
        grid.cell_mut(Position::new(0, 0)).has_unit = true;
        grid.cell_mut(Position::new(1, 1)).structure = Structure::Road;
        grid.populate([Terrain::Forest, Terrain::Ocean, Terrain::River, Terrain::Plains]);

        assert_eq!(grid.cell(Position::new(0, 1)).terrain, Terrain::Ocean);
        assert_eq!(grid.cell(Position::new(1, 0)).terrain, Terrain::River);
        assert!(grid.iter().all(|(_, cell)| cell.is_vacant()));
    }

    #[test]
    fn symbols_resolve_and_detect_duplicates() {
        let symbols = TerrainSymbols::default();
        assert_eq!(symbols.terrain('~'), Some(Terrain::Ocean));
        assert_eq!(symbols.terrain('*'), Some(Terrain::Forest));
        assert_eq!(symbols.terrain('x'), None);
        assert_eq!(symbols.first_duplicate(), None);

        let clash = TerrainSymbols {
            river: '.',
            ..TerrainSymbols::default()
        };
        assert_eq!(clash.first_duplicate(), Some('.'));
    }
}
