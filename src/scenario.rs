//! Scenario files, the legacy `key = 'value'` config format and map files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Rules;
use crate::error::SimError;
use crate::grid::{Grid, Terrain, TerrainSymbols};
use crate::registry::PlayerColor;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("map section needs exactly one of `rows` or `path`")]
    MapSource,
    #[error("map has {found} rows but {expected} are required")]
    MissingRows { expected: usize, found: usize },
    #[error("map row {row} has {found} symbols but {expected} are required")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown terrain symbol '{symbol}' at row {row}, column {col}")]
    UnknownSymbol { symbol: char, row: usize, col: usize },
    #[error("config is missing `{0}`")]
    MissingKey(&'static str),
    #[error("invalid value '{value}' for `{key}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("both players use colour {0}")]
    DuplicateColor(i32),
    #[error("terrain symbol '{0}' is mapped more than once")]
    DuplicateSymbol(char),
    #[error(transparent)]
    Sim(#[from] SimError),
}

fn default_seed() -> u64 {
    1
}

fn default_player1_color() -> i32 {
    1
}

fn default_player2_color() -> i32 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapSection {
    #[serde(default)]
    pub rows: Option<Vec<String>>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub turns: u64,
    pub max_armies: u32,
    pub cities_per_player: u32,
    #[serde(default = "default_player1_color")]
    pub player1_color: i32,
    #[serde(default = "default_player2_color")]
    pub player2_color: i32,
    #[serde(default)]
    pub terrain: TerrainSymbols,
    /// Number of map rows; inferred from the map when omitted.
    #[serde(default)]
    pub width: Option<usize>,
    /// Symbols per map row; inferred from the map when omitted.
    #[serde(default)]
    pub height: Option<usize>,
    pub map: MapSection,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Loads a YAML scenario. A `map.path` is resolved against the scenario
    /// file's directory and read into `map.rows`.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
        let path = self.base_dir.join(file);
        let data = read(&path)?;
        let mut scenario: Scenario =
            serde_yaml::from_str(&data).map_err(|source| ScenarioError::Yaml {
                path: path.clone(),
                source,
            })?;

        let map_path = scenario.map.path.take();
        match (scenario.map.rows.is_some(), map_path) {
            (true, None) => {}
            (false, Some(map_path)) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let text = read(&dir.join(map_path))?;
                scenario.map.rows = Some(text.lines().map(str::to_string).collect());
            }
            _ => return Err(ScenarioError::MapSource),
        }
        scenario.validate()?;
        Ok(scenario)
    }

    /// Loads a legacy config file plus a separate map file.
    pub fn load_legacy(
        &self,
        config: impl AsRef<Path>,
        map: impl AsRef<Path>,
    ) -> Result<Scenario, ScenarioError> {
        let config_path = self.base_dir.join(config);
        let map_path = self.base_dir.join(map);
        let legacy = LegacyConfig::parse(&read(&config_path)?)?;
        let rows = read(&map_path)?.lines().map(str::to_string).collect();
        let name = config_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "legacy".to_string());
        let scenario = legacy.into_scenario(name, rows);
        scenario.validate()?;
        Ok(scenario)
    }
}

fn read(path: &Path) -> Result<String, ScenarioError> {
    fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.player1_color == self.player2_color {
            return Err(ScenarioError::DuplicateColor(self.player1_color));
        }
        if let Some(symbol) = self.terrain.first_duplicate() {
            return Err(ScenarioError::DuplicateSymbol(symbol));
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            turns: self.turns,
            max_armies: self.max_armies,
            cities_per_player: self.cities_per_player,
            players: [
                PlayerColor(self.player1_color),
                PlayerColor(self.player2_color),
            ],
        }
    }

    fn rows(&self) -> &[String] {
        self.map.rows.as_deref().unwrap_or(&[])
    }

    /// Explicit dimensions, or the row count and shortest row of the map.
    pub fn dimensions(&self) -> (usize, usize) {
        let rows = self.rows();
        let rows = trim_trailing_blank(rows);
        let width = self.width.unwrap_or(rows.len());
        let height = self
            .height
            .unwrap_or_else(|| rows.iter().map(|row| row_symbols(row).count()).min().unwrap_or(0));
        (width, height)
    }

    pub fn build_grid(&self) -> Result<Grid, ScenarioError> {
        let (width, height) = self.dimensions();
        let mut grid = Grid::new(width, height)?;
        grid.populate(parse_map(self.rows(), width, height, &self.terrain)?);
        Ok(grid)
    }
}

fn trim_trailing_blank(rows: &[String]) -> &[String] {
    let keep = rows
        .iter()
        .rposition(|row| !row.trim().is_empty())
        .map_or(0, |last| last + 1);
    &rows[..keep]
}

fn row_symbols(row: &str) -> impl Iterator<Item = char> + '_ {
    row.trim_end_matches('\r').chars()
}

/// Reads the first `width` rows, `height` symbols each, row-major.
/// Extra rows and trailing symbols are ignored.
pub fn parse_map(
    rows: &[String],
    width: usize,
    height: usize,
    symbols: &TerrainSymbols,
) -> Result<Vec<Terrain>, ScenarioError> {
    if rows.len() < width {
        return Err(ScenarioError::MissingRows {
            expected: width,
            found: rows.len(),
        });
    }
    let mut terrain = Vec::with_capacity(width * height);
    for (row, line) in rows.iter().take(width).enumerate() {
        let found = row_symbols(line).count();
        if found < height {
            return Err(ScenarioError::ShortRow {
                row,
                expected: height,
                found,
            });
        }
        for (col, symbol) in row_symbols(line).take(height).enumerate() {
            let cell = symbols
                .terrain(symbol)
                .ok_or(ScenarioError::UnknownSymbol { symbol, row, col })?;
            terrain.push(cell);
        }
    }
    Ok(terrain)
}

/// Values read from the legacy `name = 'value'` configuration format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyConfig {
    pub turns: u64,
    pub max_armies: u32,
    pub cities_per_player: u32,
    pub player1_color: i32,
    pub player2_color: i32,
    pub terrain: TerrainSymbols,
}

impl LegacyConfig {
    /// Each line naming a known key takes the text between its first and
    /// last single quote as the value. Unknown lines are ignored.
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let mut turns = None;
        let mut max_armies = None;
        let mut cities_per_player = None;
        let mut player1_color = None;
        let mut player2_color = None;
        let mut terrain = TerrainSymbols::default();

        for line in text.lines() {
            let Some(value) = quoted(line) else {
                continue;
            };
            if line.contains("turns") {
                turns = Some(number("turns", value)?);
            }
            if line.contains("maximum_armies") {
                max_armies = Some(number("maximum_armies", value)?);
            }
            if line.contains("cities_per_player") {
                cities_per_player = Some(number("cities_per_player", value)?);
            }
            if line.contains("player1_color") {
                player1_color = Some(number("player1_color", value)?);
            }
            if line.contains("player2_color") {
                player2_color = Some(number("player2_color", value)?);
            }
            for (key, slot) in [
                ("plains_character", &mut terrain.plains),
                ("mountain_character", &mut terrain.mountain),
                ("forest_character", &mut terrain.forest),
                ("ocean_character", &mut terrain.ocean),
                ("river_character", &mut terrain.river),
            ] {
                if line.contains(key) {
                    *slot = value
                        .chars()
                        .next()
                        .ok_or_else(|| ScenarioError::InvalidValue {
                            key,
                            value: value.to_string(),
                        })?;
                }
            }
        }

        Ok(Self {
            turns: turns.ok_or(ScenarioError::MissingKey("turns"))?,
            max_armies: max_armies.ok_or(ScenarioError::MissingKey("maximum_armies"))?,
            cities_per_player: cities_per_player
                .ok_or(ScenarioError::MissingKey("cities_per_player"))?,
            player1_color: player1_color.ok_or(ScenarioError::MissingKey("player1_color"))?,
            player2_color: player2_color.ok_or(ScenarioError::MissingKey("player2_color"))?,
            terrain,
        })
    }

    pub fn into_scenario(self, name: String, rows: Vec<String>) -> Scenario {
        Scenario {
            name,
            description: None,
            seed: default_seed(),
            turns: self.turns,
            max_armies: self.max_armies,
            cities_per_player: self.cities_per_player,
            player1_color: self.player1_color,
            player2_color: self.player2_color,
            terrain: self.terrain,
            width: None,
            height: None,
            map: MapSection {
                rows: Some(rows),
                path: None,
            },
        }
    }
}

fn quoted(line: &str) -> Option<&str> {
    let start = line.find('\'')?;
    let end = line.rfind('\'')?;
    (end > start).then(|| &line[start + 1..end])
}

fn number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ScenarioError> {
    value
        .trim()
        .parse()
        .map_err(|_| ScenarioError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
