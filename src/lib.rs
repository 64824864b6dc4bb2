pub mod action_log;
pub mod engine;
pub mod error;
pub mod grid;
pub mod registry;
pub mod rng;
pub mod scenario;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, Rules, RunSummary};
pub use error::{SimError, SimResult};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
