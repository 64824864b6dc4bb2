mod army;
mod city;
pub mod setup;

pub use army::{act, ArmyOutcome, ArmySystem};
pub use city::CitySystem;
pub use setup::place_starting_cities;
