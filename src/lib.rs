//! Client-side turn engine for the board game: dice, movement, bonus cards
//! and the guard that keeps background polling away from in-flight actions.

pub mod api;
pub mod cards;
pub mod config;
pub mod console;
pub mod dice;
pub mod error;
pub mod events;
pub mod model;
pub mod movement;
pub mod notify;
pub mod store;
pub mod telemetry;
pub mod turn;
pub mod util;
