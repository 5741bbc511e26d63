mod duel;
mod opponent;
mod squad;

pub use duel::{DUEL_SETTLE_TICKS, DuelScenario};
pub use opponent::OpponentPolicy;
pub use squad::{SQUAD_VISION, SquadScenario};
