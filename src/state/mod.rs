mod registry;
mod spawn;
mod unit;

pub use registry::UnitRegistry;
pub use spawn::{MARINE, Placement, UnitSpawnSpec};
pub use unit::{Snapshot, Unit};
