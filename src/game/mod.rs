//! Game logic: screen fades, the state integrator and the frame director.

pub mod director;
pub mod fade;
pub mod state;

pub use director::Director;
pub use state::{EnergyState, FinishState, GameState, Proximity};
