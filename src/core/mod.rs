pub mod error;
pub mod grid;
pub mod state;

pub use error::{Result, SolverError};
pub use grid::Grid;
pub use state::State;
