// Integration hook for narrow pattern solvers (tiling, symmetry, chess
// and friends). Specialists are opaque to the core: they advertise
// whether a task shape suits them and return confidence-weighted
// answers. The core never calls back into them.

use crate::core::grid::Grid;
use crate::task::Example;

#[derive(Debug, Clone)]
pub struct SpecialistAnswer {
    pub grid: Grid,
    pub confidence: f32,
}

pub trait SpecialistSolver: Send + Sync {
    fn name(&self) -> &str;

    fn can_solve(&self, train: &[Example], test_input: &Grid) -> bool;

    /// Candidate answers, possibly empty. Confidence is the specialist's
    /// own calibration in [0, 1].
    fn solve(&self, train: &[Example], test_input: &Grid) -> Vec<SpecialistAnswer>;
}
