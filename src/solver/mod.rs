// The solve pipeline: predict an output size, build one DAG per training
// pair plus one for the test input, extract pieces across them, compose
// candidates, then score and emit up to three answers per test input.
//
// Resource pressure is never an error here. Caps and the wall clock
// prune silently and the pipeline carries on with whatever it has; the
// only surfaced failure is invalid input at the ingest boundary.

pub mod size;
pub mod specialist;

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::candidate::compose::{compose, Candidate, ComposeConfig};
use crate::candidate::score;
use crate::core::error::Result;
use crate::core::grid::Grid;
use crate::core::state::State;
use crate::search::dag::{Dag, DagConfig};
use crate::search::piece::{extract_pieces, ExtractorConfig, PieceCollection};
use crate::task::{ArcTask, Example};

pub use specialist::{SpecialistAnswer, SpecialistSolver};

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Transform-chain cost budget per DAG.
    pub max_depth: u8,
    pub max_nodes: usize,
    pub max_side: usize,
    pub max_area: usize,
    pub max_pieces: usize,
    pub max_candidates: usize,
    pub max_iterations: usize,
    pub max_answers: usize,
    pub complexity_penalty: f32,
    pub time_limit: Duration,
    /// Specialist confidence at or above which their answers short-cut
    /// the core pipeline.
    pub specialist_shortcut: f32,
    pub enable_logging: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            max_nodes: 100_000,
            max_side: 40,
            max_area: 1600,
            max_pieces: 100_000,
            max_candidates: 1000,
            max_iterations: 10,
            max_answers: 3,
            complexity_penalty: 0.01,
            time_limit: Duration::from_secs(60),
            specialist_shortcut: 0.95,
            enable_logging: false,
        }
    }
}

pub struct Solver {
    config: SolverConfig,
    specialists: Vec<Box<dyn SpecialistSolver>>,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config, specialists: Vec::new() }
    }

    pub fn add_specialist(&mut self, specialist: Box<dyn SpecialistSolver>) {
        self.specialists.push(specialist);
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve every test input of a task. Returns one ranked answer list
    /// (possibly empty, at most `max_answers` long) per test input. The
    /// only error is invalid input; everything downstream degrades to
    /// fewer answers.
    pub fn solve(&self, task: &ArcTask) -> Result<Vec<Vec<Grid>>> {
        task.validate()?;
        let deadline = Instant::now() + self.config.time_limit;
        let mut all = Vec::with_capacity(task.test.len());
        for (i, test_input) in task.test.iter().enumerate() {
            let started = Instant::now();
            let answers = self.solve_one(&task.train, test_input, deadline);
            if self.config.enable_logging {
                info!(
                    task = %task.id,
                    test = i,
                    answers = answers.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "test input solved"
                );
            }
            all.push(answers);
        }
        Ok(all)
    }

    fn solve_one(&self, train: &[Example], test_input: &Grid, deadline: Instant) -> Vec<Grid> {
        // specialists run first and may short-cut the whole pipeline
        let pooled = match self.run_specialists(train, test_input) {
            SpecialistOutcome::Shortcut(answers) => return answers,
            SpecialistOutcome::Pool(answers) => answers,
        };

        let test_dims = size::predict_dims(train, test_input);
        debug!(?test_dims, "predicted output size");

        let pieces = self.build_pieces(train, test_input, deadline);
        if self.config.enable_logging {
            info!(
                dags = pieces.dag_count(),
                nodes = pieces.dags.iter().map(|d| d.len()).sum::<usize>(),
                pieces = pieces.piece_count(),
                "search complete"
            );
        }

        let train_outputs: Vec<Grid> = train.iter().map(|ex| ex.output.clone()).collect();
        let compose_config = ComposeConfig {
            max_iterations: self.config.max_iterations,
            max_candidates: self.config.max_candidates,
        };
        let mut candidates = compose(&pieces, &train_outputs, test_dims, compose_config);
        debug!(candidates = candidates.len(), "composition complete");

        candidates.push(self.fallback_candidate(train, test_input));
        for answer in pooled {
            candidates.push(self.specialist_candidate(&train_outputs, answer));
        }

        let ranked = score::evaluate(candidates, &train_outputs, self.config.complexity_penalty);
        score::select_answers(&ranked, self.config.max_answers.min(3))
    }

    fn build_pieces(
        &self,
        train: &[Example],
        test_input: &Grid,
        deadline: Instant,
    ) -> PieceCollection {
        let mut dags = Vec::with_capacity(train.len() + 1);
        for ex in train {
            let mut dag = Dag::new(self.dag_config(deadline));
            dag.add_root(State::from_grid(ex.input.clone()));
            dag.add_root(State::from_grid(ex.output.clone()));
            dag.build();
            dags.push(dag);
        }
        let mut test_dag = Dag::new(self.dag_config(deadline));
        test_dag.add_root(State::from_grid(test_input.clone()));
        test_dag.build();
        dags.push(test_dag);

        let extractor = ExtractorConfig {
            max_depth: self.config.max_depth as u16,
            max_pieces: self.config.max_pieces,
        };
        extract_pieces(dags, &extractor)
    }

    fn dag_config(&self, deadline: Instant) -> DagConfig {
        DagConfig {
            max_depth: self.config.max_depth,
            max_nodes: self.config.max_nodes,
            max_side: self.config.max_side,
            max_area: self.config.max_area,
            time_limit: deadline.saturating_duration_since(Instant::now()),
        }
    }

    /// Root-level candidate: the inputs passed through unchanged. Keeps
    /// the answer list non-empty when search finds nothing better and
    /// solves the degenerate identity tasks outright.
    fn fallback_candidate(&self, train: &[Example], test_input: &Grid) -> Candidate {
        let mut images: Vec<Grid> = train.iter().map(|ex| ex.input.clone()).collect();
        images.push(test_input.clone());
        Candidate { images, piece_count: 0, sum_depth: 0, max_depth: 0, score: 0.0 }
    }

    /// A pooled specialist answer scored through the same ranking as the
    /// core: full training matches, with the confidence folded into the
    /// complexity prior so surer specialists rank higher.
    fn specialist_candidate(&self, train_outputs: &[Grid], answer: SpecialistAnswer) -> Candidate {
        let mut images = train_outputs.to_vec();
        images.push(answer.grid);
        let max_depth = ((1.0 - answer.confidence.clamp(0.0, 1.0)) * 10.0).round() as u16;
        Candidate { images, piece_count: 1, sum_depth: max_depth as u32, max_depth, score: 0.0 }
    }

    fn run_specialists(&self, train: &[Example], test_input: &Grid) -> SpecialistOutcome {
        let mut answers = Vec::new();
        for specialist in &self.specialists {
            if !specialist.can_solve(train, test_input) {
                continue;
            }
            let found = specialist.solve(train, test_input);
            if self.config.enable_logging && !found.is_empty() {
                info!(specialist = specialist.name(), answers = found.len(), "specialist fired");
            }
            answers.extend(found);
        }
        answers.retain(|a| score::answer_valid(&a.grid));
        answers.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });

        if answers.iter().any(|a| a.confidence >= self.config.specialist_shortcut) {
            let mut seen = rustc_hash::FxHashSet::default();
            let answers: Vec<Grid> = answers
                .into_iter()
                .filter(|a| seen.insert((a.grid.w, a.grid.h, a.grid.pixels.clone())))
                .take(self.config.max_answers.min(3))
                .map(|a| a.grid)
                .collect();
            return SpecialistOutcome::Shortcut(answers);
        }
        SpecialistOutcome::Pool(answers)
    }
}

enum SpecialistOutcome {
    Shortcut(Vec<Grid>),
    Pool(Vec<SpecialistAnswer>),
}
