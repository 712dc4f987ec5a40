// Dataset benchmark runner. Iterates a directory of task JSON files,
// solves each, and grades the answers against the hidden targets when
// the dataset carries them.

use std::path::Path;
use std::time::Instant;

use crate::core::grid::Grid;
use crate::solver::{Solver, SolverConfig};
use crate::task::load_task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// An emitted answer equals the hidden target exactly.
    Correct,
    /// An answer has the target's dimensions but wrong pixels.
    Dimensions,
    /// Answers were produced but none can be graded or none fit.
    Candidate,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task_id: String,
    pub verdict: Verdict,
    pub answers: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct BenchmarkReport {
    pub total_tasks: usize,
    pub correct: usize,
    pub score: f64,
    pub elapsed_ms: u64,
    pub per_task: Vec<TaskReport>,
}

fn grade(answers: &[Grid], target: Option<&Grid>) -> Verdict {
    if answers.is_empty() {
        return Verdict::Nothing;
    }
    let Some(target) = target else {
        return Verdict::Candidate;
    };
    if answers
        .iter()
        .any(|a| a.dims() == target.dims() && a.pixels == target.pixels)
    {
        return Verdict::Correct;
    }
    if answers.iter().any(|a| a.dims() == target.dims()) {
        return Verdict::Dimensions;
    }
    Verdict::Candidate
}

/// Run the solver over every task file in a directory, lexicographic
/// order, optionally truncated to the first `max_tasks`.
pub fn run_benchmark(
    data_dir: &str,
    max_tasks: Option<usize>,
    config: SolverConfig,
) -> anyhow::Result<BenchmarkReport> {
    let dir = Path::new(data_dir);
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());
    if let Some(max) = max_tasks {
        entries.truncate(max);
    }

    let solver = Solver::new(config);
    let total_start = Instant::now();
    let mut per_task = Vec::new();

    for entry in &entries {
        let path = entry.path();
        let task = match load_task(path.to_str().unwrap_or("")) {
            Ok(t) => t,
            Err(_) => continue,
        };

        let start = Instant::now();
        let solved = solver.solve(&task);
        let elapsed = start.elapsed().as_millis() as u64;

        // a task is graded by its first test input, like the competition
        let (verdict, answers) = match &solved {
            Ok(all) => {
                let answers = all.first().map(|a| a.as_slice()).unwrap_or(&[]);
                (grade(answers, task.test_outputs.first().and_then(|o| o.as_ref())), answers.len())
            }
            Err(_) => (Verdict::Nothing, 0),
        };

        per_task.push(TaskReport { task_id: task.id.clone(), verdict, answers, elapsed_ms: elapsed });
    }

    let correct = per_task.iter().filter(|t| t.verdict == Verdict::Correct).count();
    Ok(BenchmarkReport {
        total_tasks: per_task.len(),
        correct,
        score: if per_task.is_empty() { 0.0 } else { correct as f64 / per_task.len() as f64 },
        elapsed_ms: total_start.elapsed().as_millis() as u64,
        per_task,
    })
}

impl BenchmarkReport {
    pub fn print_summary(&self) {
        println!("=== ARC DAG solver benchmark ===");
        println!(
            "Tasks: {} | Correct: {} | Score: {:.1}%",
            self.total_tasks,
            self.correct,
            self.score * 100.0
        );
        println!("Time: {}ms", self.elapsed_ms);
    }

    pub fn print_detail(&self) {
        self.print_summary();
        println!("\nPer-task detail:");
        for t in &self.per_task {
            let status = match t.verdict {
                Verdict::Correct => "OK",
                Verdict::Dimensions => "dim",
                Verdict::Candidate => "cand",
                Verdict::Nothing => "--",
            };
            println!(
                "  [{:>4}] {} | answers={} time={}ms",
                status, t.task_id, t.answers, t.elapsed_ms
            );
        }
    }
}
