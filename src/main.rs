use arcdag::bench::run_benchmark;
use arcdag::solver::{Solver, SolverConfig};
use arcdag::task::{grid_to_string, load_task, ArcTask};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("bench") => {
            let dir = args.get(2).map(String::as_str).unwrap_or("data/training");
            let max_tasks = args.get(3).and_then(|s| s.parse().ok());
            let report = run_benchmark(dir, max_tasks, config())?;
            report.print_detail();
        }
        Some(path) => {
            let task = load_task(path)?;
            solve_and_print(&task)?;
        }
        None => {
            println!("arcdag — DAG-based ARC solver");
            println!("usage: arcdag <task.json> | arcdag bench <dir> [max_tasks]\n");
            println!("no task given, running the built-in demo\n");
            demo()?;
        }
    }
    Ok(())
}

fn config() -> SolverConfig {
    SolverConfig { enable_logging: true, ..SolverConfig::default() }
}

fn solve_and_print(task: &ArcTask) -> anyhow::Result<()> {
    let solver = Solver::new(config());
    let answers = solver.solve(task)?;
    for (i, list) in answers.iter().enumerate() {
        println!("test input {} — {} answer(s)", i, list.len());
        for (rank, answer) in list.iter().enumerate() {
            println!("--- answer {} ({}x{}) ---", rank + 1, answer.w, answer.h);
            println!("{}", grid_to_string(answer));
        }
    }
    Ok(())
}

fn demo() -> anyhow::Result<()> {
    let json = r#"{
        "train": [
            {"input": [[1, 0, 2], [0, 1, 0]], "output": [[1, 0, 0], [0, 1, 0]]},
            {"input": [[2, 2, 1], [1, 0, 2]], "output": [[0, 0, 1], [1, 0, 0]]}
        ],
        "test": [{"input": [[1, 2, 1], [2, 1, 2]]}]
    }"#;
    let task = ArcTask::from_json("demo-filter", json)?;
    println!("task: keep colour 1, drop the rest\n");
    solve_and_print(&task)
}
