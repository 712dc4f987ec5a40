// Task wire format and ingest validation. A task arrives as JSON with
// list-of-list grids (outer = rows, inner = columns); every grid is
// validated on the way in, so the solver core only ever sees well-formed
// colours 0-9.

use anyhow::Context;
use serde::Deserialize;

use crate::core::error::{Result, SolverError};
use crate::core::grid::{Grid, MAX_INPUT_SIDE};

#[derive(Debug, Clone)]
pub struct Example {
    pub input: Grid,
    pub output: Grid,
}

#[derive(Debug, Clone)]
pub struct ArcTask {
    pub id: String,
    pub train: Vec<Example>,
    pub test: Vec<Grid>,
    /// Hidden targets when the dataset carries them; used only by the
    /// benchmark verdict, never by the solver.
    pub test_outputs: Vec<Option<Grid>>,
}

#[derive(Deserialize)]
struct RawPair {
    input: Vec<Vec<u8>>,
    output: Option<Vec<Vec<u8>>>,
}

#[derive(Deserialize)]
struct RawTask {
    train: Vec<RawPair>,
    test: Vec<RawPair>,
}

impl ArcTask {
    pub fn new(id: &str, train: Vec<Example>, test: Vec<Grid>) -> Self {
        let test_outputs = vec![None; test.len()];
        Self { id: id.to_string(), train, test, test_outputs }
    }

    pub fn from_json(id: &str, json: &str) -> Result<Self> {
        let raw: RawTask = serde_json::from_str(json)
            .map_err(|e| SolverError::InvalidInput(format!("malformed task json: {}", e)))?;
        let mut train = Vec::with_capacity(raw.train.len());
        for pair in &raw.train {
            let output = pair
                .output
                .as_ref()
                .ok_or_else(|| SolverError::InvalidInput("training pair without output".into()))?;
            train.push(Example {
                input: Grid::from_rows(&pair.input)?,
                output: Grid::from_rows(output)?,
            });
        }
        let mut test = Vec::with_capacity(raw.test.len());
        let mut test_outputs = Vec::with_capacity(raw.test.len());
        for pair in &raw.test {
            test.push(Grid::from_rows(&pair.input)?);
            test_outputs.push(match &pair.output {
                Some(rows) => Some(Grid::from_rows(rows)?),
                None => None,
            });
        }
        Ok(Self { id: id.to_string(), train, test, test_outputs })
    }

    /// Re-check the ingest contract. Guards tasks assembled in code
    /// rather than parsed, where `Grid::from_rows` never ran.
    pub fn validate(&self) -> Result<()> {
        for (i, ex) in self.train.iter().enumerate() {
            validate_grid(&ex.input).map_err(|e| annotate(e, "train input", i))?;
            validate_grid(&ex.output).map_err(|e| annotate(e, "train output", i))?;
        }
        for (i, input) in self.test.iter().enumerate() {
            validate_grid(input).map_err(|e| annotate(e, "test input", i))?;
        }
        Ok(())
    }
}

fn annotate(err: SolverError, what: &str, index: usize) -> SolverError {
    match err {
        SolverError::InvalidInput(msg) => {
            SolverError::InvalidInput(format!("{} {}: {}", what, index, msg))
        }
        other => other,
    }
}

pub fn validate_grid(g: &Grid) -> Result<()> {
    if g.w == 0 || g.h == 0 {
        return Err(SolverError::InvalidInput("empty grid".into()));
    }
    if g.w > MAX_INPUT_SIDE || g.h > MAX_INPUT_SIDE {
        return Err(SolverError::InvalidInput(format!(
            "grid {}x{} exceeds side limit {}",
            g.w, g.h, MAX_INPUT_SIDE
        )));
    }
    if g.pixels.len() != g.area() {
        return Err(SolverError::InvalidInput("pixel buffer does not match dimensions".into()));
    }
    if let Some(&p) = g.pixels.iter().find(|&&p| p > 9) {
        return Err(SolverError::InvalidInput(format!("colour {} out of range", p)));
    }
    Ok(())
}

/// Load a single task file in the official ARC layout.
pub fn load_task(path: &str) -> anyhow::Result<ArcTask> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading task {}", path))?;
    let id = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    ArcTask::from_json(&id, &content).with_context(|| format!("parsing task {}", path))
}

pub fn grid_to_string(grid: &Grid) -> String {
    grid.to_rows()
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = r#"{
        "train": [{"input": [[1, 2], [3, 4]], "output": [[1, 2], [3, 4]]}],
        "test": [{"input": [[5, 6], [7, 8]]}]
    }"#;

    #[test]
    fn parses_official_layout() {
        let task = ArcTask::from_json("t1", TASK).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.train.len(), 1);
        assert_eq!(task.test.len(), 1);
        assert_eq!(task.test_outputs, vec![None]);
        assert_eq!(task.test[0].to_rows(), vec![vec![5, 6], vec![7, 8]]);
    }

    #[test]
    fn keeps_test_output_when_present() {
        let json = r#"{
            "train": [{"input": [[1]], "output": [[2]]}],
            "test": [{"input": [[1]], "output": [[2]]}]
        }"#;
        let task = ArcTask::from_json("t", json).unwrap();
        assert!(task.test_outputs[0].is_some());
    }

    #[test]
    fn rejects_colour_out_of_range() {
        let json = r#"{
            "train": [{"input": [[11]], "output": [[1]]}],
            "test": [{"input": [[1]]}]
        }"#;
        let err = ArcTask::from_json("t", json).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }

    #[test]
    fn rejects_training_pair_without_output() {
        let json = r#"{"train": [{"input": [[1]]}], "test": [{"input": [[1]]}]}"#;
        assert!(ArcTask::from_json("t", json).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ArcTask::from_json("t", "{").is_err());
    }

    #[test]
    fn validate_catches_hand_built_bad_grids() {
        let mut grid = Grid::make(2, 2, 1);
        grid.pixels[0] = 11;
        let task = ArcTask::new(
            "t",
            vec![Example { input: grid, output: Grid::make(2, 2, 1) }],
            vec![Grid::make(2, 2, 0)],
        );
        assert!(task.validate().is_err());
    }
}
