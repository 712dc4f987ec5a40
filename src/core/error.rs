use std::fmt;

#[derive(Debug)]
pub enum SolverError {
    InvalidInput(String),
    InternalInvariant(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::InternalInvariant(msg) => write!(f, "internal invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

pub type Result<T> = std::result::Result<T, SolverError>;
