pub mod bitset;
pub mod compose;
pub mod score;

pub use bitset::Bitset;
pub use compose::{compose, Candidate, ComposeConfig};
