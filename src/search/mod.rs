pub mod dag;
pub mod piece;

pub use dag::{Dag, DagConfig, NodeId};
pub use piece::{extract_pieces, ExtractorConfig, Piece, PieceCollection};
