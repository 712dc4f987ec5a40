// Piece extraction over parallel DAGs. A piece is a tuple of node ids,
// one per DAG, reachable from the corresponding roots by the same
// function sequence. Because a state's depth is part of its content, all
// nodes of a tuple carry the same depth: the cost sum of that sequence.
//
// The search walks the product graph lazily: a bucket queue ordered by
// depth, a seen-table over tuple hashes (confirmed by slice comparison),
// and expansion only through function ids present in every constituent
// node's child map.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::core::grid::Grid;
use crate::search::dag::{Dag, NodeId};
use crate::transform::library::library;

#[derive(Debug, Clone, Copy)]
pub struct Piece {
    /// Offset of this piece's tuple in the collection's flat memory.
    pub memory_index: u32,
    /// Cost sum of the shared function sequence.
    pub depth: u16,
}

#[derive(Debug)]
pub struct PieceCollection {
    pub dags: Vec<Dag>,
    /// Flat tuple storage, dag_count entries per piece.
    pub memory: Vec<NodeId>,
    pub pieces: Vec<Piece>,
}

impl PieceCollection {
    pub fn dag_count(&self) -> usize {
        self.dags.len()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn node_id(&self, piece: usize, dag: usize) -> NodeId {
        self.memory[self.pieces[piece].memory_index as usize + dag]
    }

    pub fn image(&self, piece: usize, dag: usize) -> &Grid {
        self.dags[dag].node_image(self.node_id(piece, dag))
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub max_depth: u16,
    pub max_pieces: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { max_depth: 20, max_pieces: 100_000 }
    }
}

fn tuple_hash(ids: &[NodeId]) -> u64 {
    const MAGIC: u64 = 1069388789821391921;
    let mut hash = 1u64;
    for &id in ids {
        hash = hash.wrapping_mul(MAGIC).wrapping_add(id as u64);
    }
    hash
}

struct ProductSearch {
    dag_count: usize,
    /// Every discovered tuple, flat.
    tuples: Vec<NodeId>,
    /// Best depth per discovered tuple.
    best_depth: Vec<u16>,
    seen: FxHashMap<u64, Vec<u32>>,
    queues: Vec<VecDeque<u32>>,
}

impl ProductSearch {
    fn new(dag_count: usize) -> Self {
        Self {
            dag_count,
            tuples: Vec::new(),
            best_depth: Vec::new(),
            seen: FxHashMap::default(),
            queues: Vec::new(),
        }
    }

    fn tuple(&self, index: u32) -> &[NodeId] {
        let base = index as usize * self.dag_count;
        &self.tuples[base..base + self.dag_count]
    }

    /// Record a tuple at the given depth, queueing it when it is new or
    /// reached cheaper than before.
    fn add(&mut self, ids: &[NodeId], depth: u16) {
        let hash = tuple_hash(ids);
        let mut found = None;
        if let Some(bucket) = self.seen.get(&hash) {
            for &index in bucket {
                if self.tuple(index) == ids {
                    found = Some(index);
                    break;
                }
            }
        }
        let index = match found {
            Some(index) => {
                if depth >= self.best_depth[index as usize] {
                    return;
                }
                self.best_depth[index as usize] = depth;
                index
            }
            None => {
                let index = self.best_depth.len() as u32;
                self.tuples.extend_from_slice(ids);
                self.best_depth.push(depth);
                self.seen.entry(hash).or_default().push(index);
                index
            }
        };
        while self.queues.len() <= depth as usize {
            self.queues.push(VecDeque::new());
        }
        self.queues[depth as usize].push_back(index);
    }
}

/// Run the product-graph search over the given DAGs. Seeds are the root
/// indices shared by every DAG; tuples are emitted as pieces when every
/// constituent node is piece-eligible, in deterministic depth-then-FIFO
/// order, until the piece cap fires.
pub fn extract_pieces(dags: Vec<Dag>, config: &ExtractorConfig) -> PieceCollection {
    let dag_count = dags.len();
    let mut collection = PieceCollection { dags, memory: Vec::new(), pieces: Vec::new() };
    if dag_count == 0 {
        return collection;
    }

    let lib = library();
    let mut search = ProductSearch::new(dag_count);

    let shared_roots =
        collection.dags.iter().map(|d| d.root_ids().len()).min().unwrap_or(0);
    for r in 0..shared_roots {
        let seed: Vec<NodeId> = collection.dags.iter().map(|d| d.root_ids()[r]).collect();
        search.add(&seed, 0);
    }

    let mut depth = 0usize;
    'outer: while depth < search.queues.len() && depth <= config.max_depth as usize {
        while let Some(index) = search.queues[depth].pop_front() {
            if search.best_depth[index as usize] != depth as u16 {
                continue; // superseded by a cheaper path
            }
            let tuple: Vec<NodeId> = search.tuple(index).to_vec();

            let is_piece = tuple
                .iter()
                .zip(&collection.dags)
                .all(|(&id, dag)| dag.node(id).is_piece);
            if is_piece {
                let memory_index = collection.memory.len() as u32;
                collection.memory.extend_from_slice(&tuple);
                collection.pieces.push(Piece { memory_index, depth: depth as u16 });
                if collection.pieces.len() >= config.max_pieces {
                    break 'outer;
                }
            }

            // expand through function ids present in every child map
            for &(func, first_child) in collection.dags[0].children(tuple[0]) {
                let mut child_tuple = Vec::with_capacity(dag_count);
                child_tuple.push(first_child);
                let mut complete = true;
                for (i, dag) in collection.dags.iter().enumerate().skip(1) {
                    match dag.child_of(tuple[i], func) {
                        Some(child) => child_tuple.push(child),
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if !complete {
                    continue;
                }
                let child_depth = depth as u16 + lib.get(func).cost as u16;
                if child_depth <= config.max_depth {
                    search.add(&child_tuple, child_depth);
                }
            }
        }
        depth += 1;
    }

    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::State;
    use crate::search::dag::DagConfig;

    fn built_dag(rows: &[Vec<u8>]) -> Dag {
        let mut dag = Dag::new(DagConfig::default());
        dag.add_root(State::from_grid(Grid::from_rows(rows).unwrap()));
        dag.build();
        dag
    }

    fn two_dag_collection() -> PieceCollection {
        let a = built_dag(&[vec![1, 0, 2], vec![0, 1, 0]]);
        let b = built_dag(&[vec![2, 2, 1], vec![1, 0, 2]]);
        extract_pieces(vec![a, b], &ExtractorConfig::default())
    }

    #[test]
    fn extraction_finds_shared_transforms() {
        let pieces = two_dag_collection();
        assert!(pieces.piece_count() > 0);
        assert_eq!(pieces.dag_count(), 2);
    }

    #[test]
    fn pieces_are_depth_ordered() {
        let pieces = two_dag_collection();
        assert!(pieces.pieces.windows(2).all(|w| w[0].depth <= w[1].depth));
    }

    #[test]
    fn piece_nodes_share_tuple_depth() {
        let pieces = two_dag_collection();
        for (p, piece) in pieces.pieces.iter().enumerate() {
            for d in 0..pieces.dag_count() {
                let node = pieces.dags[d].node(pieces.node_id(p, d));
                assert_eq!(node.state.depth as u16, piece.depth);
            }
        }
    }

    #[test]
    fn every_piece_is_reachable_by_one_sequence() {
        // property check: an independent walk of the product graph must
        // reach each piece's tuple from the roots at the recorded cost
        let pieces = two_dag_collection();
        let lib = library();
        for (p, piece) in pieces.pieces.iter().enumerate() {
            let target: Vec<NodeId> =
                (0..pieces.dag_count()).map(|d| pieces.node_id(p, d)).collect();
            let seed: Vec<NodeId> = pieces.dags.iter().map(|d| d.root_ids()[0]).collect();
            let mut frontier = vec![(seed, 0u16)];
            let mut seen = rustc_hash::FxHashSet::default();
            let mut reached = false;
            while let Some((tuple, cost)) = frontier.pop() {
                if tuple == target && cost == piece.depth {
                    reached = true;
                    break;
                }
                if cost >= piece.depth || !seen.insert(tuple.clone()) {
                    continue;
                }
                for &(func, first) in pieces.dags[0].children(tuple[0]) {
                    let mut next = vec![first];
                    if pieces.dags[1..]
                        .iter()
                        .zip(&tuple[1..])
                        .all(|(dag, &id)| match dag.child_of(id, func) {
                            Some(child) => {
                                next.push(child);
                                true
                            }
                            None => false,
                        })
                    {
                        frontier.push((next, cost + lib.get(func).cost as u16));
                    }
                }
            }
            assert!(reached, "piece {} has no consistent function sequence", p);
        }
    }

    #[test]
    fn root_tuples_are_not_pieces() {
        let pieces = two_dag_collection();
        for p in 0..pieces.piece_count() {
            assert!(pieces.pieces[p].depth > 0);
        }
    }

    #[test]
    fn piece_cap_stops_extraction() {
        let a = built_dag(&[vec![1, 0, 2], vec![0, 1, 0]]);
        let b = built_dag(&[vec![2, 2, 1], vec![1, 0, 2]]);
        let capped =
            extract_pieces(vec![a, b], &ExtractorConfig { max_pieces: 3, ..Default::default() });
        assert_eq!(capped.piece_count(), 3);
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = two_dag_collection();
        let b = two_dag_collection();
        assert_eq!(a.piece_count(), b.piece_count());
        assert_eq!(a.memory, b.memory);
    }

    #[test]
    fn single_dag_pieces_mirror_nodes() {
        let dag = built_dag(&[vec![1, 2], vec![3, 4]]);
        let node_count = dag.len();
        let pieces = extract_pieces(vec![dag], &ExtractorConfig::default());
        // every non-root in-bounds node forms a singleton tuple
        assert!(pieces.piece_count() > 0);
        assert!(pieces.piece_count() < node_count);
    }
}
