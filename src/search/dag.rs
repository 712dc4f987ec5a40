// The transform DAG: every state reachable from the root states by
// chaining listed library functions, up to depth, node, pixel and time
// caps. Nodes live in an arena indexed by 32-bit ids; an interning table
// keyed by state hash guarantees that no two nodes hold an equal state.
// Hash hits are confirmed by structural comparison, so a 64-bit
// collision can never merge distinct states.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::core::grid::Grid;
use crate::core::state::State;
use crate::transform::library::{library, FuncId};

pub type NodeId = u32;

#[derive(Debug, Clone)]
pub struct DagConfig {
    /// Depth budget as a cost sum along the transform chain.
    pub max_depth: u8,
    pub max_nodes: usize,
    /// Piece eligibility bounds on a node's first image.
    pub max_side: usize,
    pub max_area: usize,
    pub time_limit: Duration,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            max_depth: 20,
            max_nodes: 100_000,
            max_side: 40,
            max_area: 1600,
            time_limit: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub state: State,
    /// Function that generated this node; None for roots.
    pub func: Option<FuncId>,
    pub parent: Option<NodeId>,
    /// Cache of applied transforms, ascending by function id.
    pub children: Vec<(FuncId, NodeId)>,
    pub is_piece: bool,
}

#[derive(Debug)]
pub struct Dag {
    config: DagConfig,
    nodes: Vec<Node>,
    index: FxHashMap<u64, Vec<NodeId>>,
    roots: Vec<NodeId>,
}

impl Dag {
    pub fn new(config: DagConfig) -> Self {
        Self { config, nodes: Vec::new(), index: FxHashMap::default(), roots: Vec::new() }
    }

    /// Insert a given input as a root. Returns the existing id when an
    /// equal state is already present.
    pub fn add_root(&mut self, state: State) -> NodeId {
        let (id, _) = self.insert(state, true);
        self.roots.push(id);
        id
    }

    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// The node's principal image.
    pub fn node_image(&self, id: NodeId) -> &Grid {
        self.nodes[id as usize].state.image()
    }

    pub fn children(&self, id: NodeId) -> &[(FuncId, NodeId)] {
        &self.nodes[id as usize].children
    }

    pub fn child_of(&self, id: NodeId, func: FuncId) -> Option<NodeId> {
        let children = &self.nodes[id as usize].children;
        children
            .binary_search_by_key(&func, |&(f, _)| f)
            .ok()
            .map(|i| children[i].1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Breadth-first expansion from the roots. Frontier nodes are visited
    /// in FIFO order and listed functions in ascending id order, so the
    /// arena layout is deterministic for a given input. Terminates when
    /// the frontier drains, the node cap is reached, or the time budget
    /// runs out; caps prune silently.
    pub fn build(&mut self) {
        let start = Instant::now();
        let lib = library();
        let mut frontier: VecDeque<NodeId> = (0..self.nodes.len() as NodeId).collect();

        while let Some(id) = frontier.pop_front() {
            if self.nodes.len() >= self.config.max_nodes {
                break;
            }
            if start.elapsed() >= self.config.time_limit {
                break;
            }
            let parent_state = self.nodes[id as usize].state.clone();
            for &func in lib.listed_ids() {
                let Some(child_state) = lib.apply(func, &parent_state) else {
                    continue;
                };
                if child_state.depth > self.config.max_depth {
                    continue;
                }
                let (child, fresh) = self.insert(child_state, false);
                self.nodes[id as usize].children.push((func, child));
                if fresh {
                    self.nodes[child as usize].parent = Some(id);
                    self.nodes[child as usize].func = Some(func);
                    frontier.push_back(child);
                }
                if self.nodes.len() >= self.config.max_nodes {
                    break;
                }
            }
        }
    }

    fn insert(&mut self, state: State, is_root: bool) -> (NodeId, bool) {
        let hash = state.hash();
        if let Some(bucket) = self.index.get(&hash) {
            for &id in bucket {
                if self.nodes[id as usize].state == state {
                    return (id, false);
                }
            }
        }
        let id = self.nodes.len() as NodeId;
        let is_piece = !is_root && self.piece_eligible(&state);
        self.nodes.push(Node { state, func: None, parent: None, children: Vec::new(), is_piece });
        self.index.entry(hash).or_default().push(id);
        (id, true)
    }

    fn piece_eligible(&self, state: &State) -> bool {
        let img = state.image();
        img.w <= self.config.max_side
            && img.h <= self.config.max_side
            && img.area() <= self.config.max_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dag(rows: &[Vec<u8>], max_depth: u8) -> Dag {
        let mut dag = Dag::new(DagConfig { max_depth, ..DagConfig::default() });
        dag.add_root(State::from_grid(Grid::from_rows(rows).unwrap()));
        dag.build();
        dag
    }

    #[test]
    fn no_two_nodes_share_a_state() {
        let dag = small_dag(&[vec![1, 0, 2], vec![0, 1, 0]], 20);
        for a in 0..dag.len() {
            for b in (a + 1)..dag.len() {
                assert_ne!(
                    dag.node(a as NodeId).state,
                    dag.node(b as NodeId).state,
                    "nodes {} and {} are duplicates",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn child_cache_is_sound() {
        let lib = library();
        let dag = small_dag(&[vec![1, 2], vec![0, 3]], 20);
        for id in 0..dag.len() as NodeId {
            let parent = dag.node(id);
            for &(func, child) in &parent.children {
                let expected = lib.apply(func, &parent.state);
                assert_eq!(expected.as_ref(), Some(&dag.node(child).state));
            }
        }
    }

    #[test]
    fn child_depth_is_parent_plus_cost() {
        let lib = library();
        let dag = small_dag(&[vec![1, 0], vec![2, 1]], 20);
        for id in 0..dag.len() as NodeId {
            let node = dag.node(id);
            if let (Some(parent), Some(func)) = (node.parent, node.func) {
                let expected = dag.node(parent).state.depth + lib.get(func).cost;
                assert_eq!(node.state.depth, expected);
            } else {
                assert_eq!(node.state.depth, 0);
            }
        }
    }

    #[test]
    fn children_are_sorted_by_function_id() {
        let dag = small_dag(&[vec![1, 2], vec![3, 4]], 20);
        for id in 0..dag.len() as NodeId {
            let children = dag.children(id);
            assert!(children.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }

    #[test]
    fn zero_depth_keeps_roots_only() {
        let dag = small_dag(&[vec![1, 2], vec![3, 4]], 0);
        assert_eq!(dag.len(), 1);
        assert!(dag.children(0).is_empty());
    }

    #[test]
    fn node_cap_prunes_silently() {
        let mut dag = Dag::new(DagConfig { max_nodes: 5, ..DagConfig::default() });
        dag.add_root(State::from_grid(Grid::from_rows(&[vec![1, 0, 2], vec![3, 0, 4]]).unwrap()));
        dag.build();
        assert!(dag.len() <= 5);
    }

    #[test]
    fn time_limit_zero_stops_expansion() {
        let mut dag = Dag::new(DagConfig { time_limit: Duration::ZERO, ..DagConfig::default() });
        dag.add_root(State::from_grid(Grid::from_rows(&[vec![1, 2]]).unwrap()));
        dag.build();
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn duplicate_root_returns_existing_id() {
        let mut dag = Dag::new(DagConfig::default());
        let g = Grid::from_rows(&[vec![1, 2]]).unwrap();
        let a = dag.add_root(State::from_grid(g.clone()));
        let b = dag.add_root(State::from_grid(g));
        assert_eq!(a, b);
        assert_eq!(dag.root_ids(), &[a, b]);
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn roots_are_not_pieces() {
        let dag = small_dag(&[vec![1, 2], vec![3, 4]], 20);
        assert!(!dag.node(0).is_piece);
        // derived in-bounds nodes are eligible
        assert!((1..dag.len() as NodeId).any(|id| dag.node(id).is_piece));
    }

    #[test]
    fn build_is_deterministic() {
        let a = small_dag(&[vec![1, 0, 2], vec![0, 1, 0]], 20);
        let b = small_dag(&[vec![1, 0, 2], vec![0, 1, 0]], 20);
        assert_eq!(a.len(), b.len());
        for id in 0..a.len() as NodeId {
            assert_eq!(a.node(id).state, b.node(id).state);
            assert_eq!(a.node(id).children, b.node(id).children);
        }
    }
}
