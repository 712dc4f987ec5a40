// The transform registry. Initialised once per process, read-only
// afterwards, safe to share across concurrent solves. Each entry is a
// pure function State -> Option<State> with a contractual name, an
// integer cost, and a listed flag deciding whether the DAG expansion
// uses it.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::core::grid::{Grid, MAX_BUILD_SIDE};
use crate::core::state::{State, MAX_STATE_PIXELS};
use crate::transform::ops;

pub type FuncId = u16;

type TransformFunc = Box<dyn Fn(&State) -> Option<State> + Send + Sync>;

pub struct TransformFn {
    pub name: String,
    pub cost: u8,
    pub listed: bool,
    func: TransformFunc,
}

#[derive(Default)]
pub struct TransformLibrary {
    funcs: Vec<TransformFn>,
    listed: Vec<FuncId>,
    by_name: FxHashMap<String, FuncId>,
}

impl TransformLibrary {
    pub fn register(&mut self, name: &str, func: TransformFunc, cost: u8, listed: bool) -> FuncId {
        debug_assert!((1..=20).contains(&cost), "cost out of contract range");
        let id = self.funcs.len() as FuncId;
        self.funcs.push(TransformFn { name: name.to_string(), cost, listed, func });
        self.by_name.insert(name.to_string(), id);
        if listed {
            self.listed.push(id);
        }
        id
    }

    pub fn get(&self, id: FuncId) -> &TransformFn {
        &self.funcs[id as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    pub fn listed_ids(&self) -> &[FuncId] {
        &self.listed
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Apply a transform, assigning the child depth and enforcing the
    /// bound contract: the result is rejected when any image leaves the
    /// construction frame, the pixel budget is exceeded, or the depth
    /// counter would overflow.
    pub fn apply(&self, id: FuncId, input: &State) -> Option<State> {
        let entry = self.get(id);
        let mut out = (entry.func)(input)?;
        out.depth = input.depth.checked_add(entry.cost)?;
        if out.images.is_empty() || out.total_pixels() > MAX_STATE_PIXELS {
            return None;
        }
        for img in &out.images {
            if img.w == 0 || img.h == 0 || img.w > MAX_BUILD_SIDE || img.h > MAX_BUILD_SIDE {
                return None;
            }
            // sentinels and out-of-range colours must never enter a state
            if img.pixels.iter().any(|&p| p > 9) {
                return None;
            }
        }
        Some(out)
    }
}

/// The process-wide library. First use builds it; afterwards it is
/// immutable and lock-free to read.
pub fn library() -> &'static TransformLibrary {
    static LIBRARY: OnceLock<TransformLibrary> = OnceLock::new();
    LIBRARY.get_or_init(build_library)
}

fn scalar<F>(f: F) -> TransformFunc
where
    F: Fn(&Grid) -> Option<Grid> + Send + Sync + 'static,
{
    Box::new(move |s: &State| {
        if s.is_vector {
            return None;
        }
        Some(State::new(vec![f(s.image())?], false, 0))
    })
}

fn splitter<F>(f: F) -> TransformFunc
where
    F: Fn(&Grid) -> Vec<Grid> + Send + Sync + 'static,
{
    Box::new(move |s: &State| {
        if s.is_vector {
            return None;
        }
        let images = f(s.image());
        if images.is_empty() {
            return None;
        }
        Some(State::new(images, true, 0))
    })
}

fn reducer<F>(f: F) -> TransformFunc
where
    F: Fn(&[Grid]) -> Option<Grid> + Send + Sync + 'static,
{
    Box::new(move |s: &State| {
        if !s.is_vector {
            return None;
        }
        Some(State::new(vec![f(&s.images)?], false, 0))
    })
}

fn build_library() -> TransformLibrary {
    let mut lib = TransformLibrary::default();

    lib.register("identity", scalar(|g| Some(g.clone())), 1, false);

    for i in 0..8u8 {
        lib.register(&format!("rigid_{}", i), scalar(move |g| Some(ops::rigid(g, i))), 10, true);
    }
    for c in 0..10u8 {
        lib.register(
            &format!("filterCol_{}", c),
            scalar(move |g| Some(ops::filter_col(g, c))),
            10,
            true,
        );
    }

    lib.register("invert", scalar(|g| Some(ops::invert(g))), 5, true);
    lib.register("transpose", scalar(|g| Some(ops::transpose(g))), 10, true);
    lib.register("flipH", scalar(|g| Some(ops::flip_h(g))), 10, true);
    lib.register("flipV", scalar(|g| Some(ops::flip_v(g))), 10, true);
    lib.register("compress", scalar(|g| Some(ops::compress(g))), 10, true);
    lib.register("toOrigin", scalar(|g| Some(ops::to_origin(g))), 5, true);

    lib.register("cut", splitter(ops::cut), 15, true);
    lib.register("splitCols", splitter(ops::split_cols), 15, true);

    lib.register("colorMap", scalar(ops::color_map), 10, true);
    lib.register("fillHoles", scalar(ops::fill_holes), 12, true);
    lib.register("removeNoise", scalar(|g| Some(ops::remove_noise(g))), 12, true);
    lib.register("extractPattern", scalar(ops::extract_pattern), 15, true);
    lib.register("replicate", scalar(|g| Some(ops::replicate(g))), 15, true);
    lib.register("getPos", scalar(ops::get_pos), 10, true);
    lib.register("hull", scalar(ops::hull), 10, true);

    for dir in 0..4u8 {
        lib.register(
            &format!("gravity_{}", dir),
            scalar(move |g| Some(ops::gravity(g, dir))),
            12,
            true,
        );
    }
    for c in 1..10u8 {
        lib.register(
            &format!("colShape_{}", c),
            scalar(move |g| Some(ops::col_shape(g, c))),
            10,
            true,
        );
    }
    lib.register("mirrorH", scalar(|g| Some(ops::mirror_h(g))), 15, true);
    lib.register("mirrorV", scalar(|g| Some(ops::mirror_v(g))), 15, true);
    lib.register("border", scalar(|g| Some(ops::border(g))), 12, true);
    lib.register("interior", scalar(|g| Some(ops::interior(g))), 12, true);

    lib.register("pickLargest", reducer(ops::pick_largest), 10, true);
    lib.register("stackCompose", reducer(ops::stack_compose), 10, true);

    lib
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(rows: &[Vec<u8>]) -> State {
        State::from_grid(Grid::from_rows(rows).unwrap())
    }

    #[test]
    fn contractual_names_are_registered() {
        let lib = library();
        for name in [
            "identity",
            "rigid_0",
            "rigid_7",
            "filterCol_0",
            "filterCol_9",
            "invert",
            "transpose",
            "flipH",
            "flipV",
            "compress",
            "toOrigin",
            "cut",
            "splitCols",
            "colorMap",
            "fillHoles",
            "removeNoise",
            "extractPattern",
            "replicate",
            "getPos",
            "hull",
            "gravity_0",
            "gravity_3",
            "colShape_1",
            "colShape_9",
            "mirrorH",
            "mirrorV",
            "border",
            "interior",
        ] {
            assert!(lib.lookup(name).is_some(), "missing {}", name);
        }
        assert!(lib.lookup("colShape_0").is_none());
    }

    #[test]
    fn identity_is_unlisted() {
        let lib = library();
        let id = lib.lookup("identity").unwrap();
        assert!(!lib.get(id).listed);
        assert!(!lib.listed_ids().contains(&id));
    }

    #[test]
    fn listed_ids_are_ascending_and_costed() {
        let lib = library();
        let ids = lib.listed_ids();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for &id in ids {
            let cost = lib.get(id).cost;
            assert!((1..=20).contains(&cost));
        }
    }

    #[test]
    fn apply_sets_depth_from_cost() {
        let lib = library();
        let s = state(&[vec![1, 2], vec![3, 4]]);
        let id = lib.lookup("invert").unwrap();
        let out = lib.apply(id, &s).unwrap();
        assert_eq!(out.depth, 5);
        let again = lib.apply(id, &out).unwrap();
        assert_eq!(again.depth, 10);
    }

    #[test]
    fn apply_is_pure() {
        let lib = library();
        let s = state(&[vec![1, 0], vec![0, 2]]);
        let id = lib.lookup("compress").unwrap();
        let a = lib.apply(id, &s);
        let b = lib.apply(id, &s);
        assert_eq!(a, b);
        // the input is untouched
        assert_eq!(s, state(&[vec![1, 0], vec![0, 2]]));
    }

    #[test]
    fn scalar_transforms_reject_vector_states() {
        let lib = library();
        let parts = State::new(
            vec![Grid::make(1, 1, 1), Grid::make(1, 1, 2)],
            true,
            0,
        );
        assert!(lib.apply(lib.lookup("rigid_1").unwrap(), &parts).is_none());
        assert!(lib.apply(lib.lookup("compress").unwrap(), &parts).is_none());
    }

    #[test]
    fn cut_produces_vector_state() {
        let lib = library();
        let s = state(&[vec![1, 0, 2]]);
        let out = lib.apply(lib.lookup("cut").unwrap(), &s).unwrap();
        assert!(out.is_vector);
        assert_eq!(out.images.len(), 2);
        // and the reducer folds it back to a single image
        let picked = lib.apply(lib.lookup("pickLargest").unwrap(), &out).unwrap();
        assert!(!picked.is_vector);
        assert_eq!(picked.images.len(), 1);
    }

    #[test]
    fn replicate_rejects_oversize_results() {
        let lib = library();
        let id = lib.lookup("replicate").unwrap();
        let mut s = state(&vec![vec![1; 30]; 30]);
        // grow until a bound trips; the library must reject, not panic
        for _ in 0..4 {
            match lib.apply(id, &s) {
                Some(next) => s = next,
                None => return,
            }
        }
        panic!("replicate never hit the pixel budget");
    }

    #[test]
    fn depth_overflow_is_rejected() {
        let lib = library();
        let id = lib.lookup("rigid_2").unwrap();
        let mut s = state(&[vec![1]]);
        s.depth = 250;
        assert!(lib.apply(id, &s).is_none());
    }
}
