// Greedy piece composition. Candidate buffers for all slots (training
// outputs plus the test answer) are concatenated into one bit-space;
// pieces claim pixels through block-wise bitset arithmetic and may never
// contradict a training target on an unclaimed pixel. The test slot has
// no known target, so nothing there counts as a disagreement; its pixels
// fill in as a side effect of covering the training outputs.

use rustc_hash::FxHashSet;

use crate::candidate::bitset::{Bitset, BITS_PER_BLOCK};
use crate::core::grid::{Grid, UNFILLED};
use crate::search::piece::PieceCollection;

#[derive(Debug, Clone)]
pub struct Candidate {
    /// One grid per DAG slot; the last is the proposed test answer.
    pub images: Vec<Grid>,
    pub piece_count: u32,
    pub sum_depth: u32,
    pub max_depth: u16,
    pub score: f32,
}

impl Candidate {
    pub fn answer(&self) -> &Grid {
        self.images.last().expect("candidate has at least the answer slot")
    }

    /// Structural prior: deep, many-piece compositions are less likely.
    pub fn prior(&self) -> f32 {
        self.max_depth as f32 + self.piece_count as f32 * 1e-3
    }

    pub fn content_hash(&self) -> u64 {
        const MAGIC: u64 = 1000000007;
        let mut hash = 1u64;
        for img in &self.images {
            hash = hash.wrapping_mul(MAGIC).wrapping_add(img.content_hash());
        }
        hash
    }
}

#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub max_iterations: usize,
    pub max_candidates: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self { max_iterations: 10, max_candidates: 1000 }
    }
}

/// Replace every unfilled sentinel with the background colour.
fn greedy_fill(grid: &Grid) -> Grid {
    let mut out = grid.clone();
    for p in &mut out.pixels {
        if *p == UNFILLED {
            *p = 0;
        }
    }
    out
}

struct Composer<'a> {
    pieces: &'a PieceCollection,
    config: ComposeConfig,
    slot_dims: Vec<(usize, usize)>,
    slot_base: Vec<usize>,
    total_bits: usize,
    blocks: usize,
    /// Indices of pieces whose image matches every slot's dimensions.
    usable: Vec<usize>,
    /// Per usable piece: bits where its image is non-zero, `[piece][block]`.
    active: Vec<u64>,
    /// Per usable piece: bits where it disagrees with the training target.
    bad: Vec<u64>,
}

impl<'a> Composer<'a> {
    fn new(pieces: &'a PieceCollection, targets: &[Grid], test_dims: (usize, usize), config: ComposeConfig) -> Self {
        let mut slot_dims: Vec<(usize, usize)> = targets.iter().map(|t| t.dims()).collect();
        slot_dims.push(test_dims);
        let mut slot_base = Vec::with_capacity(slot_dims.len());
        let mut total_bits = 0;
        for &(w, h) in &slot_dims {
            slot_base.push(total_bits);
            total_bits += w * h;
        }
        let blocks = total_bits.div_ceil(BITS_PER_BLOCK);

        let mut composer = Composer {
            pieces,
            config,
            slot_dims,
            slot_base,
            total_bits,
            blocks,
            usable: Vec::new(),
            active: Vec::new(),
            bad: Vec::new(),
        };
        composer.preprocess(targets);
        composer
    }

    fn preprocess(&mut self, targets: &[Grid]) {
        'piece: for p in 0..self.pieces.piece_count() {
            for (d, &dims) in self.slot_dims.iter().enumerate() {
                if self.pieces.image(p, d).dims() != dims {
                    continue 'piece;
                }
            }
            let mut active = Bitset::new(self.total_bits);
            let mut bad = Bitset::new(self.total_bits);
            for d in 0..self.slot_dims.len() {
                let image = self.pieces.image(p, d);
                let base = self.slot_base[d];
                for (i, &pixel) in image.pixels.iter().enumerate() {
                    if pixel != 0 {
                        active.set(base + i, true);
                    }
                    if let Some(target) = targets.get(d) {
                        if pixel != target.pixels[i] {
                            bad.set(base + i, true);
                        }
                    }
                }
            }
            self.usable.push(p);
            self.active.extend_from_slice(active.blocks());
            self.bad.extend_from_slice(bad.blocks());
        }
    }

    fn piece_blocks<'b>(mem: &'b [u64], k: usize, blocks: usize) -> &'b [u64] {
        &mem[k * blocks..(k + 1) * blocks]
    }

    /// Pick the admissible (piece, mode) claiming the most unclaimed care
    /// bits; total newly claimed bits break ties, then piece then mode
    /// order. Returns None when no piece makes progress on the care mask.
    fn select(&self, current: &Bitset, care: &Bitset, threshold: u16) -> Option<(usize, usize)> {
        let cur = current.blocks();
        let care_blocks = care.blocks();
        let sparse: Vec<usize> =
            (0..self.blocks).filter(|&b| !cur[b] & care_blocks[b] != 0).collect();

        let mut best: Option<(usize, usize)> = None;
        let mut best_gain = (0usize, 0usize);
        for (k, &p) in self.usable.iter().enumerate() {
            if self.pieces.pieces[p].depth > threshold {
                continue;
            }
            let active = Self::piece_blocks(&self.active, k, self.blocks);
            let bad = Self::piece_blocks(&self.bad, k, self.blocks);
            for mode in 0..3usize {
                let flip: u64 = if mode == 0 { !0 } else { 0 };
                let full: u64 = if mode == 2 { !0 } else { 0 };

                let conflict = (0..self.blocks)
                    .any(|b| !cur[b] & bad[b] & ((active[b] ^ flip) | full) != 0);
                if conflict {
                    continue;
                }

                let care_gain: usize = sparse
                    .iter()
                    .map(|&b| {
                        (((active[b] ^ flip) | full) & !cur[b] & care_blocks[b]).count_ones()
                            as usize
                    })
                    .sum();
                if care_gain == 0 {
                    continue;
                }
                let total_gain: usize = (0..self.blocks)
                    .map(|b| (((active[b] ^ flip) | full) & !cur[b]).count_ones() as usize)
                    .sum();

                if (care_gain, total_gain) > best_gain {
                    best_gain = (care_gain, total_gain);
                    best = Some((k, mode));
                }
            }
        }
        best
    }

    /// Write the selected piece into the buffers and claim its mask.
    /// Pixels where the piece disagrees with a training target are never
    /// written, even on slots outside the current focus subset.
    fn apply(&self, k: usize, mode: usize, current: &mut Bitset, result: &mut [Grid]) {
        let p = self.usable[k];
        let active = Self::piece_blocks(&self.active, k, self.blocks);
        let bad = Self::piece_blocks(&self.bad, k, self.blocks);
        let flip: u64 = if mode == 0 { !0 } else { 0 };
        let full: u64 = if mode == 2 { !0 } else { 0 };

        for d in 0..result.len() {
            let image = self.pieces.image(p, d);
            let base = self.slot_base[d];
            for i in 0..image.pixels.len() {
                let bit = base + i;
                let block = bit / BITS_PER_BLOCK;
                let shift = bit % BITS_PER_BLOCK;
                let mask = (active[block] ^ flip) | full;
                if mask >> shift & 1 == 1
                    && bad[block] >> shift & 1 == 0
                    && result[d].pixels[i] == UNFILLED
                {
                    result[d].pixels[i] = image.pixels[i];
                }
            }
        }
        for (b, block) in current.blocks_mut().iter_mut().enumerate() {
            *block |= (active[b] ^ flip) | full;
        }
    }

    fn run(&self, targets: &[Grid]) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut seen: FxHashSet<u64> = FxHashSet::default();
        if self.usable.is_empty() {
            return out;
        }

        let max_piece_depth =
            self.usable.iter().map(|&p| self.pieces.pieces[p].depth).max().unwrap_or(0);
        let train_count = targets.len();
        let mask_limit = (1usize << train_count.min(5)).max(1);

        let mut threshold = max_piece_depth % 10;
        loop {
            for mask in 1..mask_limit {
                for focus in 0..train_count {
                    if mask >> focus & 1 == 0 {
                        continue;
                    }
                    self.run_one(mask, focus, threshold, &mut out, &mut seen);
                    if out.len() >= self.config.max_candidates {
                        return out;
                    }
                }
            }
            if threshold >= max_piece_depth {
                break;
            }
            threshold += 10;
        }
        out
    }

    /// One greedy composition pass for a (training subset, focus slot,
    /// depth threshold) combination, emitting a filled candidate after
    /// every successful piece application.
    fn run_one(
        &self,
        mask: usize,
        focus: usize,
        threshold: u16,
        out: &mut Vec<Candidate>,
        seen: &mut FxHashSet<u64>,
    ) {
        let slots = self.slot_dims.len();
        let train_count = slots - 1;
        let mut current = Bitset::new(self.total_bits);
        // slack bits past the end stay claimed so block arithmetic never
        // counts them
        for bit in self.total_bits..self.blocks * BITS_PER_BLOCK {
            let block = bit / BITS_PER_BLOCK;
            current.blocks_mut()[block] |= 1 << (bit % BITS_PER_BLOCK);
        }
        // training slots outside the focus subset are treated as already
        // settled; the test slot is always open
        for j in 0..train_count {
            if mask >> j & 1 == 0 {
                let base = self.slot_base[j];
                let (w, h) = self.slot_dims[j];
                current.set_range(base, base + w * h);
            }
        }
        let mut care = Bitset::new(self.total_bits);
        {
            let base = self.slot_base[focus];
            let (w, h) = self.slot_dims[focus];
            care.set_range(base, base + w * h);
        }

        let mut result: Vec<Grid> = self
            .slot_dims
            .iter()
            .map(|&(w, h)| Grid::make(w, h, UNFILLED))
            .collect();

        let mut piece_count = 0u32;
        let mut sum_depth = 0u32;
        let mut max_depth = 0u16;

        for _ in 0..self.config.max_iterations {
            let Some((k, mode)) = self.select(&current, &care, threshold) else {
                break;
            };
            self.apply(k, mode, &mut current, &mut result);
            let depth = self.pieces.pieces[self.usable[k]].depth;
            piece_count += 1;
            sum_depth += depth as u32;
            max_depth = max_depth.max(depth);

            let candidate = Candidate {
                images: result.iter().map(greedy_fill).collect(),
                piece_count,
                sum_depth,
                max_depth,
                score: 0.0,
            };
            if seen.insert(candidate.content_hash()) {
                out.push(candidate);
                if out.len() >= self.config.max_candidates {
                    return;
                }
            }
        }
    }
}

/// Assemble candidates from the extracted pieces. `targets` are the
/// training outputs in example order; `test_dims` is the advisory size
/// for the answer slot.
pub fn compose(
    pieces: &PieceCollection,
    targets: &[Grid],
    test_dims: (usize, usize),
    config: ComposeConfig,
) -> Vec<Candidate> {
    if pieces.dag_count() == 0 || pieces.dag_count() != targets.len() + 1 {
        return Vec::new();
    }
    Composer::new(pieces, targets, test_dims, config).run(targets)
}
