// Candidate ranking: exact training matches minus a structural
// complexity prior, best first. Answers are deduplicated on their pixel
// content and capped at the answer budget.

use rustc_hash::FxHashSet;

use crate::candidate::compose::Candidate;
use crate::core::grid::Grid;

/// Hard bound on emitted answer grids.
pub const MAX_ANSWER_SIDE: usize = 30;

pub fn answer_valid(answer: &Grid) -> bool {
    answer.w >= 1
        && answer.h >= 1
        && answer.w <= MAX_ANSWER_SIDE
        && answer.h <= MAX_ANSWER_SIDE
        && answer.pixels.iter().all(|&p| p < 10)
}

/// Score and rank candidates. Candidates whose answer violates the
/// emission rules are dropped; the rest sort by score descending with
/// lower complexity winning ties. The sort is stable, so equal
/// candidates keep their generation order.
pub fn evaluate(
    candidates: Vec<Candidate>,
    train_outputs: &[Grid],
    complexity_penalty: f32,
) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| answer_valid(c.answer()))
        .map(|mut c| {
            let matches = train_outputs
                .iter()
                .zip(&c.images)
                .filter(|(expected, actual)| expected == actual)
                .count();
            c.score = matches as f32 - c.prior() * complexity_penalty;
            c
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.prior().partial_cmp(&b.prior()).unwrap_or(std::cmp::Ordering::Equal))
    });
    ranked
}

/// Take the top answers from a ranked candidate list, deduplicating on
/// the answer image's dimensions and pixel bytes.
pub fn select_answers(ranked: &[Candidate], max_answers: usize) -> Vec<Grid> {
    let mut answers = Vec::new();
    let mut seen: FxHashSet<(usize, usize, Vec<u8>)> = FxHashSet::default();
    for candidate in ranked {
        if answers.len() >= max_answers {
            break;
        }
        let answer = candidate.answer();
        if seen.insert((answer.w, answer.h, answer.pixels.clone())) {
            answers.push(answer.clone());
        }
    }
    answers
}

/// The competition predicate: does any candidate's answer image equal the
/// test target exactly?
pub fn score_candidates(candidates: &[Candidate], test_output: &Grid) -> bool {
    candidates.iter().any(|c| {
        let answer = c.answer();
        answer.dims() == test_output.dims() && answer.pixels == test_output.pixels
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[Vec<u8>]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn candidate(images: Vec<Grid>, piece_count: u32, max_depth: u16) -> Candidate {
        Candidate { images, piece_count, sum_depth: max_depth as u32, max_depth, score: 0.0 }
    }

    #[test]
    fn matches_dominate_complexity() {
        let out = grid(&[vec![1, 2]]);
        let answer = grid(&[vec![3]]);
        let matching = candidate(vec![out.clone(), answer.clone()], 5, 20);
        let missing = candidate(vec![grid(&[vec![9, 9]]), answer.clone()], 1, 0);
        let ranked = evaluate(vec![missing, matching], &[out], 0.01);
        assert_eq!(ranked[0].images[0], grid(&[vec![1, 2]]));
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn lower_complexity_wins_ties() {
        let out = grid(&[vec![1]]);
        let deep = candidate(vec![out.clone(), grid(&[vec![2]])], 3, 15);
        let shallow = candidate(vec![out.clone(), grid(&[vec![3]])], 1, 5);
        let ranked = evaluate(vec![deep, shallow], &[out], 0.0);
        assert_eq!(ranked[0].answer().pixels, vec![3]);
    }

    #[test]
    fn oversize_answers_are_rejected() {
        let big = Grid::make(31, 1, 1);
        let c = candidate(vec![big], 1, 0);
        assert!(evaluate(vec![c], &[], 0.01).is_empty());
    }

    #[test]
    fn sentinel_answers_are_rejected() {
        let mut bad = Grid::make(2, 2, 1);
        bad.pixels[3] = 10;
        let c = candidate(vec![bad], 1, 0);
        assert!(evaluate(vec![c], &[], 0.01).is_empty());
    }

    #[test]
    fn answers_deduplicate_by_content() {
        let out = grid(&[vec![1]]);
        let a = candidate(vec![out.clone(), grid(&[vec![4]])], 1, 5);
        let b = candidate(vec![out.clone(), grid(&[vec![4]])], 2, 10);
        let c = candidate(vec![out.clone(), grid(&[vec![5]])], 3, 15);
        let ranked = evaluate(vec![a, b, c], &[out], 0.01);
        let answers = select_answers(&ranked, 3);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].pixels, vec![4]);
        assert_eq!(answers[1].pixels, vec![5]);
    }

    #[test]
    fn answer_budget_is_enforced() {
        let out = grid(&[vec![1]]);
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| candidate(vec![out.clone(), grid(&[vec![i as u8]])], 1, 5))
            .collect();
        let ranked = evaluate(candidates, &[out], 0.01);
        assert_eq!(select_answers(&ranked, 3).len(), 3);
    }

    #[test]
    fn exact_match_predicate_fires() {
        let target = grid(&[vec![7, 7]]);
        let hit = candidate(vec![grid(&[vec![7, 7]])], 1, 0);
        let miss = candidate(vec![grid(&[vec![7, 0]])], 1, 0);
        assert!(score_candidates(&[miss.clone(), hit], &target));
        assert!(!score_candidates(&[miss], &target));
    }
}
