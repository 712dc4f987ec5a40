// Output-size prediction. Classifies the dimension relation shared by
// every training pair and carries it over to the test input. Advisory
// only: the prediction shapes the composition buffers, it never rejects
// a candidate.

use crate::core::grid::Grid;
use crate::task::Example;

pub fn predict_dims(train: &[Example], test_input: &Grid) -> (usize, usize) {
    let (tw, th) = test_input.dims();
    if train.is_empty() {
        return (tw, th);
    }

    if train.iter().all(|ex| ex.output.dims() == ex.input.dims()) {
        return (tw, th);
    }
    if train
        .iter()
        .all(|ex| ex.output.w == ex.input.h && ex.output.h == ex.input.w)
    {
        return (th, tw);
    }
    if let Some((fw, fh)) = common_scale(train) {
        return (tw * fw, th * fh);
    }
    let fixed = train[0].output.dims();
    if train.iter().all(|ex| ex.output.dims() == fixed) {
        return fixed;
    }
    (tw, th)
}

fn common_scale(train: &[Example]) -> Option<(usize, usize)> {
    let mut factors = None;
    for ex in train {
        let (iw, ih) = ex.input.dims();
        let (ow, oh) = ex.output.dims();
        if iw == 0 || ih == 0 || ow % iw != 0 || oh % ih != 0 {
            return None;
        }
        let f = (ow / iw, oh / ih);
        if f == (1, 1) {
            return None;
        }
        match factors {
            None => factors = Some(f),
            Some(existing) if existing == f => {}
            Some(_) => return None,
        }
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(iw: usize, ih: usize, ow: usize, oh: usize) -> Example {
        Example { input: Grid::make(iw, ih, 1), output: Grid::make(ow, oh, 1) }
    }

    #[test]
    fn same_dims_carry_over() {
        let train = vec![example(3, 2, 3, 2), example(4, 4, 4, 4)];
        assert_eq!(predict_dims(&train, &Grid::make(5, 6, 0)), (5, 6));
    }

    #[test]
    fn transposed_dims_swap() {
        let train = vec![example(3, 2, 2, 3)];
        assert_eq!(predict_dims(&train, &Grid::make(2, 3, 0)), (3, 2));
    }

    #[test]
    fn scaled_dims_multiply() {
        let train = vec![example(2, 2, 6, 6), example(3, 3, 9, 9)];
        assert_eq!(predict_dims(&train, &Grid::make(2, 2, 0)), (6, 6));
    }

    #[test]
    fn fixed_output_size_wins_over_fallback() {
        let train = vec![example(3, 2, 4, 4), example(5, 7, 4, 4)];
        assert_eq!(predict_dims(&train, &Grid::make(9, 9, 0)), (4, 4));
    }

    #[test]
    fn inconsistent_relations_fall_back_to_test_dims() {
        let train = vec![example(2, 2, 4, 4), example(3, 3, 5, 5)];
        assert_eq!(predict_dims(&train, &Grid::make(7, 8, 0)), (7, 8));
    }

    #[test]
    fn empty_training_uses_test_dims() {
        assert_eq!(predict_dims(&[], &Grid::make(3, 4, 0)), (3, 4));
    }
}
