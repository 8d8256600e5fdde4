//! Lazy enumeration of k-subsets as strictly decreasing index tuples.

/// Iterator over all `k`-element subsets of `0..n`.
///
/// Each subset is yielded as a strictly decreasing tuple `t[0] > t[1] > ...`,
/// starting from `[k-1, ..., 1, 0]`. Successive tuples advance the
/// highest-positioned slot that still has room below its left neighbour
/// (or below `n` for slot 0) and reset every slot after it to its minimum.
#[derive(Clone, Debug)]
pub struct DecreasingCombinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl DecreasingCombinations {
    pub fn new(n: usize, k: usize) -> Self {
        let current = (k <= n).then(|| (0..k).rev().collect());
        Self { n, current }
    }
}

impl Iterator for DecreasingCombinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let k = current.len();
        let mut next = current.clone();

        for m in (0..k).rev() {
            let limit = if m == 0 { self.n } else { next[m - 1] };
            if next[m] + 1 < limit {
                next[m] += 1;
                for (p, slot) in next.iter_mut().enumerate().skip(m + 1) {
                    *slot = k - 1 - p;
                }
                self.current = Some(next);
                break;
            }
        }

        Some(current)
    }
}
