//! List alignment.
//!
//! 1. Align the two lists with a longest common subsequence under the
//!    [`ListAlign`](super::ListAlign) predicate. Among alignments of equal
//!    length the one keeping the most elements at their own index wins.
//! 2. Pair each leftover source element with the first leftover target
//!    element it matches: a move.
//! 3. Pair what is still left positionally within each gap between two
//!    aligned pairs, and diff those in place.
//! 4. Everything else is removed or added.
//!
//! Ops come out as removals (highest index first), moves (ascending target
//! index), additions (ascending target index), then the recursive diffs of
//! kept elements at their final index.

use serde_json::Value;

use super::{diff_at_path, DiffOptions};
use crate::json_patch::types::{Op, PathSegment};

fn at(path: &[PathSegment], index: usize) -> Vec<PathSegment> {
    let mut p = path.to_vec();
    p.push(PathSegment::Index(index));
    p
}

/// Score of matching `i` with `j` on top of the best suffix alignment.
fn take(dp: &[(u32, u32)], w: usize, i: usize, j: usize) -> (u32, u32) {
    let (c, s) = dp[(i + 1) * w + j + 1];
    (c + 1, s + u32::from(i == j))
}

/// Gap index of every element: the number of aligned elements before it.
fn gaps(mapping: &[Option<usize>]) -> Vec<usize> {
    let mut g = 0;
    mapping
        .iter()
        .map(|m| {
            if m.is_some() {
                g += 1;
            }
            g
        })
        .collect()
}

/// LCS pairs `(src_index, dst_index)`, ascending in both.
fn align(
    src: &[Value],
    dst: &[Value],
    same: &dyn Fn(&Value, &Value) -> bool,
) -> Vec<(usize, usize)> {
    let (n, m) = (src.len(), dst.len());

    let mut pre = 0;
    while pre < n && pre < m && same(&src[pre], &dst[pre]) {
        pre += 1;
    }
    // A shared tail keeps its own index only when the lengths agree.
    let mut suf = 0;
    if n == m {
        while suf < n - pre && same(&src[n - 1 - suf], &dst[m - 1 - suf]) {
            suf += 1;
        }
    }

    let (rn, rm) = (n - pre - suf, m - pre - suf);
    let eq: Vec<bool> = (0..rn * rm)
        .map(|k| same(&src[pre + k / rm], &dst[pre + k % rm]))
        .collect();

    // dp[i][j]: best (matched, matched_in_place) for src[i..] against dst[j..].
    let w = rm + 1;
    let mut dp = vec![(0u32, 0u32); (rn + 1) * w];
    for i in (0..rn).rev() {
        for j in (0..rm).rev() {
            let mut best = dp[(i + 1) * w + j].max(dp[i * w + j + 1]);
            if eq[i * rm + j] {
                best = best.max(take(&dp, w, i, j));
            }
            dp[i * w + j] = best;
        }
    }

    let mut pairs: Vec<(usize, usize)> = (0..pre).map(|k| (k, k)).collect();
    let (mut i, mut j) = (0, 0);
    while i < rn && j < rm {
        if eq[i * rm + j] && dp[i * w + j] == take(&dp, w, i, j) {
            pairs.push((pre + i, pre + j));
            i += 1;
            j += 1;
        } else if dp[i * w + j] == dp[(i + 1) * w + j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs.extend((0..suf).map(|k| (n - suf + k, m - suf + k)));
    pairs
}

pub(super) fn diff_arr(
    ops: &mut Vec<Op>,
    path: &[PathSegment],
    src: &[Value],
    dst: &[Value],
    options: &DiffOptions,
) {
    let same = |a: &Value, b: &Value| options.list_align.matches(a, b);
    let pairs = align(src, dst, &same);

    // src index -> dst index, and back.
    let mut target: Vec<Option<usize>> = vec![None; src.len()];
    let mut source: Vec<Option<usize>> = vec![None; dst.len()];
    for &(s, d) in &pairs {
        target[s] = Some(d);
        source[d] = Some(s);
    }

    let src_gap = gaps(&target);
    let dst_gap = gaps(&source);

    let mut moves = Vec::new();
    for s in 0..src.len() {
        if target[s].is_some() {
            continue;
        }
        if let Some(d) = (0..dst.len()).find(|&d| source[d].is_none() && same(&src[s], &dst[d])) {
            target[s] = Some(d);
            source[d] = Some(s);
            moves.push(d);
        }
    }

    let mut free_src: Vec<Vec<usize>> = vec![Vec::new(); pairs.len() + 1];
    let mut free_dst: Vec<Vec<usize>> = vec![Vec::new(); pairs.len() + 1];
    for s in (0..src.len()).filter(|&s| target[s].is_none()) {
        free_src[src_gap[s]].push(s);
    }
    for d in (0..dst.len()).filter(|&d| source[d].is_none()) {
        free_dst[dst_gap[d]].push(d);
    }
    for (ss, ds) in free_src.iter().zip(&free_dst) {
        for (&s, &d) in ss.iter().zip(ds) {
            target[s] = Some(d);
            source[d] = Some(s);
        }
    }

    for s in (0..src.len()).rev() {
        if target[s].is_none() {
            ops.push(Op::Remove { path: at(path, s), old_value: Some(src[s].clone()) });
        }
    }

    // Kept elements by target index, in their current order.
    let mut work: Vec<usize> = target.iter().flatten().copied().collect();
    moves.sort_unstable();
    for d in moves {
        let Some(p) = work.iter().position(|&t| t == d) else {
            continue;
        };
        work.remove(p);
        let q = work.iter().rposition(|&t| t < d).map_or(0, |k| k + 1);
        work.insert(q, d);
        if p != q {
            ops.push(Op::Move { from: at(path, p), path: at(path, q) });
        }
    }

    for d in 0..dst.len() {
        if source[d].is_none() {
            ops.push(Op::Add { path: at(path, d), value: dst[d].clone() });
        }
    }

    for d in 0..dst.len() {
        if let Some(s) = source[d] {
            diff_at_path(ops, &at(path, d), &src[s], &dst[d], options);
        }
    }
}
