//! Orderings of a run of optional flags.
//!
//! A user may type any subset of a command's flags in any order, so a run of
//! `n` consecutive optional flags is expanded into every ordered selection:
//! each of the `2^n` subsets (the empty one included) in every permutation.

/// Longest run of optional flags a usage may declare. The expansion grows
/// factorially: six flags already make 1957 sequences.
pub const MAX_FLAG_RUN: usize = 6;

/// Every subset of `items`, each in every order.
///
/// The empty sequence always comes first. Subsets are produced in bitmask
/// order; permutations of subsets of up to three items are enumerated
/// directly, larger ones use Heap's algorithm.
pub fn flag_sequences<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let n = items.len();
    let mut out = vec![Vec::new()];
    for mask in 1u64..(1u64 << n) {
        let subset: Vec<T> = items
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, item)| item.clone())
            .collect();
        out.extend(permutations(&subset));
    }
    out
}

/// All orderings of `items`.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    match items {
        [] => vec![Vec::new()],
        [a] => vec![vec![a.clone()]],
        [a, b] => vec![vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]],
        [a, b, c] => vec![
            vec![a.clone(), b.clone(), c.clone()],
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c.clone(), b.clone(), a.clone()],
        ],
        _ => heap_permutations(items),
    }
}

fn heap_permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    let n = items.len();
    let mut current = items.to_vec();
    let mut counters = vec![0usize; n];
    let mut out = vec![current.clone()];

    let mut i = 1;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                current.swap(0, i);
            } else {
                current.swap(counters[i], i);
            }
            out.push(current.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    out
}
