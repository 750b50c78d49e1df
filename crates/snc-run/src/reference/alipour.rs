//! Non-spiking Alipour minimum dominating set approximation.
//!
//! Every node starts with its degree as weight. In each of `m_val` rounds a
//! node picks the member of its closed neighbourhood with the highest
//! priority `(weight, random number, node)`, and a node's next weight is the
//! number of times it was picked. The picks of the final weights form the
//! dominating set.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use snc_core::graph::InputGraph;

fn priority(input: &InputGraph, weights: &[u32], node: u32) -> (u32, u32, u32) {
    let idx = node as usize;
    (
        weights.get(idx).copied().unwrap_or(0),
        input.rand_nrs.get(idx).copied().unwrap_or(0),
        node,
    )
}

/// For each node, the member of its closed neighbourhood it picks.
pub fn winners(input: &InputGraph, weights: &[u32]) -> Vec<u32> {
    (0..input.size)
        .map(|node| {
            input
                .closed_neighbourhood(node)
                .into_iter()
                .max_by_key(|&candidate| priority(input, weights, candidate))
                .unwrap_or(node)
        })
        .collect()
}

/// Node weights after `m_val` rounds.
pub fn alipour_weights(input: &InputGraph, m_val: usize) -> Vec<u32> {
    let mut weights: Vec<u32> = (0..input.size).map(|node| input.degree(node) as u32).collect();
    for _ in 0..m_val {
        let mut next = vec![0u32; input.size as usize];
        for picked in winners(input, &weights) {
            if let Some(count) = next.get_mut(picked as usize) {
                *count += 1;
            }
        }
        weights = next;
    }
    weights
}

/// Dominating set picked with the weights of round `m_val`.
pub fn alipour_selection(input: &InputGraph, m_val: usize) -> BTreeSet<u32> {
    winners(input, &alipour_weights(input, m_val))
        .into_iter()
        .collect()
}

/// Rank of every node by descending priority; rank 0 is the strongest node.
pub fn priority_ranks(input: &InputGraph, weights: &[u32]) -> Vec<u32> {
    let mut order: Vec<u32> = (0..input.size).collect();
    order.sort_by_key(|&node| Reverse(priority(input, weights, node)));
    let mut ranks = vec![0u32; input.size as usize];
    for (rank, node) in order.into_iter().enumerate() {
        ranks[node as usize] = rank as u32;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> InputGraph {
        InputGraph::new(4, [(0, 1), (0, 2), (0, 3)], vec![3, 2, 1, 0])
    }

    #[test]
    fn star_centre_dominates() {
        let input = star();
        assert_eq!(alipour_selection(&input, 0), BTreeSet::from([0]));
        assert_eq!(alipour_selection(&input, 2), BTreeSet::from([0]));
    }

    #[test]
    fn ranks_follow_priority() {
        let input = star();
        let weights = alipour_weights(&input, 0);
        assert_eq!(priority_ranks(&input, &weights), vec![0, 1, 2, 3]);
    }
}
