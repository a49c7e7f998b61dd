//! This helper function is part of the huffman encoding system.
//!
//! The main huffman encoding function collects symbol frequencies for each coding table. This helper
//! turns those frequencies into code lengths (depths in a huffman tree). Codes longer than the
//! requested maximum are not allowed. If the weights supplied create longer codes, the weights are
//! flattened and another attempt is made.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Build huffman code lengths for `freqs` (one entry per symbol) with no code longer than
/// `max_len` bits. Every symbol gets a code, even those with a frequency of zero.
pub fn code_lengths(freqs: &[u32], max_len: u32) -> Vec<u8> {
    let alpha = freqs.len();
    if alpha < 2 {
        return vec![1; alpha];
    }

    // Weights carry the frequency in the upper 24 bits and the subtree depth in the lower 8.
    // If the frequency was 0, count it as 1.
    let mut weight: Vec<u32> = freqs
        .iter()
        .map(|&f| (f.max(1)).min(0x00ff_ffff) << 8)
        .collect();

    loop {
        let lengths = tree_depths(&weight);
        let deepest = lengths.iter().copied().max().unwrap_or(0) as u32;
        if deepest <= max_len {
            return lengths;
        }
        // Too deep. Halve each weight (keeping it above 0) to flatten the tree and try again.
        for w in weight.iter_mut() {
            let j = 1 + ((*w >> 8) / 2);
            *w = j << 8;
        }
    }
}

/// Build a huffman tree from leaf weights and return the depth of each leaf.
fn tree_depths(leaf_weights: &[u32]) -> Vec<u8> {
    let alpha = leaf_weights.len();
    // Leaves are nodes 0..alpha, internal nodes are appended as they are made.
    let mut weights = leaf_weights.to_vec();
    let mut parent = vec![usize::MAX; alpha];

    // Ties go to the lower node number, which keeps the output deterministic.
    let mut heap: BinaryHeap<Reverse<(u32, usize)>> = weights
        .iter()
        .enumerate()
        .map(|(node, &w)| Reverse((w, node)))
        .collect();

    while heap.len() > 1 {
        let (Some(Reverse((w1, n1))), Some(Reverse((w2, n2)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        let node = weights.len();
        weights.push(add_weights(w1, w2));
        parent.push(usize::MAX);
        parent[n1] = node;
        parent[n2] = node;
        heap.push(Reverse((weights[node], node)));
    }

    // Parents always come after their children, so walk down from the root.
    let mut depth = vec![0_u8; weights.len()];
    for node in (0..weights.len() - 1).rev() {
        depth[node] = depth[parent[node]].saturating_add(1);
    }
    depth.truncate(alpha);
    depth
}

/// Add two packed weights: weights sum in the high 24 bits, depth is one more than the deeper child
#[inline(always)]
fn add_weights(a: u32, b: u32) -> u32 {
    let weight_mask: u32 = 0xffffff00;
    let depth_mask: u32 = 0x000000ff;
    ((a & weight_mask) + (b & weight_mask)) | (1 + (a & depth_mask).max(b & depth_mask))
}

/// Assign canonical codes: shorter codes first, and within one length in symbol order.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u32> {
    let mut codes = vec![0_u32; lengths.len()];
    let min = lengths.iter().copied().min().unwrap_or(0);
    let max = lengths.iter().copied().max().unwrap_or(0);
    let mut next = 0_u32;
    for len in min..=max {
        for (sym, _) in lengths.iter().enumerate().filter(|(_, &l)| l == len) {
            codes[sym] = next;
            next += 1;
        }
        next <<= 1;
    }
    codes
}
